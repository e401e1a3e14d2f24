use super::{Command, CommandError};
use crate::core::env::{EnvError, EnvironmentState};

#[derive(Clone, Copy, Default)]
pub struct UnsetCommand;

impl Command for UnsetCommand {
    fn execute(&self, args: &[String], env: &mut EnvironmentState) -> Result<String, CommandError> {
        if let Some(bad) = args.iter().find(|name| !EnvironmentState::is_valid_name(name)) {
            return Err(EnvError::InvalidName(bad.clone()).into());
        }

        for name in args {
            env.unset(name);
        }
        Ok(String::new())
    }
}
