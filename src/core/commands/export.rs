use super::{Command, CommandError};
use crate::core::env::{EnvError, EnvironmentState};

/// `export NAME=VALUE ...`
///
/// Arguments arrive already unquoted and expanded against the store as it was
/// before this call, so `export A=1 B=$A` assigns `B` the previous `A`.
#[derive(Clone, Copy, Default)]
pub struct ExportCommand;

impl ExportCommand {
    fn parse_export(arg: &str) -> Result<Option<(&str, &str)>, CommandError> {
        match arg.split_once('=') {
            Some((name, value)) => Ok(Some((name, value))),
            // A bare name re-exports whatever the store already holds.
            None if EnvironmentState::is_valid_name(arg) => Ok(None),
            None => Err(EnvError::InvalidName(arg.to_string()).into()),
        }
    }

    fn list(env: &EnvironmentState) -> String {
        let mut vars: Vec<(String, String)> = env.snapshot().into_iter().collect();
        vars.sort();
        vars.iter()
            .map(|(name, value)| format!("declare -x {}=\"{}\"\n", name, escape(value)))
            .collect()
    }
}

impl Command for ExportCommand {
    fn execute(&self, args: &[String], env: &mut EnvironmentState) -> Result<String, CommandError> {
        if args.is_empty() {
            return Ok(Self::list(env));
        }

        let mut assignments = Vec::with_capacity(args.len());
        for arg in args {
            if let Some(pair) = Self::parse_export(arg)? {
                assignments.push(pair);
            }
        }

        env.set_all(assignments)?;
        Ok(String::new())
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
