use super::{Command, CommandError};
use crate::core::env::EnvironmentState;
use crate::path::PathExpander;
use std::fs;
use std::path::PathBuf;

#[derive(Clone, Default)]
pub struct CdCommand {
    path_expander: PathExpander,
}

impl CdCommand {
    pub fn new() -> Self {
        Self {
            path_expander: PathExpander::new(),
        }
    }

    fn target(&self, arg: Option<&str>, env: &EnvironmentState) -> Result<PathBuf, CommandError> {
        match arg {
            None => Ok(env.home_dir()?),
            Some("-") => env
                .get("OLDPWD")
                .filter(|old| !old.is_empty())
                .map(PathBuf::from)
                .ok_or_else(|| CommandError::InvalidArguments("OLDPWD not set".into())),
            Some(path) => {
                let home = if self.path_expander.is_home_path(path) {
                    env.home_dir()?
                } else {
                    PathBuf::new()
                };
                Ok(self
                    .path_expander
                    .resolve(path, &home, env.working_directory()))
            }
        }
    }
}

impl Command for CdCommand {
    fn execute(&self, args: &[String], env: &mut EnvironmentState) -> Result<String, CommandError> {
        if args.len() > 1 {
            return Err(CommandError::InvalidArguments("too many arguments".into()));
        }

        let arg = args.first().map(String::as_str);
        let target = self.target(arg, env)?;
        let shown = arg.map_or_else(|| target.display().to_string(), str::to_owned);

        let resolved = fs::canonicalize(&target).map_err(|source| CommandError::Directory {
            path: shown.clone(),
            source,
        })?;
        if !resolved.is_dir() {
            return Err(CommandError::Directory {
                path: shown,
                source: std::io::Error::from_raw_os_error(libc::ENOTDIR),
            });
        }

        let previous = env.working_directory().display().to_string();
        env.set_working_directory(&resolved)?;
        let current = resolved.display().to_string();
        env.set_all([("OLDPWD", previous.as_str()), ("PWD", current.as_str())])?;

        // `cd -` echoes the directory it switched to.
        if arg == Some("-") {
            Ok(format!("{current}\n"))
        } else {
            Ok(String::new())
        }
    }
}
