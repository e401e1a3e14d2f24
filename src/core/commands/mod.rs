use std::io;

mod cd;
mod export;
mod unset;

pub use cd::CdCommand;
pub use export::ExportCommand;
pub use unset::UnsetCommand;

use crate::core::env::{EnvError, EnvironmentState};
use crate::process::ExecutionResult;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{path}: {}", describe(.source))]
    Directory {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Env(#[from] EnvError),
}

/// A command that runs inside the shell process. Returns the text it prints.
pub trait Command {
    fn execute(&self, args: &[String], env: &mut EnvironmentState) -> Result<String, CommandError>;
}

/// The closed set of commands that must mutate session state and therefore
/// cannot be run as child processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Export,
    Unset,
}

impl Builtin {
    pub const ALL: [Builtin; 3] = [Builtin::Cd, Builtin::Export, Builtin::Unset];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Cd => "cd",
            Builtin::Export => "export",
            Builtin::Unset => "unset",
        }
    }

    /// Runs the built-in, folding failures into exit status 1 and a
    /// `name: message` diagnostic, the way shells report them.
    pub fn run(self, args: &[String], env: &mut EnvironmentState) -> ExecutionResult {
        match self.execute(args, env) {
            Ok(output) => ExecutionResult::success(output),
            Err(err) => {
                tracing::debug!(builtin = self.name(), error = %err, "built-in failed");
                ExecutionResult::failure(1, format!("{}: {}\n", self.name(), err))
            }
        }
    }
}

impl Command for Builtin {
    fn execute(&self, args: &[String], env: &mut EnvironmentState) -> Result<String, CommandError> {
        match self {
            Builtin::Cd => CdCommand::new().execute(args, env),
            Builtin::Export => ExportCommand.execute(args, env),
            Builtin::Unset => UnsetCommand.execute(args, env),
        }
    }
}

/// OS error text without the trailing `(os error N)`.
fn describe(err: &io::Error) -> String {
    let text = err.to_string();
    match text.find(" (os error") {
        Some(index) => text[..index].to_string(),
        None => text,
    }
}
