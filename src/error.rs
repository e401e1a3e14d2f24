use crate::client::ClientError;
use crate::core::config::ConfigError;
use crate::core::env::EnvError;
use crate::process::ProcessError;

/// Failures that end the program. Everything that goes wrong while handling a
/// single line is reported and the session continues.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Environment error: {0}")]
    Env(#[from] EnvError),
    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Process error: {0}")]
    ProcessError(#[from] ProcessError),
    #[error("{0}")]
    Client(#[from] ClientError),
    #[error("Flag error: {0}")]
    FlagError(String),
}
