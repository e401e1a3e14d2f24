mod vars;

pub use vars::EnvironmentState;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Home directory not found")]
    HomeDirNotFound,
    #[error("`{0}': not a valid identifier")]
    InvalidName(String),
    #[error("{}: Not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
