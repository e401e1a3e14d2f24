use super::ConfigError;
use std::path::{Path, PathBuf};

const DATA_DIR: &str = ".ashell";
const HISTORY_FILE: &str = "history";
const RC_FILE: &str = "ashellrc";

/// Files the shell keeps under `~/.ashell`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub data_dir: PathBuf,
    pub history_path: PathBuf,
    pub rc_path: PathBuf,
}

impl ConfigPaths {
    pub fn new() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
        Ok(Self::from_home(&home))
    }

    pub fn from_home(home: &Path) -> Self {
        let data_dir = home.join(DATA_DIR);
        ConfigPaths {
            history_path: data_dir.join(HISTORY_FILE),
            rc_path: data_dir.join(RC_FILE),
            data_dir,
        }
    }

    pub fn with_rc_path(mut self, rc_path: impl Into<PathBuf>) -> Self {
        self.rc_path = rc_path.into();
        self
    }
}
