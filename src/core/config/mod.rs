use std::path::PathBuf;
use std::time::Duration;

mod loader;
mod paths;

pub use loader::ConfigLoader;
pub use paths::ConfigPaths;

use crate::client::{DEFAULT_SERVER_URL, DEFAULT_TIMEOUT};
use crate::flags::Flags;

pub const SERVER_URL_VAR: &str = "ASH_SERVER_URL";
pub const TIMEOUT_VAR: &str = "ASH_TIMEOUT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,
    #[error("invalid timeout {0:?}: expected a positive number of seconds")]
    InvalidTimeout(String),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Settings for one run, resolved from flags, then the environment, then
/// built-in defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server_url: String,
    pub timeout: Duration,
    pub quiet: bool,
    pub debug: bool,
    pub paths: ConfigPaths,
}

impl Config {
    pub fn new(flags: &Flags) -> Result<Self, ConfigError> {
        Self::resolve(flags, ConfigPaths::new()?, |name| std::env::var(name).ok())
    }

    /// `lookup` reads environment variables; tests pass a closure instead of
    /// mutating the process environment.
    pub fn resolve<F>(flags: &Flags, paths: ConfigPaths, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_url = flags
            .get_value("server")
            .cloned()
            .or_else(|| lookup(SERVER_URL_VAR).filter(|url| !url.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        let timeout = match flags.get_value("timeout").cloned().or_else(|| lookup(TIMEOUT_VAR)) {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_TIMEOUT,
        };

        let paths = match flags.get_value("config") {
            Some(rc) => paths.with_rc_path(rc),
            None => paths,
        };

        Ok(Config {
            server_url,
            timeout,
            quiet: flags.is_set("quiet"),
            debug: flags.is_set("debug"),
            paths,
        })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| ConfigError::InvalidTimeout(raw.to_string()))
}
