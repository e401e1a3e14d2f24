use std::borrow::Cow;
use std::io;

pub mod executor;
pub mod signal;
mod terminal;

pub use executor::Executor;

/// Exit code reported when a program cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code reported when a program exists but cannot be started.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;
/// Exit code reported for a pipeline cancelled by the user.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Captured output of the last pipeline stage.
///
/// The bytes are exactly what the process wrote; trimming a trailing newline
/// is left to whoever renders them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
    pub interrupted: bool,
}

impl ExecutionResult {
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code,
            ..Self::default()
        }
    }

    /// Result for a stage that never started.
    pub fn spawn_failure(program: &str, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::failure(
                EXIT_NOT_FOUND,
                format!("ashell: command not found: {program}\n"),
            ),
            _ => Self::failure(EXIT_CANNOT_EXECUTE, format!("ashell: {program}: {err}\n")),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read output of {program}: {source}")]
    Output {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Signal error: {0}")]
    SignalError(String),
}
