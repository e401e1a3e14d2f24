use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::pipeline::{ParseError, Pipeline};
use crate::classifier;
use crate::client::{ClientError, CommandGenerator};
use crate::core::env::EnvironmentState;
use crate::input::{HistoryError, HistorySink};
use crate::process::{ExecutionResult, Executor, ProcessError};

/// Where a session is in handling the current line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Reading,
    Classifying,
    Executing,
    Generating,
    Rendering,
    Closed,
}

/// What became of one input line.
#[derive(Debug)]
pub enum Outcome {
    /// Blank input.
    Empty,
    Executed(ExecutionResult),
    /// The executor itself failed; the command's own errors are `Executed`.
    ExecutionFailed(ProcessError),
    Generated { command: String, elapsed: Duration },
    SyntaxError(ParseError),
    CollaboratorFailed(ClientError),
    Quit,
}

/// One interactive session: a private environment, the executor, the
/// generation client and the history file.
pub struct Session {
    env: EnvironmentState,
    executor: Executor,
    generator: Box<dyn CommandGenerator>,
    history: Option<HistorySink>,
    history_failed: bool,
    notice: Option<HistoryError>,
    state: DispatchState,
}

impl Session {
    pub fn new(
        env: EnvironmentState,
        executor: Executor,
        generator: Box<dyn CommandGenerator>,
    ) -> Self {
        Self {
            env,
            executor,
            generator,
            history: None,
            history_failed: false,
            notice: None,
            state: DispatchState::Idle,
        }
    }

    pub fn with_history(mut self, history: HistorySink) -> Self {
        self.history = Some(history);
        self
    }

    pub fn env(&self) -> &EnvironmentState {
        &self.env
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn set_state(&mut self, state: DispatchState) {
        if self.state != DispatchState::Closed {
            self.state = state;
        }
    }

    pub fn close(&mut self) {
        info!("session closed");
        self.state = DispatchState::Closed;
    }

    pub fn is_closed(&self) -> bool {
        self.state == DispatchState::Closed
    }

    /// Handles one line read from the user: records it, then runs it as a
    /// command or sends it to the generator depending on how it classifies.
    pub fn dispatch(&mut self, line: &str) -> Outcome {
        if self.is_closed() {
            return Outcome::Quit;
        }

        self.record(line);
        let input = line.trim();
        if input.is_empty() {
            self.state = DispatchState::Idle;
            return Outcome::Empty;
        }

        if is_quit(input) {
            self.close();
            return Outcome::Quit;
        }

        self.state = DispatchState::Classifying;
        let outcome = if classifier::is_shell_command(input) {
            self.run_command(input)
        } else {
            self.generate(input)
        };
        self.set_state(DispatchState::Rendering);
        outcome
    }

    /// Parses and executes `line` without classifying it.
    pub fn run_command(&mut self, line: &str) -> Outcome {
        let pipeline = match Pipeline::parse(line, &self.env) {
            Ok(pipeline) if pipeline.is_empty() => return Outcome::Empty,
            Ok(pipeline) => pipeline,
            Err(err) => {
                debug!(error = %err, "syntax error");
                return Outcome::SyntaxError(err);
            }
        };

        self.set_state(DispatchState::Executing);
        match self.executor.execute(&pipeline, &mut self.env) {
            Ok(result) => Outcome::Executed(result),
            Err(err) => Outcome::ExecutionFailed(err),
        }
    }

    pub fn generate(&mut self, query: &str) -> Outcome {
        self.set_state(DispatchState::Generating);
        let start = Instant::now();
        match self.generator.generate(query) {
            Ok(command) => Outcome::Generated {
                command,
                elapsed: start.elapsed(),
            },
            Err(err) => {
                debug!(error = %err, "generation failed");
                Outcome::CollaboratorFailed(err)
            }
        }
    }

    /// Runs startup lines as commands. Failures are logged and skipped.
    pub fn source_lines<I, S>(&mut self, lines: I) -> Vec<Outcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let outcomes: Vec<Outcome> = lines
            .into_iter()
            .map(|line| {
                let line = line.as_ref();
                let outcome = self.run_command(line);
                match &outcome {
                    Outcome::Executed(result) if !result.is_success() => warn!(
                        line,
                        exit_code = result.exit_code,
                        stderr = %result.stderr_text().trim_end(),
                        "startup command failed"
                    ),
                    Outcome::SyntaxError(err) => {
                        warn!(line, error = %err, "startup command skipped")
                    }
                    Outcome::ExecutionFailed(err) => {
                        warn!(line, error = %err, "startup command failed")
                    }
                    _ => {}
                }
                outcome
            })
            .collect();
        self.state = DispatchState::Idle;
        outcomes
    }

    /// The first history failure of the session, once.
    pub fn take_notice(&mut self) -> Option<HistoryError> {
        self.notice.take()
    }

    fn record(&mut self, line: &str) {
        let Some(history) = &self.history else {
            return;
        };
        if let Err(err) = history.append(line) {
            warn!(error = %err, "failed to append to history");
            if !self.history_failed {
                self.history_failed = true;
                self.notice = Some(err);
            }
        }
    }
}

fn is_quit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}
