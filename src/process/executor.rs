use std::io::{self, Read};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use libc::{SIGINT, SIGKILL, SIGTERM};

use super::terminal::ForegroundGuard;
use super::{signal, ExecutionResult, ProcessError, EXIT_INTERRUPTED};
use crate::core::env::EnvironmentState;
use crate::shell::pipeline::{Pipeline, PipelineStage};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long stages get to exit after SIGTERM before they are killed.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Runs parsed pipelines.
///
/// Every stage of a multi-stage pipeline is spawned before any is waited on,
/// with each stage's stdout handed straight to the next stage's stdin as an
/// OS pipe. All stages share one process group, so anything a stage starts
/// is signalled along with it. The call returns only once every stage has
/// been reaped.
#[derive(Clone)]
pub struct Executor {
    interrupt: Arc<AtomicBool>,
    capture_intermediate_stderr: bool,
    foreground_terminal: bool,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)))
    }
}

impl Executor {
    /// `interrupt` is raised by the Ctrl-C handler; while a pipeline runs it
    /// is polled and, once set, all running stages are terminated.
    pub fn new(interrupt: Arc<AtomicBool>) -> Self {
        Self {
            interrupt,
            capture_intermediate_stderr: false,
            foreground_terminal: false,
        }
    }

    /// Collect stderr of every stage instead of leaving the intermediate ones
    /// attached to the terminal.
    pub fn capture_intermediate_stderr(mut self, capture: bool) -> Self {
        self.capture_intermediate_stderr = capture;
        self
    }

    /// Give the controlling terminal to each pipeline's process group while
    /// it runs, so stages can read from it and receive Ctrl-C directly.
    /// Has no effect unless the shell owns the terminal.
    pub fn foreground_terminal(mut self, foreground: bool) -> Self {
        self.foreground_terminal = foreground;
        self
    }

    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn execute(
        &self,
        pipeline: &Pipeline,
        env: &mut EnvironmentState,
    ) -> Result<ExecutionResult, ProcessError> {
        match pipeline.stages() {
            [] => Ok(ExecutionResult::default()),
            [PipelineStage::Builtin { builtin, args }] => Ok(builtin.run(args, env)),
            stages => self.run_external(stages, env),
        }
    }

    fn run_external(
        &self,
        stages: &[PipelineStage],
        env: &EnvironmentState,
    ) -> Result<ExecutionResult, ProcessError> {
        self.interrupt.store(false, Ordering::SeqCst);

        let last = stages.len() - 1;
        let mut running = RunningPipeline::default();
        let mut stderr_readers = Vec::new();
        let mut stdout_reader = None;
        let mut previous_stdout = None;

        for (index, stage) in stages.iter().enumerate() {
            let PipelineStage::External { program, args } = stage else {
                debug_assert!(false, "{} reached the executor inside a pipeline", stage.program());
                continue;
            };
            let is_last = index == last;

            let mut command = Command::new(program);
            command
                .args(args)
                .current_dir(env.working_directory())
                .envs(env.snapshot())
                .stdout(Stdio::piped());
            for name in env.removed() {
                command.env_remove(name);
            }
            command.stdin(match previous_stdout.take() {
                Some(stdout) => Stdio::from(stdout),
                None => Stdio::inherit(),
            });
            command.stderr(if is_last || self.capture_intermediate_stderr {
                Stdio::piped()
            } else {
                Stdio::inherit()
            });
            // The first stage leads a new group; the rest join it.
            command.process_group(running.pgid.map_or(0, |pgid| pgid as i32));

            debug!(program = %program, ?args, stage = index, "spawning");
            let mut child = match command.spawn() {
                Ok(child) => child,
                Err(err) => {
                    debug!(program = %program, error = %err, "spawn failed");
                    // Dropping `running` kills and reaps the stages
                    // already started.
                    return Ok(ExecutionResult::spawn_failure(program, &err));
                }
            };

            if let Some(stderr) = child.stderr.take() {
                stderr_readers.push(drain(program, stderr));
            }
            if is_last {
                stdout_reader = child.stdout.take().map(|stdout| drain(program, stdout));
            } else {
                previous_stdout = child.stdout.take();
            }
            running.push(program, child);
        }

        if self.foreground_terminal {
            running.foreground = running.pgid.and_then(ForegroundGuard::acquire);
        }
        let statuses = running.wait_all(&self.interrupt)?;
        // Descendants of the stages can outlive them and hold the output
        // pipes open; the readers below finish only once those are gone.
        if running.interrupted {
            running.signal(SIGKILL);
        }
        running.foreground = None;

        let stdout = match stdout_reader {
            Some(reader) => running.collect(reader, &self.interrupt)?,
            None => Vec::new(),
        };
        let mut stderr = Vec::new();
        for reader in stderr_readers {
            stderr.extend(running.collect(reader, &self.interrupt)?);
        }

        // Ctrl-C on a terminal handed to the pipeline reaches the stages
        // directly rather than through the flag.
        let interrupted = running.interrupted
            || statuses.last().and_then(|status| status.signal()) == Some(SIGINT);
        let exit_code = if interrupted {
            EXIT_INTERRUPTED
        } else {
            statuses.last().map_or(0, exit_code)
        };
        debug!(exit_code, interrupted, "pipeline finished");

        Ok(ExecutionResult {
            stdout,
            stderr,
            exit_code,
            interrupted,
        })
    }
}

/// Shell-style exit code: the process's own code, or 128 + signal number.
fn exit_code(status: &ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

struct Stage {
    program: String,
    child: Child,
    status: Option<ExitStatus>,
}

/// Owns the children of one pipeline. Whatever path leaves the executor,
/// dropping this kills the process group and reaps any stage still alive.
#[derive(Default)]
struct RunningPipeline {
    stages: Vec<Stage>,
    /// Process group of the pipeline: the first stage's pid.
    pgid: Option<u32>,
    /// Released after `Drop` has reaped the stages.
    foreground: Option<ForegroundGuard>,
    interrupted: bool,
}

impl RunningPipeline {
    fn push(&mut self, program: &str, child: Child) {
        self.pgid.get_or_insert(child.id());
        self.stages.push(Stage {
            program: program.to_string(),
            child,
            status: None,
        });
    }

    fn wait_all(&mut self, interrupt: &AtomicBool) -> Result<Vec<ExitStatus>, ProcessError> {
        let mut terminated_at: Option<Instant> = None;

        loop {
            for stage in self.stages.iter_mut().filter(|s| s.status.is_none()) {
                stage.status = stage
                    .child
                    .try_wait()
                    .map_err(|source| ProcessError::Wait {
                        program: stage.program.clone(),
                        source,
                    })?;
            }

            if self.stages.iter().all(|s| s.status.is_some()) {
                return Ok(self.stages.iter().filter_map(|s| s.status).collect());
            }

            match terminated_at {
                None if interrupt.load(Ordering::SeqCst) => {
                    debug!(pgid = ?self.pgid, "interrupt received, terminating pipeline");
                    self.interrupted = true;
                    self.signal(SIGTERM);
                    terminated_at = Some(Instant::now());
                }
                Some(at) if at.elapsed() > KILL_GRACE => {
                    self.signal(SIGKILL);
                    terminated_at = Some(Instant::now());
                }
                _ => {}
            }

            thread::sleep(POLL_INTERVAL);
        }
    }

    fn signal(&self, sig: i32) {
        let Some(pgid) = self.pgid else {
            return;
        };
        if let Err(err) = signal::signal_group(pgid, sig) {
            warn!(pgid, signal = sig, error = %err, "failed to signal pipeline");
        }
    }

    /// Waits for an output reader. An interrupt that arrives while a
    /// descendant still holds the pipe kills the whole group.
    fn collect(
        &mut self,
        (program, handle): Reader,
        interrupt: &AtomicBool,
    ) -> Result<Vec<u8>, ProcessError> {
        while !handle.is_finished() {
            if !self.interrupted && interrupt.load(Ordering::SeqCst) {
                debug!(pgid = ?self.pgid, "interrupt received while draining output");
                self.interrupted = true;
                self.signal(SIGKILL);
            }
            thread::sleep(POLL_INTERVAL);
        }
        match handle.join() {
            Ok(result) => result.map_err(|source| ProcessError::Output { program, source }),
            Err(_) => Err(ProcessError::Output {
                program,
                source: io::Error::other("output reader panicked"),
            }),
        }
    }
}

impl Drop for RunningPipeline {
    fn drop(&mut self) {
        if self.stages.iter().any(|s| s.status.is_none()) {
            self.signal(SIGKILL);
        }
        for stage in self.stages.iter_mut().filter(|s| s.status.is_none()) {
            let _ = stage.child.wait();
        }
    }
}

type Reader = (String, JoinHandle<io::Result<Vec<u8>>>);

fn drain<R: Read + Send + 'static>(program: &str, mut source: R) -> Reader {
    let handle = thread::spawn(move || {
        let mut buf = Vec::new();
        source.read_to_end(&mut buf)?;
        Ok(buf)
    });
    (program.to_string(), handle)
}
