use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info, warn};

pub mod pipeline;
pub mod render;
pub mod session;

pub use session::{DispatchState, Outcome, Session};

use crate::{
    client::GenerationClient,
    core::{
        config::{Config, ConfigLoader},
        env::EnvironmentState,
    },
    error::ShellError,
    highlight::{Highlighter, Tone},
    input::HistorySink,
    process::{signal, Executor},
};

/// Lines loaded into the editor from the history file at startup.
const EDITOR_HISTORY_LIMIT: usize = 1000;
/// Session variable holding a prompt template, expanded before each read.
pub const PROMPT_VAR: &str = "ASHELL_PROMPT";

/// Builds a session over the real process environment, talking to the
/// configured server and recording to the configured history file.
pub fn open_session(config: &Config, interrupt: Arc<AtomicBool>) -> Result<Session, ShellError> {
    let env = EnvironmentState::from_process()?;
    let client = GenerationClient::new(&config.server_url, config.timeout)?;
    let history = HistorySink::new(config.paths.history_path.clone());

    let executor = Executor::new(interrupt).foreground_terminal(true);
    Ok(Session::new(env, executor, Box::new(client)).with_history(history))
}

pub struct Shell {
    editor: DefaultEditor,
    session: Session,
    config: Config,
    highlighter: Highlighter,
    quit: Arc<AtomicBool>,
}

impl Shell {
    pub fn new(config: Config) -> Result<Self, ShellError> {
        let editor = DefaultEditor::new()?;

        let interrupt = Arc::new(AtomicBool::new(false));
        let quit = Arc::new(AtomicBool::new(false));
        signal::install_interrupt_handler(Arc::clone(&interrupt))?;
        signal::register_quit_signals(Arc::clone(&quit), Arc::clone(&interrupt))?;

        let session = open_session(&config, interrupt)?;

        Ok(Shell {
            editor,
            session,
            config,
            highlighter: Highlighter::new(),
            quit,
        })
    }

    /// Reads and dispatches lines until `exit`, end of input, or a quit
    /// signal. The read at the prompt restarts after a signal, so SIGTERM
    /// there takes effect once the current read returns; a second SIGTERM
    /// exits at once.
    pub fn run(&mut self) -> Result<(), ShellError> {
        info!(server = %self.config.server_url, "session started");
        self.load_history();
        self.source_rc();

        while !self.quit.load(Ordering::SeqCst) && !self.session.is_closed() {
            self.session.set_state(DispatchState::Reading);
            let prompt = self.prompt();
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                        debug!(error = %e, "editor rejected history entry");
                    }

                    let outcome = self.session.dispatch(&line);
                    if let Some(notice) = self.session.take_notice() {
                        let message = format!("history disabled for this session: {notice}");
                        eprintln!("{}", self.highlighter.paint(&message, Tone::Hint));
                    }
                    self.render(&outcome);
                    if matches!(outcome, Outcome::Quit) {
                        break;
                    }
                    self.session.set_state(DispatchState::Idle);
                }
                Err(e) if ends_session(&e, self.quit.load(Ordering::SeqCst)) => break,
                // Ctrl-C at the prompt discards the line.
                Err(ReadlineError::Interrupted) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        self.session.close();
        Ok(())
    }

    fn render(&self, outcome: &Outcome) {
        let result = render::render(
            outcome,
            &self.highlighter,
            self.config.quiet,
            &mut io::stdout().lock(),
            &mut io::stderr().lock(),
        );
        if let Err(e) = result {
            warn!(error = %e, "failed to write output");
        }
    }

    fn load_history(&mut self) {
        let sink = HistorySink::new(self.config.paths.history_path.clone());
        match sink.recent(EDITOR_HISTORY_LIMIT) {
            Ok(entries) => {
                for entry in entries {
                    let _ = self.editor.add_history_entry(entry);
                }
            }
            Err(e) => warn!(error = %e, "could not load history"),
        }
    }

    fn source_rc(&mut self) {
        let rc_path = self.config.paths.rc_path.clone();
        match ConfigLoader::new(&rc_path).load_lines() {
            Ok(lines) if !lines.is_empty() => {
                debug!(path = %rc_path.display(), count = lines.len(), "sourcing startup file");
                for outcome in self.session.source_lines(lines) {
                    // Failures were already logged.
                    if matches!(&outcome, Outcome::Executed(result) if result.is_success()) {
                        self.render(&outcome);
                    }
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not read startup file"),
        }
    }

    fn prompt(&self) -> String {
        let env = self.session.env();
        if let Some(template) = env.get(PROMPT_VAR).filter(|t| !t.is_empty()) {
            return env.expand(template);
        }

        let cwd = env.working_directory();
        let home = env.home_dir().unwrap_or_default();
        let shown = match cwd.strip_prefix(&home) {
            Ok(rest) if home.as_os_str().is_empty() => rest.display().to_string(),
            Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
            Ok(rest) => format!("~/{}", rest.display()),
            Err(_) => cwd.display().to_string(),
        };
        format!("{} > ", shown)
    }
}

/// Whether a failed read ends the loop: end of input always does, an
/// interrupted read does once a quit signal has been raised.
fn ends_session(err: &ReadlineError, quit: bool) -> bool {
    match err {
        ReadlineError::Eof => true,
        ReadlineError::Interrupted => quit,
        _ => false,
    }
}
