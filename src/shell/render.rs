use std::io::{self, Write};

use super::session::Outcome;
use crate::client::ClientError;
use crate::highlight::{Highlighter, Tone};

/// Writes an outcome the way the user sees it. Command output is copied
/// byte for byte; everything the shell adds goes to `err` except generated
/// commands.
pub fn render<O: Write, E: Write>(
    outcome: &Outcome,
    highlighter: &Highlighter,
    quiet: bool,
    out: &mut O,
    err: &mut E,
) -> io::Result<()> {
    match outcome {
        Outcome::Empty | Outcome::Quit => {}
        Outcome::Executed(result) => {
            out.write_all(&result.stdout)?;
            out.flush()?;
            err.write_all(&result.stderr)?;
            if result.interrupted {
                writeln!(err)?;
            } else if !result.is_success() && !quiet {
                let hint = format!("[exit {}]", result.exit_code);
                writeln!(err, "{}", highlighter.paint(&hint, Tone::Hint))?;
            }
        }
        Outcome::Generated { command, elapsed } => {
            if quiet {
                writeln!(out, "{command}")?;
            } else {
                let timing = format!("(generated in {:.2}s)", elapsed.as_secs_f64());
                writeln!(
                    out,
                    "{} {}",
                    highlighter.command(command),
                    highlighter.paint(&timing, Tone::Hint)
                )?;
            }
        }
        Outcome::SyntaxError(parse_err) => {
            let message = format!("ashell: syntax error: {parse_err}");
            writeln!(err, "{}", highlighter.paint(&message, Tone::Error))?;
        }
        Outcome::ExecutionFailed(process_err) => {
            let message = format!("ashell: {process_err}");
            writeln!(err, "{}", highlighter.paint(&message, Tone::Error))?;
        }
        Outcome::CollaboratorFailed(client_err) => {
            writeln!(err, "{}", highlighter.paint(&client_err.to_string(), Tone::Error))?;
            if let Some(hint) = collaborator_hint(client_err) {
                writeln!(err, "{}", highlighter.paint(hint, Tone::Hint))?;
            }
        }
    }
    err.flush()
}

fn collaborator_hint(err: &ClientError) -> Option<&'static str> {
    match err {
        ClientError::Connect(_) => Some("is the generation server running? (ashell --ping)"),
        ClientError::Timeout(_) => Some("the server may still be loading its model; try again"),
        _ => None,
    }
}
