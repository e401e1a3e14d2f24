use ashell::classifier;
use ashell::client::GenerationClient;
use ashell::core::config::Config;
use ashell::error::ShellError;
use ashell::flags::Flags;
use ashell::highlight::{Highlighter, Tone};
use ashell::logging;
use ashell::process::signal;
use ashell::shell::{self, render, Outcome, Shell};
use std::env;
use std::io;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

const WAIT_DEADLINE: Duration = Duration::from_secs(30);
const WAIT_INTERVAL: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ashell: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode, ShellError> {
    let mut flags = Flags::new();
    let args: Vec<String> = env::args().skip(1).collect();
    flags.parse(&args)?;

    if flags.is_set("help") {
        flags.print_help();
        return Ok(ExitCode::SUCCESS);
    }

    if flags.is_set("version") {
        println!("ashell {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::new(&flags)?;
    logging::init(config.debug);

    if flags.is_set("ping") {
        return ping(&config);
    }

    if flags.is_set("wait") && !wait_for_server(&config)? {
        return Ok(ExitCode::FAILURE);
    }

    if let Some(query) = flags.query() {
        return one_shot(&config, &query);
    }

    let mut shell = Shell::new(config)?;
    shell.run()?;
    Ok(ExitCode::SUCCESS)
}

fn ping(config: &Config) -> Result<ExitCode, ShellError> {
    let client = GenerationClient::new(&config.server_url, config.timeout)?;
    let highlighter = Highlighter::new();

    match client.health() {
        Ok(health) if health.is_healthy() => {
            let model = health.model.as_deref().unwrap_or("unknown model");
            let message = format!("server at {} is healthy ({})", client.base_url(), model);
            println!("{}", highlighter.paint(&message, Tone::Success));
            Ok(ExitCode::SUCCESS)
        }
        Ok(health) => {
            let message = format!("server at {} reports status {}", client.base_url(), health.status);
            eprintln!("{}", highlighter.paint(&message, Tone::Error));
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            eprintln!("{}", highlighter.paint(&e.to_string(), Tone::Error));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn wait_for_server(config: &Config) -> Result<bool, ShellError> {
    let client = GenerationClient::new(&config.server_url, config.timeout.min(WAIT_INTERVAL * 5))?;
    let highlighter = Highlighter::new();

    if !config.quiet {
        eprintln!(
            "{}",
            highlighter.paint(&format!("waiting for {} ...", client.base_url()), Tone::Hint)
        );
    }
    match client.wait_until_healthy(WAIT_DEADLINE, WAIT_INTERVAL) {
        Ok(_) => Ok(true),
        Err(e) => {
            let message = format!("server did not become ready: {}", e);
            eprintln!("{}", highlighter.paint(&message, Tone::Error));
            Ok(false)
        }
    }
}

/// Runs a single request given on the command line: commands are executed,
/// anything else is turned into a command and printed.
fn one_shot(config: &Config, query: &str) -> Result<ExitCode, ShellError> {
    let interrupt = Arc::new(AtomicBool::new(false));
    signal::install_interrupt_handler(Arc::clone(&interrupt))?;
    let mut session = shell::open_session(config, interrupt)?;

    let outcome = if classifier::is_shell_command(query) {
        session.run_command(query)
    } else {
        session.generate(query)
    };

    render::render(
        &outcome,
        &Highlighter::new(),
        config.quiet,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )?;

    Ok(match outcome {
        Outcome::Executed(result) => ExitCode::from(u8::try_from(result.exit_code).unwrap_or(1)),
        Outcome::Generated { .. } | Outcome::Empty | Outcome::Quit => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
