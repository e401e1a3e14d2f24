use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::thread;
use std::time::Duration;

use ashell::client::{ClientError, CommandGenerator, GenerationClient};
use ashell::core::env::EnvironmentState;
use ashell::input::HistorySink;
use ashell::process::{ExecutionResult, Executor};
use ashell::shell::pipeline::ParseError;
use ashell::shell::{Outcome, Session};
use pretty_assertions::assert_eq;

struct Unreachable;

impl CommandGenerator for Unreachable {
    fn generate(&self, _query: &str) -> Result<String, ClientError> {
        Err(ClientError::Connect("http://127.0.0.1:9".into()))
    }
}

fn session_in(dir: &Path) -> Session {
    let mut env = EnvironmentState::new(dir);
    env.set("PATH", &std::env::var("PATH").unwrap_or_default())
        .unwrap();
    env.set("HOME", &dir.display().to_string()).unwrap();
    Session::new(env, Executor::default(), Box::new(Unreachable))
}

fn executed(outcome: Outcome) -> ExecutionResult {
    match outcome {
        Outcome::Executed(result) => result,
        other => panic!("expected an executed command, got {other:?}"),
    }
}

#[test]
fn export_persists_across_lines() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());

    assert!(executed(session.dispatch("export VAR=\"hello world\"")).is_success());
    let result = executed(session.dispatch("echo $VAR"));
    assert!(result.stdout_text().contains("hello world"));

    executed(session.dispatch("export VAR=changed"));
    assert_eq!(executed(session.dispatch("echo $VAR")).stdout_text(), "changed\n");
}

#[test]
fn export_many_and_expand_together() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());

    executed(session.dispatch("export VAR1=\"v1\" VAR2=\"v2\""));
    let result = executed(session.dispatch("echo \"$VAR1-${VAR2}\" '$VAR1'"));
    assert_eq!(result.stdout_text(), "v1-v2 $VAR1\n");
}

#[test]
fn pipeline_counts_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());

    let result = executed(session.dispatch("echo \"hello world\" | wc -c"));
    assert!(result.stdout_text().contains("12"));
}

#[test]
fn missing_file_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());

    let result = executed(session.dispatch("cat no-such-file.txt"));
    assert_ne!(result.exit_code, 0);
    assert!(result.stderr_text().to_lowercase().contains("no such file"));
}

#[test]
fn rmdir_refuses_non_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let full = dir.path().join("full");
    fs::create_dir(&full).unwrap();
    fs::write(full.join("keep.txt"), "data").unwrap();
    let mut session = session_in(dir.path());

    let result = executed(session.dispatch("rmdir full"));
    assert_ne!(result.exit_code, 0);
    assert!(result.stderr_text().to_lowercase().contains("not empty"));
    assert!(full.join("keep.txt").exists());
}

#[test]
fn unreadable_file_can_be_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("locked.txt");
    fs::write(&file, "secret").unwrap();
    fs::set_permissions(&file, fs::Permissions::from_mode(0o000)).unwrap();
    let mut session = session_in(dir.path());

    let result = executed(session.dispatch("cat locked.txt"));
    // Root can read anything; only check the message when access was refused.
    if result.exit_code != 0 {
        assert!(result.stderr_text().to_lowercase().contains("permission denied"));
    }

    fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();
    fs::remove_file(&file).unwrap();
    assert!(!file.exists());
}

#[test]
fn blank_line_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());
    assert!(matches!(session.dispatch(""), Outcome::Empty));
    assert!(matches!(session.dispatch(" \t "), Outcome::Empty));
}

#[test]
fn cd_changes_directory_for_later_commands() {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join("marker"), "").unwrap();
    let mut session = session_in(&root);

    assert!(executed(session.dispatch("cd sub")).is_success());
    assert_eq!(executed(session.dispatch("ls")).stdout_text(), "marker\n");

    let failed = executed(session.dispatch("cd nowhere"));
    assert_eq!(failed.exit_code, 1);
    assert!(failed.stderr_text().starts_with("cd: nowhere:"));
    assert_eq!(session.env().working_directory(), root.join("sub"));

    executed(session.dispatch("cd ~"));
    assert_eq!(session.env().working_directory(), root);
}

#[test]
fn globs_expand_sorted_in_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    for name in ["b.txt", "a.txt", "c.md"] {
        fs::write(docs.join(name), "").unwrap();
    }
    let mut session = session_in(dir.path());

    let result = executed(session.dispatch("ls docs/*.txt"));
    assert_eq!(result.stdout_text(), "docs/a.txt\ndocs/b.txt\n");

    let result = executed(session.dispatch("echo docs/*.none '*.txt'"));
    assert_eq!(result.stdout_text(), "docs/*.none *.txt\n");
}

#[test]
fn trailing_slash_glob_lists_directories() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("dir1")).unwrap();
    fs::write(dir.path().join("f1"), "").unwrap();
    let mut session = session_in(dir.path());

    assert_eq!(executed(session.dispatch("echo */")).stdout_text(), "dir1/\n");
}

#[test]
fn quoted_pipe_is_literal() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());
    let result = executed(session.dispatch("echo 'a | b' \"c|d\""));
    assert_eq!(result.stdout_text(), "a | b c|d\n");
}

#[test]
fn builtin_inside_pipeline_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());

    assert!(matches!(
        session.dispatch("export X=1 | cat"),
        Outcome::SyntaxError(ParseError::BuiltinInPipeline(_))
    ));
    assert_eq!(session.env().get("X"), None);
}

#[test]
fn unset_hides_variable_from_children() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());

    executed(session.dispatch("export SECRET=shh"));
    assert_eq!(executed(session.dispatch("printenv SECRET")).stdout_text(), "shh\n");
    executed(session.dispatch("unset SECRET"));
    assert_ne!(executed(session.dispatch("printenv SECRET")).exit_code, 0);
}

#[test]
fn natural_language_failure_keeps_session_alive() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(dir.path());

    assert!(matches!(
        session.dispatch("show me all files in the current directory"),
        Outcome::CollaboratorFailed(ClientError::Connect(_))
    ));
    assert!(executed(session.dispatch("echo still here")).is_success());
}

#[test]
fn history_records_raw_lines() {
    let dir = tempfile::tempdir().unwrap();
    let history_path = dir.path().join(".ashell").join("history");
    let mut session = session_in(dir.path()).with_history(HistorySink::new(history_path.clone()));

    session.dispatch("echo  \"spaced   out\" ");
    session.dispatch("   ");
    session.dispatch("quit");

    assert_eq!(
        fs::read_to_string(&history_path).unwrap(),
        "echo  \"spaced   out\" \nquit\n"
    );
}

#[test]
fn generates_through_http_server() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).unwrap();
        let request = String::from_utf8_lossy(&buf[..n]).to_string();
        let body = r#"{"command": "find . -name '*.rs'"}"#;
        let reply = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(reply.as_bytes()).unwrap();
        request
    });

    let dir = tempfile::tempdir().unwrap();
    let client = GenerationClient::new(&url, Duration::from_secs(5)).unwrap();
    let mut session = Session::new(
        EnvironmentState::new(dir.path()),
        Executor::default(),
        Box::new(client),
    );

    match session.dispatch("please list every rust file") {
        Outcome::Generated { command, .. } => assert_eq!(command, "find . -name '*.rs'"),
        other => panic!("expected a generated command, got {other:?}"),
    }
    let request = server.join().unwrap();
    assert!(request.starts_with("GET /generate?q=please"));
}
