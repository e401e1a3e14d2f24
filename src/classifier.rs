//! Decides whether a line of input is a literal shell command or a
//! natural-language request.
//!
//! The check is purely lexical: it never touches the filesystem, `PATH` or the
//! network, so the same text always classifies the same way.

use tracing::debug;

/// Operators that only make sense to a shell. Any occurrence marks the input
/// as a command even though the parser itself only understands `|`.
const SHELL_OPERATORS: &[&str] = &["|", "&&", "||", ";", ">", ">>", "2>", "&>"];

const PATH_PREFIXES: &[&str] = &["./", "/", "~/"];

/// Program names recognised as the first word of a command line.
const KNOWN_COMMANDS: &[&str] = &[
    // shell built-ins and job control
    "alias", "bg", "cd", "exec", "exit", "export", "fg", "history", "jobs", "pushd", "popd",
    "set", "source", "type", "umask", "unalias", "unset",
    // file and directory utilities
    "basename", "cat", "chgrp", "chmod", "chown", "cp", "dd", "dirname", "du", "file", "find",
    "ln", "ls", "mkdir", "mktemp", "mv", "pwd", "readlink", "realpath", "rm", "rmdir", "stat",
    "touch", "tree",
    // text processing
    "awk", "column", "comm", "cut", "diff", "echo", "egrep", "fgrep", "fmt", "fold", "grep",
    "head", "jq", "join", "less", "more", "nl", "paste", "printf", "rg", "sed", "sort",
    "split", "strings", "tail", "tee", "tr", "uniq", "wc", "xargs", "yq",
    // system and processes
    "clear", "date", "df", "dmesg", "env", "free", "hostname", "htop", "id", "kill",
    "killall", "lsof", "man", "nice", "nohup", "pgrep", "pkill", "printenv", "ps", "reset",
    "sleep", "su", "sudo", "sysctl", "systemctl", "time", "top", "uname", "uptime", "w",
    "watch", "which", "who", "whoami",
    // archives and compression
    "bunzip2", "bzip2", "gunzip", "gzip", "tar", "unzip", "xz", "zip",
    // networking
    "curl", "dig", "ftp", "ifconfig", "ip", "netstat", "nslookup", "ping", "rsync", "scp",
    "sftp", "ssh", "telnet", "traceroute", "wget",
    // version control and build tools
    "cargo", "cmake", "gcc", "git", "g++", "go", "gradle", "hg", "javac", "make", "mvn",
    "rustc", "rustup", "svn",
    // package managers
    "apt", "apt-get", "brew", "dnf", "npm", "npx", "pacman", "pip", "pip3", "pnpm", "port",
    "yarn", "yum",
    // interpreters and runtimes
    "bun", "deno", "java", "lua", "node", "perl", "php", "python", "python3", "ruby",
    // editors and pagers
    "code", "emacs", "nano", "nvim", "vi", "vim",
    // shells and multiplexers
    "bash", "dash", "fish", "screen", "sh", "tmux", "zsh",
    // databases
    "mongo", "mysql", "psql", "redis-cli", "sqlite3",
    // containers and orchestration
    "docker", "docker-compose", "helm", "kubectl", "podman",
    // macOS
    "defaults", "diskutil", "launchctl", "mdfind", "open", "osascript", "pbcopy", "pbpaste",
    "say",
];

/// Returns `true` when `text` reads as a shell command.
///
/// Rules are applied in order and the first match wins:
/// blank input is natural language, a leading path is a command, any shell
/// operator is a command, and otherwise the first word must be a known
/// program name (exact, case-sensitive).
pub fn is_shell_command(text: &str) -> bool {
    let Some(first) = text.split_whitespace().next() else {
        return false;
    };

    if PATH_PREFIXES.iter().any(|prefix| first.starts_with(prefix)) {
        debug!(first, "classified as shell: path prefix");
        return true;
    }

    if SHELL_OPERATORS.iter().any(|op| text.contains(op)) {
        debug!("classified as shell: operator present");
        return true;
    }

    let known = is_known_command(first);
    debug!(first, known, "classified by command name");
    known
}

pub fn is_known_command(name: &str) -> bool {
    KNOWN_COMMANDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_known_commands() {
        let commands = [
            "ls -la",
            "cd /home/user",
            "pwd",
            "cat file.txt",
            "echo 'hello world'",
            "rm -rf directory",
            "find . -name '*.py'",
            "grep -r 'pattern' .",
            "awk '{print $1}' file.txt",
            "export PATH=/usr/local/bin:$PATH",
            "exit",
            "history",
            "python script.py",
            "pip install package",
            "npm install",
            "git status",
            "ssh user@host",
            "sudo apt update",
            "source ~/.bashrc",
            "alias ll='ls -la'",
            "bg %1",
            "nvim file.txt",
            "sqlite3 database.db",
            "kubectl get pods",
            "osascript -e 'display dialog \"Hello\"'",
        ];

        for command in commands {
            assert!(is_shell_command(command), "expected shell: {command}");
        }
    }

    #[test]
    fn test_operators() {
        let commands = [
            "ls | grep .py",
            "cd /tmp && ls",
            "mkdir test || echo 'failed'",
            "echo 'hello'; echo 'world'",
            "cat file.txt > output.txt",
            "echo 'hello' >> log.txt",
            "ls 2> error.log",
            "ls &> all.log",
            "ps aux | grep python | head -5",
            "whatever thing | something",
        ];

        for command in commands {
            assert!(is_shell_command(command), "expected shell: {command}");
        }
    }

    #[test]
    fn test_path_prefixes() {
        let commands = [
            "./script.sh",
            "/usr/bin/python",
            "/bin/ls",
            "~/bin/tool --flag",
            "/opt/homebrew/bin/brew",
            "./build.sh && ./run.sh",
        ];

        for command in commands {
            assert!(is_shell_command(command), "expected shell: {command}");
        }
    }

    #[test]
    fn test_natural_language() {
        let queries = [
            "show me all files in the current directory",
            "change to the home directory",
            "list all Python files",
            "create a new directory called projects",
            "count how many lines are in all Python files",
            "check the disk usage",
            "install the required packages",
            "list files",
            "print working directory",
            "system info",
            "download the latest version",
        ];

        for query in queries {
            assert!(!is_shell_command(query), "expected natural language: {query}");
        }
    }

    #[test]
    fn test_edge_cases() {
        assert!(!is_shell_command(""));
        assert!(!is_shell_command("   "));
        assert!(!is_shell_command("\n\t"));
        assert!(is_shell_command("ls"));
        assert!(is_shell_command("  ls -la -h --color=auto"));
        assert!(is_shell_command("python -c \"print('hello')\""));
        assert!(is_shell_command(
            "find . -type f -name '*.py' -exec grep -l 'import' {} \\;"
        ));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!is_shell_command("LS"));
        assert!(!is_shell_command("Git status"));
    }

    #[test]
    fn test_deterministic_and_fast() {
        let start = Instant::now();
        let first = is_shell_command("ls -la");
        assert_eq!(first, is_shell_command("ls -la"));
        assert_eq!(first, is_shell_command("ls -la"));
        assert!(first);
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
