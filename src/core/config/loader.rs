use std::{fs, io::ErrorKind, path::Path};

use super::ConfigError;

/// Reads the startup file: every non-blank line that is not a `#` comment is
/// a command to run in the new session, in order.
pub struct ConfigLoader<'a> {
    rc_path: &'a Path,
}

impl<'a> ConfigLoader<'a> {
    pub fn new(rc_path: &'a Path) -> Self {
        Self { rc_path }
    }

    /// A missing file is not an error; an unreadable one is.
    pub fn load_lines(&self) -> Result<Vec<String>, ConfigError> {
        let content = match fs::read_to_string(self.rc_path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.rc_path.to_path_buf(),
                    source,
                })
            }
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_lines_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join("ashellrc");
        fs::write(
            &rc,
            r#"
            # session defaults
            export EDITOR="vim"

            cd /tmp
            "#,
        )
        .unwrap();

        let lines = ConfigLoader::new(&rc).load_lines().unwrap();
        assert_eq!(lines, vec!["export EDITOR=\"vim\"", "cd /tmp"]);
    }

    #[test]
    fn test_missing_rc_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join("absent");
        assert!(ConfigLoader::new(&rc).load_lines().unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_rc_is_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file.
        let result = ConfigLoader::new(dir.path()).load_lines();
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
