mod file_ops;

use std::path::PathBuf;

use self::file_ops::FileOps;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only record of every line the user entered.
///
/// Lines are written verbatim, one per record, as soon as they are read.
/// Blank lines are not recorded.
pub struct HistorySink {
    file_ops: FileOps,
}

impl HistorySink {
    pub fn new(history_file: PathBuf) -> Self {
        Self {
            file_ops: FileOps::new(history_file),
        }
    }

    pub fn append(&self, line: &str) -> Result<(), HistoryError> {
        if line.trim().is_empty() {
            return Ok(());
        }
        self.file_ops.append_entry(line)
    }

    /// The most recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<String>, HistoryError> {
        let mut entries = self.file_ops.load_entries()?;
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_append_creates_parent_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ashell").join("history");
        let sink = HistorySink::new(path.clone());
        assert!(!path.parent().unwrap().exists());

        sink.append("ls -la").unwrap();
        sink.append("   ").unwrap();
        sink.append("echo \"hi there\" | wc -c").unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "ls -la\necho \"hi there\" | wc -c\n"
        );
    }

    #[test]
    fn test_recent_keeps_order_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        fs::write(&path, "one\n\ntwo\nthree\n").unwrap();

        let sink = HistorySink::new(path);
        assert_eq!(sink.recent(10).unwrap(), vec!["one", "two", "three"]);
        assert_eq!(sink.recent(2).unwrap(), vec!["two", "three"]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = HistorySink::new(dir.path().join("nope"));
        assert!(sink.recent(5).unwrap().is_empty());
    }

    #[test]
    fn test_unwritable_location_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let sink = HistorySink::new(blocker.join("history"));
        let err = sink.append("ls").unwrap_err();
        assert!(err.to_string().contains("history file"));
    }
}
