//! Append-only run log.
//!
//! Every entry is timestamped and kept in memory for the whole run; the
//! accumulated sequence is written out once at the end (including on fatal
//! abort paths). Entries are never mutated or removed once appended.

use std::fs;
use std::path::Path;

use chrono::Utc;

/// In-memory run log with optional console echo
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Vec<String>,
    echo: bool,
}

impl RunLog {
    /// Create a log; `echo` controls whether entries also go to stdout
    pub fn new(echo: bool) -> Self {
        Self {
            entries: Vec::new(),
            echo,
        }
    }

    /// Append a timestamped entry
    pub fn append(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        self.entries
            .push(format!("[{}] {}", Utc::now().to_rfc3339(), message));
        if self.echo {
            println!("{}", message);
        }
    }

    /// All entries appended so far
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Write the accumulated log, newline-joined, overwriting prior content
    pub fn persist(&self, path: &Path) -> std::io::Result<()> {
        fs::write(path, self.entries.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_timestamps_entries() {
        let mut log = RunLog::new(false);
        log.append("first");
        log.append("second");

        assert_eq!(log.entries().len(), 2);
        assert!(log.entries()[0].starts_with('['));
        assert!(log.entries()[0].ends_with("first"));
        assert!(log.entries()[1].ends_with("second"));
    }

    #[test]
    fn test_persist_joins_with_newlines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.log");

        let mut log = RunLog::new(false);
        log.append("alpha");
        log.append("beta");
        log.persist(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("alpha"));
        assert!(lines[1].ends_with("beta"));
    }

    #[test]
    fn test_persist_overwrites_previous_run() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.log");
        fs::write(&path, "stale content from last run").unwrap();

        let mut log = RunLog::new(false);
        log.append("fresh");
        log.persist(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert!(content.ends_with("fresh"));
    }
}
