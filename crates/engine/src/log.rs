use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use tracing::{info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Human-readable record of one import run, flushed to an append-only file
/// when the run ends. Every line is mirrored to `tracing`.
#[derive(Debug, Default)]
pub struct ImportLog {
    lines: Vec<String>,
}

impl ImportLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.push(message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.push(message);
    }

    fn push(&mut self, message: String) {
        let stamp = Local::now().format(TIMESTAMP_FORMAT);
        self.lines.push(format!("{stamp} {message}"));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Append all lines to `path`, creating it if needed.
    pub fn append_to(&self, path: &Path) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        for line in &self.lines {
            writeln!(file, "{line}")?;
        }
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_timestamped() {
        let mut log = ImportLog::new();
        log.info("3 props deserialised");
        let line = &log.lines()[0];
        assert!(line.ends_with(" 3 props deserialised"));
        // "YYYY-MM-DD HH:MM:SS " prefix
        assert_eq!(&line[4..5], "-");
        assert_eq!(&line[13..14], ":");
    }

    #[test]
    fn append_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let mut first = ImportLog::new();
        first.info("first run");
        first.append_to(&path).unwrap();

        let mut second = ImportLog::new();
        second.warn("second run");
        second.append_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first run"));
        assert!(lines[1].ends_with("second run"));
    }
}
