//! Query log sink.
//!
//! One line is appended per question processed, recording the original
//! query name and the outcome category. The shared file handle is the
//! only shared-mutable resource in the server, so writes go through a
//! mutex to keep concurrent tasks from interleaving lines.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::warn;

use crate::errors::DnsError;

/// Append-only sink for per-question log events.
///
/// With logging disabled the sink is inert and `record` is a no-op.
#[derive(Debug, Clone, Default)]
pub struct QueryLog {
    sink: Option<Arc<Mutex<File>>>,
}

impl QueryLog {
    /// A disabled sink that drops every event.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Open the query log file for appending, creating it if needed.
    ///
    /// # Arguments
    /// * `path` - Path to the query log file.
    ///
    /// # Returns
    /// A `Result` containing the sink or an error opening the file.
    pub fn open(path: &str) -> Result<Self, DnsError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| DnsError::Config(format!("failed to open query log file {path}: {e}")))?;
        Ok(Self {
            sink: Some(Arc::new(Mutex::new(file))),
        })
    }

    /// Append one event line: the queried name and the outcome category.
    ///
    /// Write failures are reported on the diagnostic log and otherwise
    /// ignored; query handling never fails because of the query log.
    pub fn record(&self, query_name: &str, outcome: &str) {
        let Some(sink) = &self.sink else {
            return;
        };

        let line = format!(
            "{} Query: {}, Response: {}\n",
            Utc::now().to_rfc3339(),
            query_name,
            outcome
        );
        match sink.lock() {
            Ok(mut file) => {
                if let Err(e) = file.write_all(line.as_bytes()) {
                    warn!("Failed to write query log line: {}", e);
                }
            }
            Err(e) => warn!("Query log mutex poisoned: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn records_one_line_per_event() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queries.log");
        let log = QueryLog::open(path.to_str().unwrap()).unwrap();

        log.record("example.com.", "Authoritative response");
        log.record("nosuch.example.com.", "NXDOMAIN response");

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Query: example.com., Response: Authoritative response"));
        assert!(lines[1].contains("Query: nosuch.example.com., Response: NXDOMAIN response"));
    }

    #[test]
    fn disabled_sink_is_a_no_op() {
        let log = QueryLog::disabled();
        log.record("example.com.", "Authoritative response");
    }

    #[test]
    fn open_appends_to_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queries.log");
        fs::write(&path, "existing line\n").unwrap();

        let log = QueryLog::open(path.to_str().unwrap()).unwrap();
        log.record("example.com.", "Forwarded response");

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("existing line\n"));
        assert_eq!(contents.lines().count(), 2);
    }
}
