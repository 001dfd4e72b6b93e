//! Host-local audit log
//!
//! The runner executes unattended at boot; the only interface an operator has
//! afterwards is this log. One JSON line per finished step, plus free-form
//! notes at run start and end. If the log file cannot be opened (unwritable
//! path, read-only filesystem) the runner degrades to tracing-only output
//! rather than aborting the bootstrap.

use crate::step::StepRecord;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// Append-only writer for the per-step audit trail
pub struct HostLog {
    path: PathBuf,
    file: Option<Mutex<File>>,
}

impl HostLog {
    /// Open the audit log at `path`, creating it if absent
    pub fn open(path: &Path) -> Self {
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => Some(Mutex::new(f)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Audit log unavailable, logging to tracing only");
                None
            }
        };
        Self {
            path: path.to_path_buf(),
            file,
        }
    }

    /// Path this log writes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one step record as a JSON line
    pub fn record(&self, record: &StepRecord) {
        info!(
            step = record.step,
            status = %record.status,
            detail = record.detail.as_deref().unwrap_or(""),
            duration_secs = record.duration_secs,
            "Step finished"
        );
        match serde_json::to_string(record) {
            Ok(line) => self.append(&line),
            Err(e) => warn!(error = %e, "Failed to serialize step record"),
        }
    }

    /// Append a free-form note line
    pub fn note(&self, message: &str) {
        info!("{}", message);
        let line = format!(
            "{} {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            message
        );
        self.append(&line);
    }

    fn append(&self, line: &str) {
        if let Some(file) = &self.file {
            let mut guard = match file.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(e) = writeln!(guard, "{}", line) {
                warn!(path = %self.path.display(), error = %e, "Failed to append audit line");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepStatus;

    #[test]
    fn test_records_are_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bootstrap.log");
        let log = HostLog::open(&path);

        log.note("bootstrap starting");
        log.record(&StepRecord {
            finished_at: chrono::Utc::now(),
            step: "cloud_cli",
            status: StepStatus::SkippedAlreadySatisfied,
            detail: Some("aws already on PATH".to_string()),
            duration_secs: 0.0,
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("bootstrap starting"));
        let parsed: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed["step"], "cloud_cli");
        assert_eq!(parsed["status"], "skipped_already_satisfied");
    }

    #[test]
    fn test_unwritable_path_degrades_to_tracing() {
        let log = HostLog::open(Path::new("/nonexistent-dir-9876/bootstrap.log"));
        // Must not panic
        log.note("still alive");
    }

    #[test]
    fn test_appends_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bootstrap.log");

        HostLog::open(&path).note("first run");
        HostLog::open(&path).note("second run");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
