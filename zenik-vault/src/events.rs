//! Event log sink.
//!
//! Security-relevant vault events (unlock, reveal, copy, lock) are reported as
//! short plain strings. They never contain item secrets.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;
use tracing::{info, warn};

/// Timestamp format used for log lines.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Receives descriptive event strings from the vault session.
pub trait EventSink: Send + Sync {
    fn record(&self, message: &str);
}

/// Format one log line: `[YYYY-MM-DD HH:MM:SS] message`.
pub fn format_event(message: &str) -> String {
    format!("[{}] {}", Local::now().format(LOG_TIMESTAMP_FORMAT), message)
}

/// Appends events to a plain text file.
///
/// Write failures are reported through `tracing` and otherwise ignored, so a
/// read-only log location never blocks a vault operation.
pub struct FileEventLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl EventSink for FileEventLog {
    fn record(&self, message: &str) {
        info!("{}", message);
        if let Err(e) = self.append(&format_event(message)) {
            warn!("Failed to write event log {:?}: {}", self.path, e);
        }
    }
}

/// Keeps events in memory, mostly for tests and embedding.
#[derive(Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<String>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn contains(&self, message: &str) -> bool {
        self.events.lock().iter().any(|e| e == message)
    }
}

impl EventSink for MemoryEventLog {
    fn record(&self, message: &str) {
        info!("{}", message);
        self.events.lock().push(message.to_string());
    }
}
