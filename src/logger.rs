use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::types::{Event, Snapshot};

pub enum PollLogMode {
    Full,
    Changes,
}

pub(crate) struct PollLogger {
    mode: PollLogMode,
    file: File,
}

impl PollLogger {
    pub fn new(mode: PollLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self { mode, file })
    }

    pub fn log_fetch(&mut self, page: &str, status: &str, bytes: usize) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "fetch",
            "page": page,
            "status": status,
            "bytes": bytes,
        });
        self.write_line(&entry);
    }

    pub fn log_write(&mut self, prop: &str, value: &str, status: &str) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "write",
            "prop": prop,
            "value": value,
            "status": status,
        });
        self.write_line(&entry);
    }

    pub fn log_cycle(&mut self, snapshot: &Snapshot, events: &[Event]) {
        let entry = match self.mode {
            PollLogMode::Full => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "cycle",
                "entities": snapshot.len(),
                "snapshot": snapshot,
            }),
            PollLogMode::Changes => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "cycle",
                "entities": snapshot.len(),
                "changes": events,
            }),
        };
        self.write_line(&entry);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}
