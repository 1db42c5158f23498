//! Conversation audit log
//!
//! Every turn appended to an agent's conversation is mirrored to an
//! `AuditSink`, one stream per agent name. Entries are the JSON-serialized
//! turn with its content truncated, followed by a separator line. The audit
//! copy is for people reading logs; nothing in the engine reads it back.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::llm::Message;

/// Separator written after each entry
pub const ENTRY_SEPARATOR: &str = "--------------------";

/// Default number of content characters kept per entry
pub const DEFAULT_TRUNCATE_CHARS: usize = 1000;

/// Destination for audit entries
pub trait AuditSink: Send + Sync {
    /// Record one appended turn for `agent`
    fn record(&self, agent: &str, message: &Message);
}

/// Truncate `text` to `limit` characters, appending `...` when cut
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Render one audit entry (without the separator)
pub fn render_entry(message: &Message, limit: usize) -> String {
    let mut value = match serde_json::to_value(message) {
        Ok(v) => v,
        Err(e) => return format!("{{\"error\": \"unserializable turn: {}\"}}", e),
    };
    value["content"] = serde_json::Value::String(truncate_chars(&message.text(), limit));
    value.to_string()
}

/// Writes `<dir>/<agent>.txt`, appending one entry per turn
#[derive(Debug)]
pub struct FileAuditSink {
    dir: PathBuf,
    limit: usize,
}

impl FileAuditSink {
    pub fn new(dir: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            dir: dir.into(),
            limit,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append(&self, agent: &str, entry: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(format!("{}.txt", agent)))?;
        writeln!(file, "{}", entry)?;
        writeln!(file, "{}", ENTRY_SEPARATOR)?;
        Ok(())
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, agent: &str, message: &Message) {
        let entry = render_entry(message, self.limit);
        if let Err(e) = self.append(agent, &entry) {
            tracing::warn!(agent, "Failed to write audit entry: {}", e);
        }
    }
}

/// Keeps entries in memory, keyed by agent name
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    limit: usize,
    streams: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryAuditSink {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Entries recorded for `agent`, in order
    pub fn entries(&self, agent: &str) -> Vec<String> {
        self.streams
            .lock()
            .map(|streams| streams.get(agent).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Names of every agent that recorded at least one entry
    pub fn agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .streams
            .lock()
            .map(|streams| streams.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, agent: &str, message: &Message) {
        let entry = render_entry(message, self.limit);
        if let Ok(mut streams) = self.streams.lock() {
            streams.entry(agent.to_string()).or_default().push(entry);
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _agent: &str, _message: &Message) {}
}
