//! Fixed-capacity conversation buffer.

use crate::types::{MemoryConfig, MemoryEntry, Speaker};
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::debug;

const HEADER: &str = "--- Previous conversation ---";
const FOOTER: &str = "--- End of previous conversation ---";

/// Ordered log of the most recent turns in a session.
///
/// Holds at most `capacity` entries; appending past that evicts the oldest
/// entry regardless of who produced it. All operations go through one lock,
/// so a buffer can be shared between a session and an in-flight pipeline run.
#[derive(Debug)]
pub struct MemoryBuffer {
    capacity: usize,
    entries: RwLock<VecDeque<MemoryEntry>>,
}

impl MemoryBuffer {
    /// Create an empty buffer. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(config.capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a turn at the tail, evicting from the head while over capacity.
    pub async fn append(&self, role: Speaker, content: impl Into<String>) {
        let entry = MemoryEntry::new(role, content);
        let mut entries = self.entries.write().await;
        entries.push_back(entry);

        while entries.len() > self.capacity {
            if let Some(evicted) = entries.pop_front() {
                debug!(
                    role = ?evicted.role,
                    timestamp = evicted.timestamp,
                    "Evicted from conversation memory"
                );
            }
        }
    }

    /// Render the buffer as a delimited block for a prompt, or an empty
    /// string when nothing has been recorded.
    pub async fn format_for_prompt(&self) -> String {
        let entries = self.entries.read().await;
        if entries.is_empty() {
            return String::new();
        }

        let mut out = String::from(HEADER);
        for entry in entries.iter() {
            out.push_str("\n\n");
            out.push_str(entry.role.label());
            out.push_str(": ");
            out.push_str(&entry.content);
        }
        out.push_str("\n\n");
        out.push_str(FOOTER);
        out
    }

    /// Drop every entry.
    pub async fn reset(&self) {
        let mut entries = self.entries.write().await;
        debug!(cleared = entries.len(), "Resetting conversation memory");
        entries.clear();
    }

    /// Snapshot of the current entries, oldest first.
    pub async fn entries(&self) -> Vec<MemoryEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryBuffer {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}
