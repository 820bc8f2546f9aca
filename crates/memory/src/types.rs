//! Memory types and configuration.

use serde::{Deserialize, Serialize};

/// Who produced a remembered turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    /// The drafting model.
    StageA,
    /// The reviewing model.
    StageB,
}

impl Speaker {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::StageA => "Drafter",
            Self::StageB => "Reviewer",
        }
    }
}

/// A remembered turn. Entries are never modified once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub role: Speaker,
    pub content: String,
    /// Creation timestamp (Unix millis)
    pub timestamp: u64,
}

impl MemoryEntry {
    pub fn new(role: Speaker, content: impl Into<String>) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }
}

/// Configuration for session memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum entries kept per session
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_is_stamped_on_creation() {
        let entry = MemoryEntry::new(Speaker::User, "hello");
        assert_eq!(entry.role, Speaker::User);
        assert_eq!(entry.content, "hello");
        assert!(entry.timestamp > 0);
    }

    #[test]
    fn speaker_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Speaker::StageA).unwrap(), "\"stage_a\"");
        assert_eq!(serde_json::to_string(&Speaker::StageB).unwrap(), "\"stage_b\"");
    }

    #[test]
    fn config_defaults_to_ten_entries() {
        assert_eq!(MemoryConfig::default().capacity, 10);
        let config: MemoryConfig = toml::from_str("").unwrap();
        assert_eq!(config.capacity, 10);
    }
}
