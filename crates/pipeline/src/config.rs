//! Configuration for a Duet deployment.
//!
//! Settings come from a TOML file or from defaults plus environment
//! variables. API keys are best left in the environment
//! (`ANTHROPIC_API_KEY`, `OPENAI_API_KEY`); keys found in a config file are
//! accepted with a warning.

use std::path::Path;

use duet_common::{AttachmentPolicy, DuetError, Result};
use duet_llm::{LlmConfig, Provider, RetryConfig};
use duet_memory::MemoryConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::stage::{Participants, Stage};

const DEFAULT_DRAFTER_MODEL: &str = "claude-3-7-sonnet-20250219";
const DEFAULT_REVIEWER_MODEL: &str = "o3-mini";

/// A named participant and the endpoint it talks through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantConfig {
    /// Name the models use for each other, e.g. "Claude"
    pub name: String,

    #[serde(flatten)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuetConfig {
    #[serde(default = "default_drafter")]
    pub drafter: ParticipantConfig,

    #[serde(default = "default_reviewer")]
    pub reviewer: ParticipantConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub attachments: AttachmentPolicy,
}

fn default_drafter() -> ParticipantConfig {
    ParticipantConfig {
        name: "Claude".into(),
        llm: LlmConfig {
            provider: Provider::Anthropic,
            model: DEFAULT_DRAFTER_MODEL.into(),
            api_key: None,
            api_url: None,
            temperature: Some(0.7),
            max_tokens: Some(1500),
            retry: RetryConfig::default(),
        },
    }
}

fn default_reviewer() -> ParticipantConfig {
    ParticipantConfig {
        name: "ChatGPT".into(),
        llm: LlmConfig {
            provider: Provider::OpenAi,
            model: DEFAULT_REVIEWER_MODEL.into(),
            api_key: None,
            api_url: None,
            // reasoning models reject a temperature
            temperature: None,
            max_tokens: None,
            retry: RetryConfig::default(),
        },
    }
}

impl Default for DuetConfig {
    fn default() -> Self {
        Self {
            drafter: default_drafter(),
            reviewer: default_reviewer(),
            memory: MemoryConfig::default(),
            attachments: AttachmentPolicy::default(),
        }
    }
}

impl DuetConfig {
    /// Defaults with overrides from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `CLAUDE_MODEL`, `OPENAI_MODEL` and `DUET_MEMORY_CAPACITY` from
    /// the given lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("CLAUDE_MODEL").filter(|m| !m.is_empty()) {
            self.drafter.llm.model = model;
        }
        if let Some(model) = lookup("OPENAI_MODEL").filter(|m| !m.is_empty()) {
            self.reviewer.llm.model = model;
        }
        if let Some(raw) = lookup("DUET_MEMORY_CAPACITY") {
            match raw.parse::<usize>() {
                Ok(capacity) if capacity > 0 => self.memory.capacity = capacity,
                _ => warn!(value = %raw, "Ignoring invalid DUET_MEMORY_CAPACITY"),
            }
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        let config: Self = toml::from_str(&content)?;

        for participant in [&config.drafter, &config.reviewer] {
            if participant.llm.api_key.is_some() {
                warn!(
                    participant = %participant.name,
                    "API key found in config file '{}'. Prefer {} in the environment.",
                    path.display(),
                    participant.llm.provider.api_key_env()
                );
            }
        }

        Ok(config)
    }

    /// Load from `path` when given, otherwise start from defaults, then apply
    /// environment overrides either way.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration");
                Self::from_file(path)?
            }
            None => {
                info!("Using default configuration");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Check that both participants have credentials.
    pub fn validate(&self) -> Result<()> {
        for participant in [&self.drafter, &self.reviewer] {
            if participant.llm.resolve_api_key().is_none() {
                return Err(DuetError::Config(format!(
                    "Missing {} for {} ({}). Create a .env file or export the variable.",
                    participant.llm.provider.api_key_env(),
                    participant.name,
                    participant.llm.model
                )));
            }
        }
        Ok(())
    }

    pub fn build_participants(&self) -> Result<Participants> {
        Ok(Participants {
            drafter: Stage::from_config(&self.drafter)?,
            reviewer: Stage::from_config(&self.reviewer)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const TOML_CONFIG: &str = r#"
[drafter]
name = "Claude"
provider = "anthropic"
model = "claude-sonnet-4-20250514"
temperature = 0.7
max_tokens = 1500

[drafter.retry]
max_attempts = 4

[reviewer]
name = "GPT"
provider = "openai"
model = "gpt-4o"
api_url = "http://localhost:8081"

[memory]
capacity = 6

[attachments]
max_chars = 500
"#;

    #[test]
    fn deserialize_full_config() {
        let config: DuetConfig = toml::from_str(TOML_CONFIG).unwrap();

        assert_eq!(config.drafter.name, "Claude");
        assert_eq!(config.drafter.llm.provider, Provider::Anthropic);
        assert_eq!(config.drafter.llm.model, "claude-sonnet-4-20250514");
        assert_eq!(config.drafter.llm.max_tokens, Some(1500));
        assert_eq!(config.drafter.llm.retry.max_attempts, 4);

        assert_eq!(config.reviewer.name, "GPT");
        assert_eq!(config.reviewer.llm.provider, Provider::OpenAi);
        assert_eq!(config.reviewer.llm.api_url.as_deref(), Some("http://localhost:8081"));
        assert!(config.reviewer.llm.temperature.is_none());

        assert_eq!(config.memory.capacity, 6);
        assert_eq!(config.attachments.max_chars, 500);
        assert_eq!(config.attachments.max_bytes, 1024 * 1024);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config: DuetConfig = toml::from_str("").unwrap();
        assert_eq!(config.drafter.llm.model, "claude-3-7-sonnet-20250219");
        assert_eq!(config.drafter.llm.temperature, Some(0.7));
        assert_eq!(config.reviewer.llm.model, "o3-mini");
        assert_eq!(config.memory.capacity, 10);
    }

    #[test]
    fn overrides_replace_models_and_capacity() {
        let env: HashMap<&str, &str> = [
            ("CLAUDE_MODEL", "claude-3-5-haiku-latest"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("DUET_MEMORY_CAPACITY", "4"),
        ]
        .into_iter()
        .collect();

        let mut config = DuetConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.drafter.llm.model, "claude-3-5-haiku-latest");
        assert_eq!(config.reviewer.llm.model, "gpt-4o");
        assert_eq!(config.memory.capacity, 4);
    }

    #[test]
    fn invalid_capacity_override_is_ignored() {
        let mut config = DuetConfig::default();
        config.apply_overrides(|k| (k == "DUET_MEMORY_CAPACITY").then(|| "zero".to_string()));
        assert_eq!(config.memory.capacity, 10);
    }

    #[test]
    fn validate_accepts_explicit_keys() {
        let mut config = DuetConfig::default();
        config.drafter.llm.api_key = Some("sk-ant-test".into());
        config.reviewer.llm.api_key = Some("sk-test".into());
        assert!(config.validate().is_ok());

        let participants = config.build_participants().unwrap();
        assert_eq!(participants.drafter.label(), "Claude (Sonnet)");
        assert_eq!(participants.reviewer.label(), "ChatGPT (O3 Mini)");
    }

    #[test]
    fn validate_reports_missing_key() {
        if std::env::var("OPENAI_API_KEY").is_ok() {
            return;
        }
        let mut config = DuetConfig::default();
        config.drafter.llm.api_key = Some("sk-ant-test".into());

        let err = config.validate().unwrap_err();
        assert!(matches!(err, DuetError::Config(ref msg) if msg.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TOML_CONFIG.as_bytes()).unwrap();

        let config = DuetConfig::from_file(file.path()).unwrap();
        assert_eq!(config.reviewer.llm.model, "gpt-4o");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(DuetConfig::from_file("/nonexistent/duet.toml").is_err());
    }
}
