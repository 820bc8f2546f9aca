//! A participant in the collaboration: a named model behind the retry wrapper.

use std::sync::Arc;

use duet_common::Result;
use duet_llm::{LlmClient, LlmRequest, RetryingClient, StageResult, build_llm_client};

use crate::config::ParticipantConfig;
use crate::labels::display_name;

/// One stage's endpoint: who is speaking, which client to call and the
/// sampling parameters to call it with. Cheap to clone.
#[derive(Clone)]
pub struct Stage {
    name: String,
    label: String,
    client: Arc<RetryingClient<Box<dyn LlmClient>>>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl Stage {
    /// `name` is how the models address each other ("Claude"), `display` is
    /// the short model name shown in transcript headers ("Sonnet").
    pub fn new(
        name: impl Into<String>,
        display: impl AsRef<str>,
        client: RetryingClient<Box<dyn LlmClient>>,
    ) -> Self {
        let name = name.into();
        let label = format!("{} ({})", name, display.as_ref());
        Self {
            client: Arc::new(client.with_label(name.clone())),
            name,
            label,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn from_config(config: &ParticipantConfig) -> Result<Self> {
        let client = build_llm_client(&config.llm)?;
        Ok(Self::new(
            config.name.clone(),
            display_name(config.llm.provider, &config.llm.model),
            client,
        )
        .with_sampling(config.llm.temperature, config.llm.max_tokens))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn model(&self) -> &str {
        self.client.model_name()
    }

    /// Send one system prompt and user turn through the retry wrapper.
    pub async fn invoke(&self, system_prompt: String, user_turn: String) -> StageResult {
        let request = LlmRequest::single_turn(system_prompt, user_turn)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        self.client.invoke(request).await
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("model", &self.model())
            .finish()
    }
}

/// The drafting and reviewing stages of a pipeline.
#[derive(Debug, Clone)]
pub struct Participants {
    pub drafter: Stage,
    pub reviewer: Stage,
}
