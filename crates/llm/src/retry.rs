//! Bounded retry with exponential backoff around a model backend.
//!
//! Interactive callers use [`RetryingClient::invoke`], which never fails: when
//! retries run out, or the backend rejects the credentials, the caller gets a
//! [`StageResult::Degraded`] carrying a message fit for display. Callers that
//! want the underlying fault use the [`LlmClient`] impl instead.

use std::time::Duration;

use async_trait::async_trait;
use duet_common::{DuetError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{LlmClient, LlmRequest, LlmResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 2_000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the failed attempt with the given zero-based index.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let millis = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis((millis as u64).min(self.max_delay_ms))
    }
}

/// Outcome of one stage call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum StageResult {
    Success(String),
    /// A displayable apology produced in place of model output.
    Degraded(String),
}

impl StageResult {
    pub fn text(&self) -> &str {
        match self {
            Self::Success(text) | Self::Degraded(text) => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

pub struct RetryingClient<T: LlmClient> {
    inner: T,
    config: RetryConfig,
    label: String,
}

impl<T: LlmClient> RetryingClient<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        let label = inner.model_name().to_string();
        Self {
            inner,
            config,
            label,
        }
    }

    /// Name used for the backend in degraded messages, e.g. "Claude".
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Call the backend, retrying retryable failures, and degrade instead of
    /// failing.
    pub async fn invoke(&self, request: LlmRequest) -> StageResult {
        match self.call_with_retries(&request).await {
            Ok(response) => StageResult::Success(response.content),
            Err(e) => {
                warn!(
                    backend = %self.label,
                    model = %self.inner.model_name(),
                    error = %e,
                    "Backend call degraded"
                );
                StageResult::Degraded(self.degraded_message(&e))
            }
        }
    }

    fn degraded_message(&self, error: &DuetError) -> String {
        match error {
            DuetError::RateLimited(_) => format!(
                "⚠️ Error: {} API rate limit exceeded. Please try again later.",
                self.label
            ),
            DuetError::Unauthorized(_) => format!(
                "⚠️ Error: {} API authentication failed. Please check your API key.",
                self.label
            ),
            other => format!("⚠️ Error with {} API: {other}", self.label),
        }
    }

    async fn call_with_retries(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            debug!(backend = %self.label, attempt = attempt + 1, "Calling backend");

            let error = match self.inner.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !error.is_retryable() || attempt + 1 >= max_attempts {
                return Err(error);
            }

            let delay = self.config.delay_for(attempt);
            warn!(
                backend = %self.label,
                attempt = attempt + 1,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying backend call"
            );

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl<T: LlmClient> LlmClient for RetryingClient<T> {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        self.call_with_retries(&request).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
