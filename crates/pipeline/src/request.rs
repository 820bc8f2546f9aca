//! The input to one collaboration run.

use duet_common::Attachment;

/// A user prompt with its optional attachment and conversation context.
///
/// Built once with the `with_*` methods and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaborationRequest {
    prompt: String,
    attachment: Option<Attachment>,
    history: Option<String>,
}

impl CollaborationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attachment: None,
            history: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Use this context instead of the session memory when drafting.
    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        let history = history.into();
        self.history = (!history.is_empty()).then_some(history);
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn history(&self) -> Option<&str> {
        self.history.as_deref()
    }

    /// The user's turn as recorded in memory: the prompt followed by the
    /// (already truncated) attachment, without any history.
    pub fn user_turn(&self) -> String {
        match &self.attachment {
            Some(attachment) => format!("{}\n\n{}", self.prompt, attachment.as_prompt_block()),
            None => self.prompt.clone(),
        }
    }

    /// The full user turn sent to the drafting model.
    pub fn drafter_payload(&self) -> String {
        match &self.history {
            Some(history) => format!("{history}\n\n{}", self.user_turn()),
            None => self.user_turn(),
        }
    }
}
