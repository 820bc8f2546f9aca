//! Text attachments supplied alongside a prompt.
//!
//! Uploads are validated before any model is called: oversized or binary
//! files are rejected, and long text is cut down to a character budget with a
//! visible marker so the models can tell the content was shortened.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DuetError, Result};

/// Size limits applied to attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentPolicy {
    /// Maximum raw upload size in bytes. Larger files are rejected.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum characters forwarded to the models. Longer text is truncated.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_max_bytes() -> usize {
    1024 * 1024
}

fn default_max_chars() -> usize {
    20_000
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            max_chars: default_max_chars(),
        }
    }
}

/// A decoded, possibly truncated, text attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub content: String,
    pub truncated: bool,
}

impl Attachment {
    /// Decode raw upload bytes under the given policy.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: &[u8],
        policy: &AttachmentPolicy,
    ) -> Result<Self> {
        let name = name.into();

        if bytes.len() > policy.max_bytes {
            return Err(DuetError::InputTooLarge {
                size: bytes.len(),
                limit: policy.max_bytes,
            });
        }

        let text =
            std::str::from_utf8(bytes).map_err(|_| DuetError::InputUndecodable(name.clone()))?;

        // Valid UTF-8 can still be binary; NUL never shows up in text files.
        if text.contains('\0') {
            return Err(DuetError::InputUndecodable(name));
        }

        let total_chars = text.chars().count();
        let (content, truncated) = if total_chars > policy.max_chars {
            let cut = text
                .char_indices()
                .nth(policy.max_chars)
                .map(|(idx, _)| idx)
                .unwrap_or(text.len());
            let omitted = total_chars - policy.max_chars;
            (
                format!("{}\n\n[... truncated {omitted} characters ...]", &text[..cut]),
                true,
            )
        } else {
            (text.to_string(), false)
        };

        debug!(
            attachment = %name,
            bytes = bytes.len(),
            chars = total_chars,
            truncated,
            "Decoded attachment"
        );

        Ok(Self {
            name,
            content,
            truncated,
        })
    }

    /// Read and decode a file from disk.
    ///
    /// The file size is checked from metadata before reading so oversized
    /// files are never loaded into memory.
    pub async fn from_path(path: impl AsRef<Path>, policy: &AttachmentPolicy) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let size = tokio::fs::metadata(path).await?.len() as usize;
        if size > policy.max_bytes {
            return Err(DuetError::InputTooLarge {
                size,
                limit: policy.max_bytes,
            });
        }

        let bytes = tokio::fs::read(path).await?;
        Self::from_bytes(name, &bytes, policy)
    }

    /// Render the attachment as a block that can be placed in a prompt.
    pub fn as_prompt_block(&self) -> String {
        format!(
            "--- Attached file: {} ---\n{}\n--- End of attached file ---",
            self.name, self.content
        )
    }
}
