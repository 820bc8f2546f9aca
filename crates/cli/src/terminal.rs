//! Prints pipeline runs to a terminal and drives the interactive loop.

use std::io::Write;
use std::path::{Path, PathBuf};

use duet_common::{Attachment, AttachmentPolicy};
use duet_pipeline::{CollaborationPipeline, CollaborationRequest, Fragment};
use futures_util::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

const RULE: &str = "────────────────────────────────────────";

/// A pipeline plus the attachment policy applied to files from the command
/// line. The pipeline's memory lives as long as the session.
pub struct TerminalSession {
    pipeline: CollaborationPipeline,
    policy: AttachmentPolicy,
}

impl TerminalSession {
    pub fn new(pipeline: CollaborationPipeline, policy: AttachmentPolicy) -> Self {
        Self { pipeline, policy }
    }

    pub fn pipeline(&self) -> &CollaborationPipeline {
        &self.pipeline
    }

    /// Run one prompt, printing each fragment as soon as it arrives.
    ///
    /// A file that cannot be attached is reported in place of the run.
    pub async fn ask<W: Write>(
        &self,
        prompt: &str,
        file: Option<&Path>,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let mut request = CollaborationRequest::new(prompt);

        if let Some(path) = file {
            match Attachment::from_path(path, &self.policy).await {
                Ok(attachment) => request = request.with_attachment(attachment),
                Err(e) => {
                    let rejected = Fragment::Rejected {
                        message: format!("⚠️ {e}"),
                    };
                    writeln!(out, "{}", rejected.render())?;
                    return Ok(());
                }
            }
        }

        let mut fragments = self.pipeline.run(request);
        let mut printed = 0;

        while let Some(fragment) = fragments.next().await {
            match &fragment {
                Fragment::Progress { message } => writeln!(out, "{message}\n")?,
                Fragment::Rejected { message } => writeln!(out, "{message}")?,
                Fragment::Partial { sections } | Fragment::Final { sections } => {
                    // The final fragment repeats what the partial already showed.
                    for section in sections.iter().skip(printed) {
                        if printed > 0 {
                            writeln!(out, "{RULE}\n")?;
                        }
                        writeln!(out, "{}\n", section.render())?;
                        printed += 1;
                    }
                }
            }
            out.flush()?;
        }

        Ok(())
    }

    /// Read prompts line by line until `/quit` or end of input.
    ///
    /// `/reset` clears the conversation memory and `/attach PATH` attaches a
    /// file to the next prompt. `first_file` is attached to the first prompt.
    pub async fn chat<R, W>(
        &self,
        input: R,
        out: &mut W,
        first_file: Option<PathBuf>,
    ) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        let mut pending_file = first_file;

        let participants = self.pipeline.participants();
        writeln!(
            out,
            "✨ {} drafts, {} reviews. Commands: /reset, /attach PATH, /quit",
            participants.drafter.label(),
            participants.reviewer.label()
        )?;

        loop {
            write!(out, "> ")?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();

            match line {
                "" => continue,
                "/quit" | "/exit" => break,
                "/reset" => {
                    self.pipeline.memory().reset().await;
                    info!("Conversation memory cleared");
                    writeln!(out, "🧹 Conversation cleared.")?;
                }
                _ => {
                    if let Some(path) = line.strip_prefix("/attach ") {
                        let path = PathBuf::from(path.trim());
                        writeln!(
                            out,
                            "📎 {} will be attached to your next message.",
                            path.display()
                        )?;
                        pending_file = Some(path);
                        continue;
                    }

                    debug!(chars = line.len(), "Prompt received");
                    let file = pending_file.take();
                    self.ask(line, file.as_deref(), out).await?;
                }
            }
        }

        Ok(())
    }
}
