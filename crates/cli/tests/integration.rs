use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use duet_cli::TerminalSession;
use duet_common::{AttachmentPolicy, Result};
use duet_llm::{LlmClient, LlmRequest, LlmResponse, RetryConfig, RetryingClient};
use duet_memory::MemoryBuffer;
use duet_pipeline::{CollaborationPipeline, Participants, Stage};

/// Replies with the model name and the number of the call.
struct CountingBackend {
    model: &'static str,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LlmClient for CountingBackend {
    async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(LlmResponse {
            content: format!("{} reply {n}", self.model),
            model: self.model.to_string(),
            usage: None,
            finish_reason: None,
        })
    }

    fn model_name(&self) -> &str {
        self.model
    }
}

fn stage(name: &str, display: &str, model: &'static str) -> (Stage, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend: Box<dyn LlmClient> = Box::new(CountingBackend {
        model,
        calls: calls.clone(),
    });
    let client = RetryingClient::new(backend, RetryConfig::default());
    (Stage::new(name, display, client), calls)
}

fn session(policy: AttachmentPolicy) -> (TerminalSession, Arc<MemoryBuffer>, Arc<AtomicUsize>) {
    let (drafter, drafter_calls) = stage("Claude", "Sonnet", "claude");
    let (reviewer, _) = stage("ChatGPT", "O3 Mini", "gpt");
    let memory = Arc::new(MemoryBuffer::new(10));
    let pipeline = CollaborationPipeline::new(Participants { drafter, reviewer }, memory.clone());
    (TerminalSession::new(pipeline, policy), memory, drafter_calls)
}

#[tokio::test]
async fn ask_prints_each_section_once() {
    let (session, memory, _) = session(AttachmentPolicy::default());
    let mut out = Vec::new();

    session.ask("draft a function", None, &mut out).await.unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("⏳ Starting collaboration between Claude and ChatGPT..."));
    assert_eq!(text.matches("### Claude (Sonnet)").count(), 1);
    assert_eq!(text.matches("### ChatGPT (O3 Mini)").count(), 1);
    assert!(text.find("claude reply 1").unwrap() < text.find("gpt reply 1").unwrap());
    assert_eq!(memory.len().await, 3);
}

#[tokio::test]
async fn ask_with_file_attaches_its_text() {
    let (session, memory, _) = session(AttachmentPolicy::default());
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"def prime(n): ...").unwrap();

    let mut out = Vec::new();
    session.ask("port this", Some(file.path()), &mut out).await.unwrap();

    let user_turn = &memory.entries().await[0].content;
    assert!(user_turn.starts_with("port this"));
    assert!(user_turn.contains("def prime(n): ..."));
}

#[tokio::test]
async fn oversized_file_is_reported_instead_of_run() {
    let policy = AttachmentPolicy {
        max_bytes: 8,
        ..AttachmentPolicy::default()
    };
    let (session, memory, drafter_calls) = session(policy);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"far more than eight bytes").unwrap();

    let mut out = Vec::new();
    session.ask("summarise", Some(file.path()), &mut out).await.unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("⚠️"));
    assert!(!text.contains("Starting collaboration"));
    assert_eq!(drafter_calls.load(Ordering::SeqCst), 0);
    assert!(memory.is_empty().await);
}

#[tokio::test]
async fn chat_keeps_memory_until_reset() {
    let (session, memory, drafter_calls) = session(AttachmentPolicy::default());
    let input = b"first question\n\nsecond question\n/reset\n/quit\nnever asked\n";
    let mut out = Vec::new();

    session.chat(&input[..], &mut out, None).await.unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("claude reply 2"));
    assert!(text.contains("Conversation cleared."));
    assert!(!text.contains("claude reply 3"));
    assert_eq!(drafter_calls.load(Ordering::SeqCst), 2);
    assert!(memory.is_empty().await);
}

#[tokio::test]
async fn chat_attaches_first_file_only_once() {
    let (session, memory, _) = session(AttachmentPolicy::default());
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"attached body").unwrap();

    let input = b"look at this\nand again\n";
    let mut out = Vec::new();
    session
        .chat(&input[..], &mut out, Some(file.path().to_path_buf()))
        .await
        .unwrap();

    let entries = memory.entries().await;
    assert!(entries[0].content.contains("attached body"));
    assert_eq!(entries[3].content, "and again");
}

#[tokio::test]
async fn chat_ends_at_end_of_input() {
    let (session, _, drafter_calls) = session(AttachmentPolicy::default());
    let mut out = Vec::new();

    session.chat(&b""[..], &mut out, None).await.unwrap();

    assert_eq!(drafter_calls.load(Ordering::SeqCst), 0);
    assert!(String::from_utf8(out).unwrap().contains("Claude (Sonnet) drafts"));
}
