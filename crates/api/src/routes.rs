//! HTTP route handlers for the API.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use duet_common::Attachment;
use duet_memory::MemoryEntry;
use duet_pipeline::{CollaborationPipeline, CollaborationRequest, Fragment, FragmentStream};
use futures_util::StreamExt;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::AppState;
use crate::session::SessionRegistry;

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub drafter: String,
    pub reviewer: String,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        drafter: state.participants.drafter.label().to_string(),
        reviewer: state.participants.reviewer.label().to_string(),
    })
}

/// The chat page.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// A file uploaded alongside a message.
#[derive(Debug, Deserialize)]
pub struct AttachmentUpload {
    pub name: String,
    pub data_base64: String,
}

/// Message request body, also used for WebSocket text frames.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    /// Omit to start a new session
    #[serde(default)]
    pub session_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub attachment: Option<AttachmentUpload>,
}

/// Message response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub session_id: String,
    pub fragments: Vec<Fragment>,
    /// Markdown of the final fragment
    pub transcript: String,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub code: &'static str,
}

impl ErrorResponse {
    fn bad_request(error: impl Into<String>, code: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            code,
        }
    }

    fn not_found(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: error.into(),
            code: "SESSION_NOT_FOUND",
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// A validated message, ready to produce fragments.
enum Turn {
    Run(CollaborationPipeline, CollaborationRequest),
    /// The attachment was refused; no model is called.
    Rejected(Fragment),
}

impl Turn {
    fn into_stream(self) -> FragmentStream {
        match self {
            Self::Run(pipeline, request) => pipeline.run(request),
            Self::Rejected(fragment) => stream::iter([fragment]).boxed(),
        }
    }
}

fn prepare_turn(
    state: &AppState,
    request: MessageRequest,
) -> Result<(String, Turn), ErrorResponse> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(ErrorResponse::bad_request(
            "Message content is empty",
            "EMPTY_MESSAGE",
        ));
    }

    let session_id = request
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(SessionRegistry::new_id);

    info!(
        session_id = %session_id,
        content_preview = %content.chars().take(50).collect::<String>(),
        has_attachment = request.attachment.is_some(),
        "Received message"
    );

    let mut collaboration = CollaborationRequest::new(content);

    if let Some(upload) = request.attachment {
        let bytes = BASE64.decode(upload.data_base64.as_bytes()).map_err(|e| {
            ErrorResponse::bad_request(
                format!("Attachment '{}' is not valid base64: {}", upload.name, e),
                "INVALID_ATTACHMENT",
            )
        })?;

        match Attachment::from_bytes(upload.name, &bytes, &state.attachments) {
            Ok(attachment) => collaboration = collaboration.with_attachment(attachment),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Attachment refused");
                let rejected = Fragment::Rejected {
                    message: format!("⚠️ {e}"),
                };
                return Ok((session_id, Turn::Rejected(rejected)));
            }
        }
    }

    let pipeline = state.pipeline_for(&session_id);
    Ok((session_id, Turn::Run(pipeline, collaboration)))
}

/// Run a message through the pipeline and return every fragment.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ErrorResponse> {
    let (session_id, turn) = prepare_turn(&state, request)?;

    let fragments: Vec<Fragment> = turn.into_stream().collect().await;
    let transcript = fragments.last().map(Fragment::render).unwrap_or_default();

    Ok(Json(MessageResponse {
        session_id,
        fragments,
        transcript,
    }))
}

/// Session memory response.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub capacity: usize,
    pub entries: Vec<MemoryEntry>,
}

/// Get the remembered turns of a session.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ErrorResponse> {
    debug!(session_id = %session_id, "Getting session");

    let memory = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| ErrorResponse::not_found(format!("Unknown session '{session_id}'")))?;

    Ok(Json(SessionResponse {
        session_id,
        capacity: memory.capacity(),
        entries: memory.entries().await,
    }))
}

/// Forget a session and clear its memory. Unknown sessions are already gone.
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> StatusCode {
    if let Some(memory) = state.sessions.remove(&session_id) {
        memory.reset().await;
        info!(session_id = %session_id, "Session removed");
    }
    StatusCode::NO_CONTENT
}

/// WebSocket handler for real-time streaming.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Each text frame is a [`MessageRequest`]. Fragments are pushed as they
/// are produced, followed by a `done` frame carrying the session id.
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket connection established");

    while let Some(msg) = socket.recv().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                info!("WebSocket connection closed");
                break;
            }
            Err(e) => {
                error!(error = %e, "WebSocket error");
                break;
            }
            _ => continue,
        };

        let turn = serde_json::from_str::<MessageRequest>(text.as_str())
            .map_err(|e| {
                ErrorResponse::bad_request(format!("Invalid message: {e}"), "INVALID_JSON")
            })
            .and_then(|request| prepare_turn(&state, request));

        let (session_id, turn) = match turn {
            Ok(prepared) => prepared,
            Err(e) => {
                let frame = json!({"type": "error", "error": e.error, "code": e.code});
                if send_json(&mut socket, &frame).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let mut fragments = turn.into_stream();
        let mut open = true;
        while let Some(fragment) = fragments.next().await {
            if send_json(&mut socket, &fragment).await.is_err() {
                open = false;
                break;
            }
        }
        if !open {
            debug!(session_id = %session_id, "Client went away mid-run");
            break;
        }

        let done = json!({"type": "done", "session_id": session_id});
        if send_json(&mut socket, &done).await.is_err() {
            break;
        }
    }
}

async fn send_json<T: Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(value).map_err(axum::Error::new)?;
    socket.send(Message::Text(payload.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            uptime_seconds: 100,
            drafter: "Claude (Sonnet)".into(),
            reviewer: "ChatGPT (O3 Mini)".into(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["drafter"], "Claude (Sonnet)");
    }

    #[test]
    fn message_request_minimal() {
        let json = r#"{"content": "Hello world"}"#;
        let request: MessageRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.content, "Hello world");
        assert!(request.session_id.is_none());
        assert!(request.attachment.is_none());
    }

    #[test]
    fn message_request_with_attachment() {
        let request: MessageRequest = serde_json::from_value(serde_json::json!({
            "session_id": "s1",
            "content": "Review",
            "attachment": {"name": "a.rs", "data_base64": "Zm4gbWFpbigpIHt9"}
        }))
        .unwrap();
        assert_eq!(request.session_id.as_deref(), Some("s1"));
        let upload = request.attachment.unwrap();
        assert_eq!(upload.name, "a.rs");
        assert_eq!(BASE64.decode(upload.data_base64).unwrap(), b"fn main() {}");
    }

    #[test]
    fn error_status_is_not_serialized() {
        let err = ErrorResponse::bad_request("nope", "EMPTY_MESSAGE");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, json!({"error": "nope", "code": "EMPTY_MESSAGE"}));
    }

    #[test]
    fn index_page_has_both_stage_styles() {
        assert!(INDEX_HTML.contains("stage-a"));
        assert!(INDEX_HTML.contains("stage-b"));
        assert!(INDEX_HTML.contains("/api/v1/ws"));
    }
}
