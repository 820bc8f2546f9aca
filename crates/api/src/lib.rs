//! REST/WebSocket gateway for Duet.
//!
//! # Endpoints
//!
//! - `GET /` - Chat page
//! - `GET /health` - Health check
//! - `POST /api/v1/messages` - Run a message through the draft/review pipeline
//! - `GET /api/v1/sessions/{id}` - Remembered turns of a session
//! - `DELETE /api/v1/sessions/{id}` - Clear a session's memory
//! - `WS /api/v1/ws` - Same as messages, with fragments pushed as they arrive
//!
//! ```text
//! Browser / client
//!    │
//!    ▼
//! ┌─────────────────┐
//! │   API Gateway   │ ◄── This crate
//! │     (Axum)      │
//! └────────┬────────┘
//!          │ session id
//!          ▼
//! ┌─────────────────┐      ┌─────────────────┐
//! │ SessionRegistry │ ───► │ Collaboration   │
//! │  (memory/tab)   │      │    Pipeline     │
//! └─────────────────┘      └─────────────────┘
//! ```

pub mod routes;
pub mod session;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use session::SessionRegistry;
pub use state::AppState;

/// Room for JSON framing and the prompt on top of a base64 attachment.
const BODY_OVERHEAD: usize = 64 * 1024;

/// Largest request body accepted: a maximal attachment after base64
/// encoding, plus the rest of the message.
pub fn max_body_size(state: &AppState) -> usize {
    state.attachments.max_bytes.div_ceil(3) * 4 + BODY_OVERHEAD
}

fn cors_layer(origins: Option<Vec<String>>) -> CorsLayer {
    let allow_origin = match origins {
        Some(origins) if !origins.iter().any(|o| o == "*") => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(parsed)
        }
        _ => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the API router with all routes configured.
///
/// `cors_origins` of `None` (or containing `*`) allows any origin.
pub fn create_router(state: Arc<AppState>, cors_origins: Option<Vec<String>>) -> Router {
    let body_limit = max_body_size(&state);

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/api/v1/messages", post(routes::send_message))
        .route(
            "/api/v1/sessions/{id}",
            get(routes::get_session).delete(routes::reset_session),
        )
        .route("/api/v1/ws", get(routes::websocket_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Start the API server on the given address.
pub async fn serve(
    state: Arc<AppState>,
    addr: SocketAddr,
    cors_origins: Option<Vec<String>>,
) -> anyhow::Result<()> {
    info!(
        %addr,
        drafter = %state.participants.drafter.label(),
        reviewer = %state.participants.reviewer.label(),
        "Starting Duet API server"
    );

    let router = create_router(state, cors_origins);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
