//! Draft-then-review collaboration between two hosted models.
//!
//! A request flows through the session memory, the drafting stage, the
//! reviewing stage and back into memory:
//!
//! ```text
//! User request
//!      │
//!      ▼
//! ┌──────────────┐  format_for_prompt   ┌──────────────┐
//! │ MemoryBuffer │ ───────────────────► │   Drafter    │  (stage A)
//! └──────────────┘                      └──────┬───────┘
//!        ▲                                     │ draft
//!        │ append                              ▼
//!        │                              ┌──────────────┐
//!        └───────────────────────────── │   Reviewer   │  (stage B)
//!                                       └──────────────┘
//! ```
//!
//! Both stages call their backend through
//! [`RetryingClient`](duet_llm::RetryingClient), so a run always finishes
//! with displayable text even when a backend is down.

pub mod config;
pub mod fragment;
pub mod labels;
pub mod pipeline;
pub mod prompts;
pub mod request;
pub mod stage;

pub use config::{DuetConfig, ParticipantConfig};
pub use fragment::{Fragment, FragmentStream, Section};
pub use pipeline::CollaborationPipeline;
pub use request::CollaborationRequest;
pub use stage::{Participants, Stage};
