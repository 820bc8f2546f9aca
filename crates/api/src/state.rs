//! Application state for the API server.

use std::sync::Arc;

use duet_common::AttachmentPolicy;
use duet_pipeline::{CollaborationPipeline, DuetConfig, Participants};

use crate::session::SessionRegistry;

/// Shared application state for the API server.
pub struct AppState {
    /// Drafter and reviewer shared by every session
    pub participants: Participants,

    pub attachments: AttachmentPolicy,

    pub sessions: SessionRegistry,

    /// Server start time (for health checks)
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(participants: Participants, config: &DuetConfig) -> Self {
        Self {
            participants,
            attachments: config.attachments.clone(),
            sessions: SessionRegistry::new(config.memory.capacity),
            start_time: std::time::Instant::now(),
        }
    }

    /// Build both participants' clients from configuration.
    pub fn from_config(config: &DuetConfig) -> duet_common::Result<Self> {
        Ok(Self::new(config.build_participants()?, config))
    }

    /// A pipeline bound to the given session's memory, creating the session
    /// if needed.
    pub fn pipeline_for(&self, session_id: &str) -> CollaborationPipeline {
        let memory = self.sessions.get_or_create(session_id);
        CollaborationPipeline::new(self.participants.clone(), Arc::clone(&memory))
    }

    /// Get the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
