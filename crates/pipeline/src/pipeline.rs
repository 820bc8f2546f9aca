//! The two-stage draft and review run.
//!
//! A run is a lazy stream of [`Fragment`]s:
//!
//! ```text
//! Progress ──► drafter ──┬─ degraded ──────────────────────► Final [A]
//!                        └─ ok ──► Partial [A] ──► reviewer ─► Final [A, B]
//! ```
//!
//! Each fragment is computed only when the consumer polls for it, so the draft
//! can be shown while the review is still pending. The reviewer is called at
//! most once, and only with a successful draft.

use std::sync::Arc;

use duet_llm::StageResult;
use duet_memory::{MemoryBuffer, Speaker};
use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, info};

use crate::fragment::{Fragment, FragmentStream, Section};
use crate::prompts::{drafter_system_prompt, reviewer_system_prompt};
use crate::request::CollaborationRequest;
use crate::stage::Participants;

/// Runs requests through the drafter and reviewer, recording every completed
/// run in the session memory it was built with.
#[derive(Debug, Clone)]
pub struct CollaborationPipeline {
    participants: Participants,
    memory: Arc<MemoryBuffer>,
}

enum Step {
    Start,
    Draft,
    Review { draft: StageResult },
    Done,
}

struct RunState {
    step: Step,
    request: CollaborationRequest,
    participants: Participants,
    memory: Arc<MemoryBuffer>,
}

impl CollaborationPipeline {
    pub fn new(participants: Participants, memory: Arc<MemoryBuffer>) -> Self {
        Self {
            participants,
            memory,
        }
    }

    pub fn participants(&self) -> &Participants {
        &self.participants
    }

    pub fn memory(&self) -> &Arc<MemoryBuffer> {
        &self.memory
    }

    /// Start a run. Nothing happens until the returned stream is polled.
    pub fn run(&self, request: CollaborationRequest) -> FragmentStream {
        let state = RunState {
            step: Step::Start,
            request,
            participants: self.participants.clone(),
            memory: self.memory.clone(),
        };

        stream::unfold(state, |mut state| async move {
            let fragment = match std::mem::replace(&mut state.step, Step::Done) {
                Step::Start => {
                    state.step = Step::Draft;
                    Fragment::Progress {
                        message: format!(
                            "⏳ Starting collaboration between {} and {}...",
                            state.participants.drafter.name(),
                            state.participants.reviewer.name()
                        ),
                    }
                }
                Step::Draft => {
                    let draft = state.draft().await;
                    let section = state.draft_section(&draft);
                    if draft.is_degraded() {
                        state.record(&draft, None).await;
                        Fragment::Final {
                            sections: vec![section],
                        }
                    } else {
                        state.step = Step::Review { draft };
                        Fragment::Partial {
                            sections: vec![section],
                        }
                    }
                }
                Step::Review { draft } => {
                    let review = state.review(&draft).await;
                    state.record(&draft, Some(&review)).await;
                    Fragment::Final {
                        sections: vec![
                            state.draft_section(&draft),
                            Section::from_result(
                                Speaker::StageB,
                                state.participants.reviewer.label(),
                                &review,
                            ),
                        ],
                    }
                }
                Step::Done => return None,
            };
            Some((fragment, state))
        })
        .boxed()
    }

    /// Drive a run to completion and return every fragment it produced.
    pub async fn run_to_end(&self, request: CollaborationRequest) -> Vec<Fragment> {
        self.run(request).collect().await
    }
}

impl RunState {
    async fn draft(&self) -> StageResult {
        let drafter = &self.participants.drafter;
        let reviewer = &self.participants.reviewer;

        let payload = match self.request.history() {
            Some(_) => self.request.drafter_payload(),
            None => {
                let history = self.memory.format_for_prompt().await;
                self.request.clone().with_history(history).drafter_payload()
            }
        };

        info!(
            drafter = %drafter.name(),
            model = %drafter.model(),
            payload_chars = payload.len(),
            "Requesting draft"
        );

        let system = drafter_system_prompt(drafter.name(), reviewer.name(), self.request.prompt());
        drafter.invoke(system, payload).await
    }

    async fn review(&self, draft: &StageResult) -> StageResult {
        let drafter = &self.participants.drafter;
        let reviewer = &self.participants.reviewer;

        info!(
            reviewer = %reviewer.name(),
            model = %reviewer.model(),
            draft_chars = draft.text().len(),
            "Requesting review"
        );

        let system = reviewer_system_prompt(reviewer.name(), drafter.name(), self.request.prompt());
        reviewer.invoke(system, draft.text().to_string()).await
    }

    fn draft_section(&self, draft: &StageResult) -> Section {
        Section::from_result(Speaker::StageA, self.participants.drafter.label(), draft)
    }

    /// Record the finished run, degraded output included.
    async fn record(&self, draft: &StageResult, review: Option<&StageResult>) {
        self.memory.append(Speaker::User, self.request.user_turn()).await;
        self.memory.append(Speaker::StageA, draft.text()).await;
        if let Some(review) = review {
            self.memory.append(Speaker::StageB, review.text()).await;
        }
        let entries = self.memory.len().await;
        debug!(entries, reviewed = review.is_some(), "Recorded run in memory");
    }
}
