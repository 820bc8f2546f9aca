//! Per-session conversation memory.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use duet_memory::MemoryBuffer;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

/// How often idle sessions are swept out of the registry.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Bounds on how many sessions the server keeps and for how long.
#[derive(Debug, Clone)]
pub struct SessionLimits {
    /// A session unused for this long is forgotten.
    pub idle_ttl: Duration,
    /// At most this many sessions are kept. The least recently used one
    /// makes room for a new session.
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(60 * 60),
            max_sessions: 10_000,
        }
    }
}

#[derive(Debug)]
struct Session {
    memory: Arc<MemoryBuffer>,
    last_used: Instant,
}

impl Session {
    fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.last_used) > ttl
    }
}

/// Maps session ids to their memory buffers. Each session gets its own
/// buffer, so history never leaks between browser tabs.
#[derive(Debug)]
pub struct SessionRegistry {
    capacity: usize,
    limits: SessionLimits,
    sessions: RwLock<HashMap<String, Session>>,
    last_cleanup: Mutex<Instant>,
}

impl SessionRegistry {
    /// `capacity` is the memory size given to each new session.
    pub fn new(capacity: usize) -> Self {
        Self::with_limits(capacity, SessionLimits::default())
    }

    pub fn with_limits(capacity: usize, limits: SessionLimits) -> Self {
        Self {
            capacity,
            limits,
            sessions: RwLock::new(HashMap::new()),
            last_cleanup: Mutex::new(Instant::now()),
        }
    }

    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Look up a live session and mark it used. Idle sessions read as absent.
    pub fn get(&self, id: &str) -> Option<Arc<MemoryBuffer>> {
        let now = Instant::now();
        let mut sessions = self.sessions.write();

        if sessions.get(id)?.is_idle(now, self.limits.idle_ttl) {
            sessions.remove(id);
            debug!(session_id = %id, "Dropped idle session");
            return None;
        }

        let session = sessions.get_mut(id)?;
        session.last_used = now;
        Some(Arc::clone(&session.memory))
    }

    pub fn get_or_create(&self, id: &str) -> Arc<MemoryBuffer> {
        if let Some(memory) = self.get(id) {
            return memory;
        }

        self.maybe_cleanup();

        let now = Instant::now();
        let mut sessions = self.sessions.write();

        if !sessions.contains_key(id) && sessions.len() >= self.limits.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_used)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                debug!(session_id = %oldest, "Evicted least recently used session");
            }
        }

        let session = sessions.entry(id.to_string()).or_insert_with(|| {
            info!(session_id = %id, capacity = self.capacity, "Created session");
            Session {
                memory: Arc::new(MemoryBuffer::new(self.capacity)),
                last_used: now,
            }
        });
        session.last_used = now;
        Arc::clone(&session.memory)
    }

    /// Forget a session. Returns its memory so callers can clear runs that
    /// still hold it.
    pub fn remove(&self, id: &str) -> Option<Arc<MemoryBuffer>> {
        self.sessions.write().remove(id).map(|session| session.memory)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Sweep idle sessions at most once per `CLEANUP_INTERVAL`.
    fn maybe_cleanup(&self) {
        let now = Instant::now();
        let mut last = self.last_cleanup.lock();
        if now.duration_since(*last) < CLEANUP_INTERVAL {
            return;
        }
        *last = now;
        drop(last);

        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_idle(now, self.limits.idle_ttl));
        let dropped = before - sessions.len();
        if dropped > 0 {
            debug!(dropped, remaining = sessions.len(), "Swept idle sessions");
        }
    }
}
