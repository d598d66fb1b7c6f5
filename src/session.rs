use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use tracing::debug;

use crate::{Exchange, FlowState, RelayError};

const FLOW_ID_BYTES: usize = 32;

/// Server-side record of one browser flow, addressed by an unguessable id.
#[derive(Debug, Clone)]
pub struct FlowSession {
    pub id: String,
    pub original_query: String,
    pub state: FlowState,
    created_at: Instant,
}

impl FlowSession {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

type Sessions = HashMap<String, FlowSession>;

#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<Sessions>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Opens a session for a completed exchange.
    pub fn start(&self, original_query: &str, exchange: Exchange) -> Result<FlowSession, RelayError> {
        let session = FlowSession {
            id: generate_flow_id()?,
            original_query: original_query.to_string(),
            state: FlowState::AwaitingGoogleAuth.complete_exchange(exchange),
            created_at: Instant::now(),
        };

        let mut sessions = self.lock();
        evict_expired(&mut sessions, self.ttl);
        sessions.insert(session.id.clone(), session.clone());
        debug!(flow = %session.id, live = sessions.len(), "flow session started");
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<FlowSession> {
        let mut sessions = self.lock();
        evict_expired(&mut sessions, self.ttl);
        sessions.get(id).cloned()
    }

    /// Runs `f` on a live session while holding the store lock.
    pub fn update<T>(&self, id: &str, f: impl FnOnce(&mut FlowSession) -> T) -> Option<T> {
        let mut sessions = self.lock();
        evict_expired(&mut sessions, self.ttl);
        sessions.get_mut(id).map(f)
    }

    pub fn remove(&self, id: &str) -> Option<FlowSession> {
        self.lock().remove(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn evict_expired(sessions: &mut Sessions, ttl: Duration) {
    sessions.retain(|_, session| !session.is_expired(ttl));
}

fn generate_flow_id() -> Result<String, RelayError> {
    let mut bytes = [0u8; FLOW_ID_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| RelayError::OsRng {
            message: err.to_string(),
        })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
