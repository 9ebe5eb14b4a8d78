//! Ephemeral per-submitter session storage

use super::{SessionState, Stage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory session table keyed by submitter id
///
/// Sessions live only as long as the dialogue: they are created by the
/// start command and removed on finalize or cancel.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<i64, SessionState>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the session for a submitter
    pub async fn get(&self, submitter_id: i64) -> Option<SessionState> {
        self.sessions.read().await.get(&submitter_id).cloned()
    }

    /// Current stage, `Idle` when no session exists
    pub async fn stage(&self, submitter_id: i64) -> Stage {
        self.get(submitter_id)
            .await
            .map(|s| s.stage)
            .unwrap_or(Stage::Idle)
    }

    /// Store the next state; an `Idle` state removes the session
    pub async fn put(&self, submitter_id: i64, state: SessionState) {
        let mut sessions = self.sessions.write().await;
        if state.stage.is_terminal() {
            sessions.remove(&submitter_id);
        } else {
            sessions.insert(submitter_id, state);
        }
    }

    pub async fn clear(&self, submitter_id: i64) -> Option<SessionState> {
        self.sessions.write().await.remove(&submitter_id)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
