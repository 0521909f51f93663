use crate::config::CaptureConfig;
use crate::session::{CaptureSession, Collaborators, SessionSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};

/// A live session and its published snapshots
#[derive(Clone)]
pub struct SessionEntry {
    pub session: Arc<Mutex<CaptureSession>>,
    /// Readable while an operation (e.g. a long upload) holds the session lock
    pub status: watch::Receiver<SessionSnapshot>,
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active capture sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,

    /// Devices and backend every new session is wired to
    pub collaborators: Collaborators,

    pub capture: CaptureConfig,
}

impl AppState {
    pub fn new(collaborators: Collaborators, capture: CaptureConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            collaborators,
            capture,
        }
    }

    pub async fn session(&self, session_id: &str) -> Option<SessionEntry> {
        self.sessions.read().await.get(session_id).cloned()
    }
}
