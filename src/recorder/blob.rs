use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;

/// Immutable recorded media with its declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Bytes,
    pub mime: String,
}

impl Blob {
    pub fn new(data: impl Into<Bytes>, mime: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime: mime.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// One finished capture, playable through its local URI
#[derive(Debug, Clone)]
pub struct Recording {
    pub blob: Blob,
    pub duration_seconds: f64,
    pub local_uri: String,
}

/// Summary of a recording for snapshots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingSummary {
    pub size_bytes: u64,
    pub mime: String,
    pub duration_seconds: f64,
    pub local_uri: String,
}

impl From<&Recording> for RecordingSummary {
    fn from(recording: &Recording) -> Self {
        Self {
            size_bytes: recording.blob.size(),
            mime: recording.blob.mime.clone(),
            duration_seconds: recording.duration_seconds,
            local_uri: recording.local_uri.clone(),
        }
    }
}

/// Session-local `blob:` URIs naming in-memory recordings
///
/// Clones share the same table, so a playback element can resolve URIs minted by the
/// session that owns it.
#[derive(Clone, Default)]
pub struct ObjectUrlRegistry {
    entries: Arc<Mutex<HashMap<String, Blob>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, blob: &Blob) -> String {
        let uri = format!("blob:practice-capture/{}", uuid::Uuid::new_v4());
        self.entries.lock().insert(uri.clone(), blob.clone());
        uri
    }

    /// Returns whether the URI was live
    pub fn revoke(&self, uri: &str) -> bool {
        self.entries.lock().remove(uri).is_some()
    }

    pub fn resolve(&self, uri: &str) -> Option<Blob> {
        self.entries.lock().get(uri).cloned()
    }

    pub fn revoke_all(&self) {
        self.entries.lock().clear();
    }

    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }
}
