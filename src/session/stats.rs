use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::StateKind;
use crate::device::CaptureMode;
use crate::playback::PlaybackView;
use crate::recorder::RecordingSummary;

/// Point-in-time view of a capture session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,

    pub state: StateKind,

    pub mode: CaptureMode,

    /// Whole seconds recorded, driven by the one-second tick
    pub elapsed_seconds: u64,

    /// Speaking level 0-100 while devices are held
    pub audio_level: u8,

    pub recording: Option<RecordingSummary>,

    /// Coarse upload progress (20, 70, 100) while uploading
    pub upload_progress: Option<u8>,

    pub storage_key: Option<String>,

    /// Device or recorder guidance while in the error state
    pub error: Option<String>,

    /// Last user-facing message from a failed upload or delete
    pub notice: Option<String>,

    pub playback: PlaybackView,

    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn empty(session_id: String, mode: CaptureMode) -> Self {
        Self {
            session_id,
            state: StateKind::Idle,
            mode,
            elapsed_seconds: 0,
            audio_level: 0,
            recording: None,
            upload_progress: None,
            storage_key: None,
            error: None,
            notice: None,
            playback: PlaybackView::default(),
            updated_at: Utc::now(),
        }
    }
}
