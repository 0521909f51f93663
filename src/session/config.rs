use std::time::Duration;

use crate::device::CaptureMode;
use crate::recorder::FormatPreferences;
use crate::upload::{UploadBinding, DEFAULT_MAX_UPLOAD_BYTES};

/// Configuration for a capture session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Initial capture mode
    pub mode: CaptureMode,

    /// Question context and owner record the recording belongs to
    pub binding: UploadBinding,

    /// How often the device hands buffered media to the recorder
    pub timeslice: Duration,

    /// Level meter cadence (one animation frame by default)
    pub meter_interval: Duration,

    /// Uploads above this size are rejected before any network call
    pub max_upload_bytes: u64,

    pub preferences: FormatPreferences,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("practice-{}", uuid::Uuid::new_v4()),
            mode: CaptureMode::Video,
            binding: UploadBinding::default(),
            timeslice: Duration::from_millis(1000),
            meter_interval: Duration::from_millis(16),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            preferences: FormatPreferences::default(),
        }
    }
}
