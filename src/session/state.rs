use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::device::MediaFormat;
use crate::error::DeviceError;
use crate::recorder::Recording;
use crate::upload::RemoteReference;

/// Where a capture session is
///
/// Each variant carries exactly the data valid in that state, so a blob cannot exist
/// alongside a storage key and an upload cannot run without a recording.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Previewing,
    Recording {
        format: MediaFormat,
        started_at: DateTime<Utc>,
    },
    Recorded {
        recording: Recording,
    },
    Uploading {
        recording: Recording,
        progress: u8,
    },
    Saved {
        reference: RemoteReference,
    },
    Error {
        error: DeviceError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Idle,
    Previewing,
    Recording,
    Recorded,
    Uploading,
    Saved,
    Error,
}

impl StateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKind::Idle => "idle",
            StateKind::Previewing => "previewing",
            StateKind::Recording => "recording",
            StateKind::Recorded => "recorded",
            StateKind::Uploading => "uploading",
            StateKind::Saved => "saved",
            StateKind::Error => "error",
        }
    }
}

impl SessionState {
    pub fn kind(&self) -> StateKind {
        match self {
            SessionState::Idle => StateKind::Idle,
            SessionState::Previewing => StateKind::Previewing,
            SessionState::Recording { .. } => StateKind::Recording,
            SessionState::Recorded { .. } => StateKind::Recorded,
            SessionState::Uploading { .. } => StateKind::Uploading,
            SessionState::Saved { .. } => StateKind::Saved,
            SessionState::Error { .. } => StateKind::Error,
        }
    }

    /// Idle and Saved are the only states with nothing in flight
    pub fn is_at_rest(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Saved { .. })
    }

    pub fn recording(&self) -> Option<&Recording> {
        match self {
            SessionState::Recorded { recording } | SessionState::Uploading { recording, .. } => {
                Some(recording)
            }
            _ => None,
        }
    }

    pub fn reference(&self) -> Option<&RemoteReference> {
        match self {
            SessionState::Saved { reference } => Some(reference),
            _ => None,
        }
    }
}
