//! Error taxonomy for capture sessions

use serde::Serialize;
use thiserror::Error;

/// Failure to acquire a camera or microphone, or to record from it
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DeviceError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("device not found: {0}")]
    NotFound(String),

    #[error("device busy: {0}")]
    Busy(String),

    #[error("device failure: {0}")]
    Failed(String),

    #[error("recorder failure: {0}")]
    Recorder(String),
}

impl DeviceError {
    /// Guidance shown to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            DeviceError::PermissionDenied(_) => {
                "Camera or microphone access was denied. Allow access in your browser or system settings and try again."
            }
            DeviceError::NotFound(_) => {
                "No camera or microphone was found. Connect a device and try again."
            }
            DeviceError::Busy(_) => {
                "Your camera or microphone is in use by another application. Close it and try again."
            }
            DeviceError::Failed(_) => "Could not start your camera or microphone. Please try again.",
            DeviceError::Recorder(_) => {
                "The recording could not be completed. Please record your answer again."
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("cannot {op} while {state}")]
    InvalidTransition { op: &'static str, state: &'static str },

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("recording is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("upload failed: {0:#}")]
    UploadFailed(anyhow::Error),

    #[error("delete failed: {0:#}")]
    DeleteFailed(anyhow::Error),

    #[error("playback error: {0:#}")]
    Playback(anyhow::Error),
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidTransition { op, state } => {
                format!("Cannot {} while the recorder is {}.", op, state)
            }
            SessionError::Device(e) => e.user_message().to_string(),
            SessionError::Capture(_) => "Recording could not be started. Please try again.".to_string(),
            SessionError::TooLarge { limit, .. } => format!(
                "This recording is larger than {} MB and cannot be uploaded. You can still play it back locally.",
                limit / (1024 * 1024)
            ),
            SessionError::UploadFailed(_) => {
                "Upload failed. Your recording is still available for local playback.".to_string()
            }
            SessionError::DeleteFailed(_) => {
                "Could not delete the recording. Please try again.".to_string()
            }
            SessionError::Playback(_) => "Could not load the recording for playback.".to_string(),
        }
    }

    /// Fault to park the session on after a failed start or stop
    pub fn device_fault(&self) -> DeviceError {
        match self {
            SessionError::Device(e) => e.clone(),
            other => DeviceError::Recorder(other.to_string()),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
