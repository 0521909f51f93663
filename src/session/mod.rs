//! Capture session management
//!
//! This module provides the `CaptureSession` controller that ties together:
//! - Device acquisition and the speaking-level meter
//! - Recording into a locally playable blob
//! - Upload to backend storage and attachment to an owner record
//! - Playback of the local or stored recording, and deletion

mod config;
mod session;
mod state;
mod stats;

pub use config::SessionConfig;
pub use session::{CaptureSession, Collaborators};
pub use state::{SessionState, StateKind};
pub use stats::SessionSnapshot;
