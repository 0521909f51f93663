//! Device Session Manager
//!
//! Acquires and releases camera/microphone handles and runs the speaking-level meter
//! while a handle is held.

mod file;
mod manager;
mod meter;
mod source;

pub use file::{AudioFile, FileDeviceHandle, FileDeviceSource};
pub use manager::DeviceSessionManager;
pub use meter::{normalize_level, LevelMeter};
pub use source::{
    Analyser, CaptureMode, Container, DeviceHandle, DeviceSource, MediaFormat, PreviewSurface,
};
