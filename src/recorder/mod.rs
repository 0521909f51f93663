//! Recorder
//!
//! Turns a held device handle into a finished, locally playable recording.

mod blob;
mod format;
mod recorder;

pub use blob::{Blob, ObjectUrlRegistry, Recording, RecordingSummary};
pub use format::{
    extension_for, finalize, select_format, FormatPreferences, DEFAULT_AUDIO_FORMATS,
    DEFAULT_VIDEO_FORMATS,
};
pub use recorder::{Recorder, RecorderConfig};
