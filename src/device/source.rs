use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::DeviceError;

/// What the session captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Camera and microphone
    #[default]
    Video,
    /// Microphone only
    Audio,
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureMode::Video => write!(f, "video"),
            CaptureMode::Audio => write!(f, "audio"),
        }
    }
}

/// How recorded slices are assembled into the final blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Self-describing stream (webm, ogg); slices are concatenated
    Stream,
    /// 16-bit little-endian PCM slices, wrapped in a WAV header on stop
    Wav { sample_rate: u32, channels: u16 },
}

/// A negotiated container/codec combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFormat {
    pub mime: String,
    pub container: Container,
}

impl MediaFormat {
    pub fn stream(mime: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            container: Container::Stream,
        }
    }

    pub fn wav(sample_rate: u32, channels: u16) -> Self {
        Self {
            mime: "audio/wav".to_string(),
            container: Container::Wav {
                sample_rate,
                channels,
            },
        }
    }
}

/// Frequency-domain view over the live audio track
pub trait Analyser: Send + Sync {
    /// Number of frequency bins
    fn bin_count(&self) -> usize;

    /// Fill `bins` with byte magnitudes (0-255), lowest frequency first
    fn frequency_data(&self, bins: &mut [u8]);
}

/// Live preview target for video mode
pub trait PreviewSurface: Send + Sync {
    fn attach(&self, stream_id: &str);
    fn detach(&self);
}

/// An acquired camera/microphone stream
///
/// Owned exclusively by the device manager while the session previews or records.
pub trait DeviceHandle: Send + Sync {
    fn mode(&self) -> CaptureMode;

    fn stream_id(&self) -> &str;

    /// Return the format for `mime` if the device can record it
    fn negotiate(&self, mime: &str) -> Option<MediaFormat>;

    /// Format used when no preference is supported
    fn default_format(&self) -> MediaFormat;

    /// Audio analysis tap, if the stream carries audio
    fn analyser(&self) -> Option<Arc<dyn Analyser>>;

    /// Begin delivering encoded slices every `timeslice`
    ///
    /// The returned channel closes after `stop_recording` has flushed the final slice.
    fn start_recording(
        &mut self,
        format: &MediaFormat,
        timeslice: Duration,
    ) -> Result<mpsc::UnboundedReceiver<Bytes>>;

    /// Flush buffered data and close the slice channel. Safe to call twice.
    fn stop_recording(&mut self);

    /// Stop every track and free the hardware
    fn stop_tracks(&mut self);

    /// Tracks still holding hardware
    fn live_tracks(&self) -> usize;
}

/// Platform access to cameras and microphones
#[async_trait::async_trait]
pub trait DeviceSource: Send + Sync {
    /// Request camera+microphone (video) or microphone only (audio)
    async fn acquire(&self, mode: CaptureMode) -> Result<Box<dyn DeviceHandle>, DeviceError>;

    /// Source name for logging
    fn name(&self) -> &str;
}
