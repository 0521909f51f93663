use std::io::Cursor;

use anyhow::{Context, Result};
use bytes::{Bytes, BytesMut};

use crate::device::{CaptureMode, Container, DeviceHandle, MediaFormat};

pub const DEFAULT_VIDEO_FORMATS: &[&str] = &[
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
];

pub const DEFAULT_AUDIO_FORMATS: &[&str] = &[
    "audio/webm;codecs=opus",
    "audio/ogg;codecs=opus",
    "audio/webm",
];

/// Ordered mime preferences per capture mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPreferences {
    pub video: Vec<String>,
    pub audio: Vec<String>,
}

impl Default for FormatPreferences {
    fn default() -> Self {
        Self {
            video: DEFAULT_VIDEO_FORMATS.iter().map(|s| s.to_string()).collect(),
            audio: DEFAULT_AUDIO_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FormatPreferences {
    pub fn for_mode(&self, mode: CaptureMode) -> &[String] {
        match mode {
            CaptureMode::Video => &self.video,
            CaptureMode::Audio => &self.audio,
        }
    }
}

/// First preference the device supports, else the device default
pub fn select_format(preferences: &[String], handle: &dyn DeviceHandle) -> MediaFormat {
    preferences
        .iter()
        .find_map(|mime| handle.negotiate(mime))
        .unwrap_or_else(|| handle.default_format())
}

/// Assemble recorded slices into the final payload
pub fn finalize(format: &MediaFormat, slices: Vec<Bytes>) -> Result<Bytes> {
    match format.container {
        Container::Stream => {
            let total = slices.iter().map(|s| s.len()).sum();
            let mut out = BytesMut::with_capacity(total);
            for slice in slices {
                out.extend_from_slice(&slice);
            }
            Ok(out.freeze())
        }
        Container::Wav {
            sample_rate,
            channels,
        } => encode_wav(sample_rate, channels, &slices),
    }
}

fn encode_wav(sample_rate: u32, channels: u16, slices: &[Bytes]) -> Result<Bytes> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;

        // Slices are little-endian i16; a dangling odd byte cannot form a sample.
        let pcm: Vec<u8> = slices.iter().flat_map(|s| s.iter().copied()).collect();
        for pair in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize().context("Failed to finalize WAV")?;
    }

    Ok(Bytes::from(cursor.into_inner()))
}

/// File extension for an upload of `mime`
pub fn extension_for(mime: &str) -> &'static str {
    let base = mime.split(';').next().unwrap_or_default().trim();
    match base {
        "video/webm" | "audio/webm" => "webm",
        "audio/ogg" | "video/ogg" => "ogg",
        "audio/wav" | "audio/wave" | "audio/x-wav" => "wav",
        "video/mp4" | "audio/mp4" => "mp4",
        _ => "bin",
    }
}
