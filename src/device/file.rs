//! File-backed microphone
//!
//! Replays a WAV file as if it were a live microphone: the playhead advances with the
//! clock from the moment the device is acquired and loops at the end of the file.
//! Used by the CLI and for batch/offline practice sessions.

use std::f64::consts::PI;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use hound::WavReader;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use super::source::{Analyser, CaptureMode, Container, DeviceHandle, DeviceSource, MediaFormat};
use crate::error::DeviceError;
use crate::task::RepeatingTask;

const ANALYSER_BINS: usize = 64;

/// Decoded 16-bit PCM audio
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            bail!(
                "Unsupported WAV encoding: {} bit {:?}",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Interleaved sample index the playhead has reached after `elapsed`
    fn sample_position(&self, elapsed: Duration) -> usize {
        let frames = (elapsed.as_secs_f64() * self.sample_rate as f64) as usize;
        frames * self.channels as usize
    }

    /// Samples in `[from, to)`, looping over the file
    fn looped_range(&self, from: usize, to: usize) -> Vec<i16> {
        if self.samples.is_empty() || to <= from {
            return Vec::new();
        }

        let len = self.samples.len();
        (from..to).map(|i| self.samples[i % len]).collect()
    }
}

/// Microphone source backed by a WAV file
pub struct FileDeviceSource {
    path: PathBuf,
}

impl FileDeviceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl DeviceSource for FileDeviceSource {
    async fn acquire(&self, mode: CaptureMode) -> Result<Box<dyn DeviceHandle>, DeviceError> {
        if mode == CaptureMode::Video {
            return Err(DeviceError::NotFound(format!(
                "{} provides no camera",
                self.path.display()
            )));
        }

        let path = self.path.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
            .await
            .map_err(|e| DeviceError::Failed(e.to_string()))?
            .map_err(classify_open_error)?;

        Ok(Box::new(FileDeviceHandle::new(Arc::new(audio))))
    }

    fn name(&self) -> &str {
        "file"
    }
}

fn classify_open_error(err: anyhow::Error) -> DeviceError {
    let io_kind = err.chain().find_map(|cause| {
        cause
            .downcast_ref::<hound::Error>()
            .and_then(|e| match e {
                hound::Error::IoError(io) => Some(io.kind()),
                _ => None,
            })
            .or_else(|| cause.downcast_ref::<io::Error>().map(|io| io.kind()))
    });

    match io_kind {
        Some(io::ErrorKind::NotFound) => DeviceError::NotFound(format!("{:#}", err)),
        Some(io::ErrorKind::PermissionDenied) => {
            DeviceError::PermissionDenied(format!("{:#}", err))
        }
        _ => DeviceError::Failed(format!("{:#}", err)),
    }
}

struct Playhead {
    recorded_upto: usize,
    sender: Option<mpsc::UnboundedSender<Bytes>>,
}

pub struct FileDeviceHandle {
    stream_id: String,
    audio: Arc<AudioFile>,
    started: Instant,
    playhead: Arc<Mutex<Playhead>>,
    slicer: Option<RepeatingTask>,
    live: bool,
}

impl FileDeviceHandle {
    fn new(audio: Arc<AudioFile>) -> Self {
        Self {
            stream_id: format!("file-{}", uuid::Uuid::new_v4()),
            audio,
            started: Instant::now(),
            playhead: Arc::new(Mutex::new(Playhead {
                recorded_upto: 0,
                sender: None,
            })),
            slicer: None,
            live: true,
        }
    }
}

/// Send everything between the last slice and the current playhead
fn flush_slice(audio: &AudioFile, started: Instant, playhead: &mut Playhead) {
    let upto = audio.sample_position(started.elapsed());
    let samples = audio.looped_range(playhead.recorded_upto, upto);
    playhead.recorded_upto = upto.max(playhead.recorded_upto);

    if let Some(sender) = &playhead.sender {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        debug!("Delivering slice of {} bytes", bytes.len());
        let _ = sender.send(Bytes::from(bytes));
    }
}

impl DeviceHandle for FileDeviceHandle {
    fn mode(&self) -> CaptureMode {
        CaptureMode::Audio
    }

    fn stream_id(&self) -> &str {
        &self.stream_id
    }

    fn negotiate(&self, mime: &str) -> Option<MediaFormat> {
        let format = self.default_format();
        let base = mime.split(';').next().unwrap_or_default().trim();
        matches!(base, "audio/wav" | "audio/wave" | "audio/x-wav").then_some(format)
    }

    fn default_format(&self) -> MediaFormat {
        MediaFormat::wav(self.audio.sample_rate, self.audio.channels)
    }

    fn analyser(&self) -> Option<Arc<dyn Analyser>> {
        Some(Arc::new(FileAnalyser {
            audio: Arc::clone(&self.audio),
            started: self.started,
        }))
    }

    fn start_recording(
        &mut self,
        format: &MediaFormat,
        timeslice: Duration,
    ) -> Result<mpsc::UnboundedReceiver<Bytes>> {
        if !self.live {
            bail!("Device tracks already stopped");
        }
        if !matches!(format.container, Container::Wav { .. }) {
            bail!("File device cannot encode {}", format.mime);
        }
        if self.slicer.is_some() {
            bail!("Recording already in progress");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut playhead = self.playhead.lock();
            playhead.recorded_upto = self.audio.sample_position(self.started.elapsed());
            playhead.sender = Some(tx);
        }

        let audio = Arc::clone(&self.audio);
        let playhead = Arc::clone(&self.playhead);
        let started = self.started;

        self.slicer = Some(RepeatingTask::spawn("file-slicer", timeslice, move || {
            let mut playhead = playhead.lock();
            if playhead.sender.is_none() {
                return ControlFlow::Break(());
            }
            flush_slice(&audio, started, &mut playhead);
            ControlFlow::Continue(())
        }));

        info!("File device recording ({} every {:?})", format.mime, timeslice);

        Ok(rx)
    }

    fn stop_recording(&mut self) {
        if let Some(mut slicer) = self.slicer.take() {
            slicer.cancel_now();
        }

        let mut playhead = self.playhead.lock();
        if playhead.sender.is_some() {
            flush_slice(&self.audio, self.started, &mut playhead);
            playhead.sender = None;
        }
    }

    fn stop_tracks(&mut self) {
        self.stop_recording();
        self.live = false;
    }

    fn live_tracks(&self) -> usize {
        usize::from(self.live)
    }
}

/// Magnitude spectrum of the window under the playhead
struct FileAnalyser {
    audio: Arc<AudioFile>,
    started: Instant,
}

impl Analyser for FileAnalyser {
    fn bin_count(&self) -> usize {
        ANALYSER_BINS
    }

    fn frequency_data(&self, bins: &mut [u8]) {
        let window_len = bins.len() * 2;
        let channels = self.audio.channels.max(1) as usize;
        let start = self.audio.sample_position(self.started.elapsed());
        let interleaved = self
            .audio
            .looped_range(start, start + window_len * channels);

        let window: Vec<f64> = interleaved
            .iter()
            .step_by(channels)
            .map(|&s| s as f64 / i16::MAX as f64)
            .collect();

        if window.is_empty() {
            bins.fill(0);
            return;
        }

        let n = window.len() as f64;
        for (k, bin) in bins.iter_mut().enumerate() {
            let (mut re, mut im) = (0.0, 0.0);
            for (t, x) in window.iter().enumerate() {
                let angle = 2.0 * PI * k as f64 * t as f64 / n;
                re += x * angle.cos();
                im -= x * angle.sin();
            }
            let magnitude = (re * re + im * im).sqrt() / (n / 2.0);
            *bin = (magnitude * 255.0).clamp(0.0, 255.0) as u8;
        }
    }
}
