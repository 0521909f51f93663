// Integration tests for the WAV-backed microphone

mod support;

use anyhow::Result;
use practice_capture::device::{AudioFile, CaptureMode, DeviceSource, FileDeviceSource};
use practice_capture::session::{CaptureSession, Collaborators, SessionConfig, StateKind};
use practice_capture::DeviceError;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use support::{FakeStore, FakeTransport};
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 16000;

fn write_tone(path: &Path, seconds: f64) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let count = (SAMPLE_RATE as f64 * seconds) as usize;
    for i in 0..count {
        let t = i as f64 / SAMPLE_RATE as f64;
        let sample = (t * 440.0 * 2.0 * std::f64::consts::PI).sin() * 20000.0;
        writer.write_sample(sample as i16)?;
    }
    writer.finalize()?;

    Ok(())
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("answer.wav");
    write_tone(&path, 0.5)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.sample_rate, SAMPLE_RATE);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 8000);
    assert!((audio.duration_seconds - 0.5).abs() < 0.001);

    Ok(())
}

#[test]
fn test_audio_file_rejects_float_samples() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("float.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    writer.write_sample(0.5f32)?;
    writer.finalize()?;

    assert!(AudioFile::open(&path).is_err());

    Ok(())
}

#[tokio::test]
async fn test_video_mode_has_no_camera() {
    let source = FileDeviceSource::new("/nonexistent/answer.wav");

    let result = source.acquire(CaptureMode::Video).await;

    assert!(matches!(result, Err(DeviceError::NotFound(_))));
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let source = FileDeviceSource::new("/nonexistent/answer.wav");

    let result = source.acquire(CaptureMode::Audio).await;

    assert!(matches!(result, Err(DeviceError::NotFound(_))));
}

#[tokio::test]
async fn test_acquired_handle_negotiates_wav_only() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("answer.wav");
    write_tone(&path, 0.5)?;

    let source = FileDeviceSource::new(&path);
    let mut handle = source.acquire(CaptureMode::Audio).await?;

    assert_eq!(handle.mode(), CaptureMode::Audio);
    assert_eq!(handle.live_tracks(), 1);
    assert!(handle.negotiate("audio/webm;codecs=opus").is_none());
    assert_eq!(
        handle.negotiate("audio/wav").map(|f| f.mime),
        Some("audio/wav".to_string())
    );

    handle.stop_tracks();
    assert_eq!(handle.live_tracks(), 0);

    Ok(())
}

#[tokio::test]
async fn test_records_decodable_wav_from_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("answer.wav");
    write_tone(&path, 1.0)?;

    let collaborators = Collaborators {
        devices: Arc::new(FileDeviceSource::new(&path)),
        store: FakeStore::new(),
        transport: FakeTransport::new(),
        preview: None,
    };
    let mut session = CaptureSession::new(
        SessionConfig {
            mode: CaptureMode::Audio,
            timeslice: Duration::from_millis(100),
            ..SessionConfig::default()
        },
        collaborators,
    );

    session.preview().await?;
    assert_eq!(session.live_tracks(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.audio_level() > 0, "a 440 Hz tone registers on the meter");

    session.start_recording().await?;
    tokio::time::sleep(Duration::from_millis(350)).await;
    session.stop_recording().await?;

    assert_eq!(session.state_kind(), StateKind::Recorded);
    assert_eq!(session.live_tracks(), 0);

    let recording = session.state().recording().cloned().expect("recorded");
    assert_eq!(recording.blob.mime, "audio/wav");

    let reader = hound::WavReader::new(Cursor::new(recording.blob.data.to_vec()))?;
    assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
    assert_eq!(reader.spec().channels, 1);

    let seconds = reader.duration() as f64 / SAMPLE_RATE as f64;
    assert!(seconds > 0.25, "captured {:.3}s", seconds);
    assert!((seconds - recording.duration_seconds).abs() < 0.1);

    // Local playback knows the real length of a WAV blob
    let view = session.playback_view();
    assert!(view.loaded);
    assert!((view.duration - seconds).abs() < 0.01);

    Ok(())
}
