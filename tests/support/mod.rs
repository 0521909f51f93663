// Test doubles for devices, backend and media element.
//
// Each fake records what the session asked of it so tests can assert on
// collaborator calls without hardware or network.

#![allow(dead_code)]

use anyhow::{bail, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use practice_capture::device::{Analyser, CaptureMode, DeviceHandle, DeviceSource, MediaFormat};
use practice_capture::playback::{MediaElement, MediaEvent};
use practice_capture::recorder::Blob;
use practice_capture::session::{CaptureSession, Collaborators, SessionConfig};
use practice_capture::upload::{BlobTransport, OwnerRecord, RemoteStore, UploadDestination};
use practice_capture::DeviceError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Devices
// ============================================================================

pub struct ConstantAnalyser(pub u8);

impl Analyser for ConstantAnalyser {
    fn bin_count(&self) -> usize {
        32
    }

    fn frequency_data(&self, bins: &mut [u8]) {
        bins.fill(self.0);
    }
}

pub struct FakeDevices {
    /// Tracks currently holding "hardware" across all handles
    pub live: Arc<AtomicUsize>,
    pub failure: Mutex<Option<DeviceError>>,
    pub acquired: Mutex<Vec<CaptureMode>>,
    pub supported: Vec<String>,
    pub slices: Vec<Bytes>,
    pub refuse_recording: Arc<AtomicBool>,
    pub level: u8,
}

impl FakeDevices {
    pub fn new() -> Arc<Self> {
        Self::with_slices(vec![Bytes::from_static(b"slice-1"), Bytes::from_static(b"slice-2")])
    }

    pub fn with_slices(slices: Vec<Bytes>) -> Arc<Self> {
        Arc::new(Self {
            live: Arc::new(AtomicUsize::new(0)),
            failure: Mutex::new(None),
            acquired: Mutex::new(Vec::new()),
            supported: vec![
                "video/webm;codecs=vp8,opus".to_string(),
                "audio/ogg;codecs=opus".to_string(),
            ],
            slices,
            refuse_recording: Arc::new(AtomicBool::new(false)),
            level: 64,
        })
    }

    pub fn fail_with(&self, error: Option<DeviceError>) {
        *self.failure.lock() = error;
    }

    pub fn live_tracks(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DeviceSource for FakeDevices {
    async fn acquire(&self, mode: CaptureMode) -> Result<Box<dyn DeviceHandle>, DeviceError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }

        let tracks = match mode {
            CaptureMode::Video => 2,
            CaptureMode::Audio => 1,
        };
        self.live.fetch_add(tracks, Ordering::SeqCst);
        self.acquired.lock().push(mode);

        Ok(Box::new(FakeHandle {
            mode,
            tracks,
            live: Arc::clone(&self.live),
            stopped: false,
            supported: self.supported.clone(),
            slices: self.slices.clone(),
            sender: None,
            refuse_recording: Arc::clone(&self.refuse_recording),
            level: self.level,
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub struct FakeHandle {
    mode: CaptureMode,
    tracks: usize,
    live: Arc<AtomicUsize>,
    stopped: bool,
    supported: Vec<String>,
    slices: Vec<Bytes>,
    sender: Option<mpsc::UnboundedSender<Bytes>>,
    refuse_recording: Arc<AtomicBool>,
    level: u8,
}

impl DeviceHandle for FakeHandle {
    fn mode(&self) -> CaptureMode {
        self.mode
    }

    fn stream_id(&self) -> &str {
        "fake-stream"
    }

    fn negotiate(&self, mime: &str) -> Option<MediaFormat> {
        self.supported
            .iter()
            .any(|m| m == mime)
            .then(|| MediaFormat::stream(mime))
    }

    fn default_format(&self) -> MediaFormat {
        match self.mode {
            CaptureMode::Video => MediaFormat::stream("video/x-default"),
            CaptureMode::Audio => MediaFormat::stream("audio/x-default"),
        }
    }

    fn analyser(&self) -> Option<Arc<dyn Analyser>> {
        Some(Arc::new(ConstantAnalyser(self.level)))
    }

    fn start_recording(
        &mut self,
        _format: &MediaFormat,
        _timeslice: Duration,
    ) -> Result<mpsc::UnboundedReceiver<Bytes>> {
        if self.refuse_recording.load(Ordering::SeqCst) {
            bail!("recorder refused to start");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for slice in &self.slices {
            let _ = tx.send(slice.clone());
        }
        self.sender = Some(tx);
        Ok(rx)
    }

    fn stop_recording(&mut self) {
        self.sender.take();
    }

    fn stop_tracks(&mut self) {
        self.stop_recording();
        if !self.stopped {
            self.live.fetch_sub(self.tracks, Ordering::SeqCst);
            self.stopped = true;
        }
    }

    fn live_tracks(&self) -> usize {
        if self.stopped {
            0
        } else {
            self.tracks
        }
    }
}

// ============================================================================
// Backend
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Destination {
        file_name: String,
        content_type: String,
        context: String,
    },
    Persist {
        storage_key: String,
        owner: OwnerRecord,
    },
    Resolve {
        storage_key: String,
    },
    Delete {
        storage_key: String,
        context: String,
    },
}

#[derive(Default)]
pub struct FakeStore {
    pub calls: Mutex<Vec<StoreCall>>,
    pub fail_destination: AtomicBool,
    pub fail_persist: AtomicBool,
    pub fail_resolve: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn destination_requests(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::Destination { .. }))
            .count()
    }
}

#[async_trait::async_trait]
impl RemoteStore for FakeStore {
    async fn request_upload_destination(
        &self,
        file_name: &str,
        content_type: &str,
        context: &str,
    ) -> Result<UploadDestination> {
        self.calls.lock().push(StoreCall::Destination {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            context: context.to_string(),
        });
        if self.fail_destination.load(Ordering::SeqCst) {
            bail!("destination unavailable");
        }
        Ok(UploadDestination {
            destination_uri: "https://storage.test/upload/abc".to_string(),
            storage_key: "recordings/abc.webm".to_string(),
        })
    }

    async fn persist_reference(&self, storage_key: &str, owner: &OwnerRecord) -> Result<()> {
        self.calls.lock().push(StoreCall::Persist {
            storage_key: storage_key.to_string(),
            owner: owner.clone(),
        });
        if self.fail_persist.load(Ordering::SeqCst) {
            bail!("persist rejected");
        }
        Ok(())
    }

    async fn resolve_download_uri(&self, storage_key: &str) -> Result<String> {
        self.calls.lock().push(StoreCall::Resolve {
            storage_key: storage_key.to_string(),
        });
        if self.fail_resolve.load(Ordering::SeqCst) {
            bail!("resolve failed");
        }
        Ok(format!("https://storage.test/download/{}", storage_key))
    }

    async fn delete_recording(&self, storage_key: &str, context: &str) -> Result<()> {
        self.calls.lock().push(StoreCall::Delete {
            storage_key: storage_key.to_string(),
            context: context.to_string(),
        });
        if self.fail_delete.load(Ordering::SeqCst) {
            bail!("delete rejected");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTransport {
    /// (destination, size, content type)
    pub puts: Mutex<Vec<(String, u64, String)>>,
    pub fail: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait::async_trait]
impl BlobTransport for FakeTransport {
    async fn put(&self, destination_uri: &str, blob: &Blob, content_type: &str) -> Result<()> {
        self.puts.lock().push((
            destination_uri.to_string(),
            blob.size(),
            content_type.to_string(),
        ));
        if self.fail.load(Ordering::SeqCst) {
            bail!("connection reset");
        }
        Ok(())
    }
}

// ============================================================================
// Media element
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ElementCall {
    Load(String),
    Unload,
    Play,
    Pause,
    Seek(f64),
}

pub struct FakeElement {
    pub calls: Arc<Mutex<Vec<ElementCall>>>,
}

impl MediaElement for FakeElement {
    fn load(&mut self, uri: &str, _fallback_duration: Option<f64>) {
        self.calls.lock().push(ElementCall::Load(uri.to_string()));
    }

    fn unload(&mut self) {
        self.calls.lock().push(ElementCall::Unload);
    }

    fn play(&mut self) -> Result<()> {
        self.calls.lock().push(ElementCall::Play);
        Ok(())
    }

    fn pause(&mut self) {
        self.calls.lock().push(ElementCall::Pause);
    }

    fn seek(&mut self, seconds: f64) {
        self.calls.lock().push(ElementCall::Seek(seconds));
    }
}

/// Fake element plus the sender tests use to emit native events
pub fn fake_element() -> (
    FakeElement,
    mpsc::UnboundedReceiver<MediaEvent>,
    mpsc::UnboundedSender<MediaEvent>,
    Arc<Mutex<Vec<ElementCall>>>,
) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = mpsc::unbounded_channel();
    (
        FakeElement {
            calls: Arc::clone(&calls),
        },
        rx,
        tx,
        calls,
    )
}

// ============================================================================
// Sessions
// ============================================================================

pub struct Harness {
    pub devices: Arc<FakeDevices>,
    pub store: Arc<FakeStore>,
    pub transport: Arc<FakeTransport>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            devices: FakeDevices::new(),
            store: FakeStore::new(),
            transport: FakeTransport::new(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            devices: self.devices.clone(),
            store: self.store.clone(),
            transport: self.transport.clone(),
            preview: None,
        }
    }

    pub fn session(&self, config: SessionConfig) -> CaptureSession {
        CaptureSession::new(config, self.collaborators())
    }
}
