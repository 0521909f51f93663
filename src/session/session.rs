use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::state::{SessionState, StateKind};
use super::stats::SessionSnapshot;
use crate::device::{CaptureMode, DeviceSessionManager, DeviceSource, PreviewSurface};
use crate::error::{DeviceError, SessionError, SessionResult};
use crate::playback::{
    MediaElement, MediaEvent, PlaybackController, PlaybackSource, PlaybackView, VirtualMediaElement,
};
use crate::recorder::{ObjectUrlRegistry, Recorder, RecorderConfig, RecordingSummary};
use crate::upload::{BlobTransport, RemoteReference, RemoteStore, UploadPipeline};

/// Platform and backend services a session depends on
#[derive(Clone)]
pub struct Collaborators {
    pub devices: Arc<dyn DeviceSource>,
    pub store: Arc<dyn RemoteStore>,
    pub transport: Arc<dyn BlobTransport>,
    pub preview: Option<Arc<dyn PreviewSurface>>,
}

/// Capture-and-upload session controller
///
/// Owns one recording attempt at a time: device handles while previewing or
/// recording, the local blob until it is uploaded or discarded, and the remote
/// reference once saved. Every exit path releases handles, timers and local URIs.
pub struct CaptureSession {
    config: SessionConfig,
    mode: CaptureMode,
    state: SessionState,
    notice: Option<String>,
    devices: DeviceSessionManager,
    recorder: Recorder,
    uploads: UploadPipeline,
    store: Arc<dyn RemoteStore>,
    playback: PlaybackController,
    urls: ObjectUrlRegistry,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl CaptureSession {
    /// Create a session that plays back through a headless media element
    pub fn new(config: SessionConfig, collaborators: Collaborators) -> Self {
        Self::with_media(config, collaborators, |urls| {
            let (element, events) = VirtualMediaElement::new(urls);
            (Box::new(element) as Box<dyn MediaElement>, events)
        })
    }

    /// Create a session with a caller-provided media element
    ///
    /// The factory receives the session's object-URL registry so the element can
    /// resolve local recordings.
    pub fn with_media<F>(config: SessionConfig, collaborators: Collaborators, media: F) -> Self
    where
        F: FnOnce(
            ObjectUrlRegistry,
        ) -> (Box<dyn MediaElement>, mpsc::UnboundedReceiver<MediaEvent>),
    {
        info!("Creating capture session: {}", config.session_id);

        let urls = ObjectUrlRegistry::new();
        let (element, events) = media(urls.clone());

        let devices = DeviceSessionManager::new(
            collaborators.devices,
            collaborators.preview,
            config.meter_interval,
        );
        let recorder = Recorder::new(
            RecorderConfig {
                timeslice: config.timeslice,
                preferences: config.preferences.clone(),
            },
            urls.clone(),
        );
        let uploads = UploadPipeline::new(
            Arc::clone(&collaborators.store),
            collaborators.transport,
            config.max_upload_bytes,
        );

        let (snapshot_tx, _) = watch::channel(SessionSnapshot::empty(
            config.session_id.clone(),
            config.mode,
        ));

        Self {
            mode: config.mode,
            config,
            state: SessionState::Idle,
            notice: None,
            devices,
            recorder,
            uploads,
            store: collaborators.store,
            playback: PlaybackController::new(element, events),
            urls,
            snapshot_tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.session_id
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn object_urls(&self) -> &ObjectUrlRegistry {
        &self.urls
    }

    /// Snapshots published on every transition
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Tracks still holding camera/microphone hardware
    pub fn live_tracks(&self) -> usize {
        self.devices.live_tracks()
    }

    /// Running meter and elapsed-tick tasks
    pub fn pending_timers(&self) -> usize {
        usize::from(self.devices.meter_active()) + usize::from(self.recorder.ticker_active())
    }

    pub fn audio_level(&self) -> u8 {
        self.devices.audio_level()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.recorder.elapsed_seconds()
    }

    pub fn playback_view(&mut self) -> PlaybackView {
        self.playback.view()
    }

    pub fn snapshot(&mut self) -> SessionSnapshot {
        let (upload_progress, storage_key, error) = match &self.state {
            SessionState::Uploading { progress, .. } => (Some(*progress), None, None),
            SessionState::Saved { reference } => (None, Some(reference.storage_key.clone()), None),
            SessionState::Error { error } => (None, None, Some(error.user_message().to_string())),
            _ => (None, None, None),
        };

        SessionSnapshot {
            session_id: self.config.session_id.clone(),
            state: self.state.kind(),
            mode: self.mode,
            elapsed_seconds: self.recorder.elapsed_seconds(),
            audio_level: self.devices.audio_level(),
            recording: self.state.recording().map(RecordingSummary::from),
            upload_progress,
            storage_key,
            error,
            notice: self.notice.clone(),
            playback: self.playback.view(),
            updated_at: Utc::now(),
        }
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        self.snapshot_tx.send_replace(snapshot);
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            "Session {}: {} -> {}",
            self.config.session_id,
            self.state.kind().as_str(),
            next.kind().as_str()
        );
        self.state = next;
        self.publish();
    }

    fn invalid(&self, op: &'static str) -> SessionError {
        warn!(
            "Session {}: cannot {} while {}",
            self.config.session_id,
            op,
            self.state.kind().as_str()
        );
        SessionError::InvalidTransition {
            op,
            state: self.state.kind().as_str(),
        }
    }

    /// Acquire devices and show the live preview
    pub async fn preview(&mut self) -> SessionResult<()> {
        if !matches!(self.state, SessionState::Idle | SessionState::Error { .. }) {
            return Err(self.invalid("start preview"));
        }
        self.notice = None;
        self.acquire().await
    }

    /// Try device acquisition again after a failure
    pub async fn retry(&mut self) -> SessionResult<()> {
        if !matches!(self.state, SessionState::Error { .. }) {
            return Err(self.invalid("retry"));
        }
        self.acquire().await
    }

    async fn acquire(&mut self) -> SessionResult<()> {
        match self.devices.acquire(self.mode).await {
            Ok(()) => {
                self.transition(SessionState::Previewing);
                Ok(())
            }
            Err(e) => {
                self.fail_device(e.clone()).await;
                Err(SessionError::Device(e))
            }
        }
    }

    async fn fail_device(&mut self, error: DeviceError) {
        self.recorder.cancel(self.devices.handle_mut()).await;
        self.devices.release().await;
        self.transition(SessionState::Error { error });
    }

    /// Switch between video and audio capture
    ///
    /// Ignored while recording or uploading. While previewing the current handle is
    /// released and devices are re-acquired under the new mode.
    pub async fn set_mode(&mut self, mode: CaptureMode) -> SessionResult<()> {
        if mode == self.mode {
            return Ok(());
        }

        match self.state {
            SessionState::Recording { .. } | SessionState::Uploading { .. } => {
                warn!("Mode switch to {} ignored while {}", mode, self.state.kind().as_str());
                Ok(())
            }
            SessionState::Previewing => {
                info!("Switching capture mode to {}", mode);
                self.mode = mode;
                self.devices.release().await;
                self.acquire().await
            }
            _ => {
                self.mode = mode;
                self.publish();
                Ok(())
            }
        }
    }

    pub async fn start_recording(&mut self) -> SessionResult<()> {
        if !matches!(self.state, SessionState::Previewing) {
            return Err(self.invalid("start recording"));
        }

        let started = match self.devices.handle_mut() {
            Some(handle) => self.recorder.start(handle),
            None => Err(SessionError::Device(DeviceError::NotFound(
                "no device handle held".to_string(),
            ))),
        };

        match started {
            Ok(format) => {
                self.transition(SessionState::Recording {
                    format,
                    started_at: Utc::now(),
                });
                Ok(())
            }
            Err(e) => {
                error!("Failed to start recording: {}", e);
                self.fail_device(e.device_fault()).await;
                Err(e)
            }
        }
    }

    /// Finalize the recording and free the devices
    ///
    /// A stop after the recording was already finalized does nothing.
    pub async fn stop_recording(&mut self) -> SessionResult<()> {
        match self.state {
            SessionState::Recording { .. } => {}
            SessionState::Recorded { .. } => {
                debug!("Stop ignored: already recorded");
                return Ok(());
            }
            _ => return Err(self.invalid("stop recording")),
        }

        let finished = match self.devices.handle_mut() {
            Some(handle) => self.recorder.stop(handle).await,
            None => Err(SessionError::Capture("device handle lost".to_string())),
        };
        self.devices.release().await;

        match finished {
            Ok(Some(recording)) => {
                self.playback.load(
                    PlaybackSource::Local {
                        uri: recording.local_uri.clone(),
                    },
                    Some(recording.duration_seconds),
                );
                self.transition(SessionState::Recorded { recording });
                Ok(())
            }
            Ok(None) => {
                warn!("Recorder had nothing to finalize");
                self.transition(SessionState::Idle);
                Ok(())
            }
            Err(e) => {
                error!("Failed to finalize recording: {}", e);
                self.recorder.abort();
                self.transition(SessionState::Error {
                    error: e.device_fault(),
                });
                Err(e)
            }
        }
    }

    /// Discard the preview, the recording in progress or the finished recording
    pub async fn cancel(&mut self) -> SessionResult<()> {
        match self.state {
            SessionState::Idle => return Ok(()),
            SessionState::Uploading { .. } | SessionState::Saved { .. } => {
                return Err(self.invalid("cancel"));
            }
            _ => {}
        }

        self.recorder.cancel(self.devices.handle_mut()).await;
        self.devices.release().await;
        self.discard_local();
        self.recorder.reset_elapsed();
        self.notice = None;

        info!("Session {} cancelled", self.config.session_id);
        self.transition(SessionState::Idle);
        Ok(())
    }

    /// Throw away the finished recording and go straight back to preview
    pub async fn rerecord(&mut self) -> SessionResult<()> {
        if !matches!(self.state, SessionState::Recorded { .. }) {
            return Err(self.invalid("re-record"));
        }
        self.cancel().await?;
        self.preview().await
    }

    fn discard_local(&mut self) {
        self.playback.unload();
        if let Some(recording) = self.state.recording() {
            self.urls.revoke(&recording.local_uri);
        }
    }

    /// Upload the finished recording and attach it to its owner record
    ///
    /// On any failure the session returns to `Recorded` with the blob and its local
    /// URI untouched, so the upload can be retried.
    pub async fn upload(&mut self) -> SessionResult<RemoteReference> {
        let recording = match std::mem::take(&mut self.state) {
            SessionState::Recorded { recording } => recording,
            other => {
                self.state = other;
                return Err(self.invalid("upload"));
            }
        };

        if let Err(e) = self.uploads.check_size(&recording) {
            self.notice = Some(e.user_message());
            self.transition(SessionState::Recorded { recording });
            return Err(e);
        }

        let payload = recording.clone();
        self.notice = None;
        self.transition(SessionState::Uploading {
            recording,
            progress: 0,
        });

        let binding = self.config.binding.clone();
        let state = &mut self.state;
        let snapshot_tx = &self.snapshot_tx;
        let result = self
            .uploads
            .upload(&payload, &binding, |percent| {
                if let SessionState::Uploading { progress, .. } = state {
                    *progress = percent;
                }
                snapshot_tx.send_modify(|snapshot| {
                    snapshot.upload_progress = Some(percent);
                    snapshot.updated_at = Utc::now();
                });
            })
            .await;

        match result {
            Ok(reference) => {
                self.playback.unload();
                self.urls.revoke(&payload.local_uri);
                self.transition(SessionState::Saved {
                    reference: reference.clone(),
                });
                Ok(reference)
            }
            Err(e) => {
                self.notice = Some(e.user_message());
                self.transition(SessionState::Recorded { recording: payload });
                Err(e)
            }
        }
    }

    /// Re-open a recording stored earlier
    pub fn restore(&mut self, reference: RemoteReference) -> SessionResult<()> {
        if !matches!(self.state, SessionState::Idle) {
            return Err(self.invalid("restore a saved recording"));
        }
        info!("Restoring saved recording {}", reference.storage_key);
        self.transition(SessionState::Saved { reference });
        Ok(())
    }

    /// Resolve the saved recording's download URI and load it, once
    pub async fn open_saved(&mut self) -> SessionResult<()> {
        let (storage_key, duration) = match &self.state {
            SessionState::Saved { reference } => {
                (reference.storage_key.clone(), reference.duration_seconds)
            }
            _ => return Err(self.invalid("open a saved recording")),
        };

        if self.playback.source().is_some() {
            return Ok(());
        }

        let uri = self
            .store
            .resolve_download_uri(&storage_key)
            .await
            .map_err(|e| {
                error!("Failed to resolve download URI: {:#}", e);
                SessionError::Playback(e)
            })?;

        self.playback
            .load(PlaybackSource::Remote { storage_key, uri }, duration);
        self.publish();
        Ok(())
    }

    pub async fn toggle_play(&mut self) -> SessionResult<()> {
        if matches!(self.state, SessionState::Saved { .. }) {
            self.open_saved().await?;
        }

        self.playback.toggle_play().map_err(SessionError::Playback)?;
        self.publish();
        Ok(())
    }

    pub fn seek_relative(&mut self, delta_seconds: f64) {
        self.playback.seek_relative(delta_seconds);
        self.publish();
    }

    pub fn seek_to_fraction(&mut self, fraction: f64) {
        self.playback.seek_to_fraction(fraction);
        self.publish();
    }

    /// Delete the stored recording and clear every local field
    ///
    /// All-or-nothing: if the backend refuses, nothing local changes.
    pub async fn delete_recording(&mut self) -> SessionResult<()> {
        let (storage_key, context) = match &self.state {
            SessionState::Saved { reference } => (
                reference.storage_key.clone(),
                reference.binding.context.clone(),
            ),
            _ => return Err(self.invalid("delete the recording")),
        };

        match self.store.delete_recording(&storage_key, &context).await {
            Ok(()) => {
                info!("Deleted recording {}", storage_key);
                self.playback.unload();
                self.recorder.reset_elapsed();
                self.notice = None;
                self.transition(SessionState::Idle);
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete recording {}: {:#}", storage_key, e);
                let err = SessionError::DeleteFailed(e);
                self.notice = Some(err.user_message());
                self.publish();
                Err(err)
            }
        }
    }

    /// Release every handle, timer and local URI
    pub async fn shutdown(&mut self) {
        info!("Shutting down session {}", self.config.session_id);

        self.recorder.cancel(self.devices.handle_mut()).await;
        self.devices.release().await;
        self.playback.unload();
        self.urls.revoke_all();

        if !self.state.is_at_rest() {
            self.state = SessionState::Idle;
        }
        self.publish();
    }

    pub fn state_kind(&self) -> StateKind {
        self.state.kind()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.recorder.abort();
        self.devices.release_now();
        self.urls.revoke_all();
    }
}
