use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::blob::{Blob, ObjectUrlRegistry, Recording};
use super::format::{finalize, select_format, FormatPreferences};
use crate::device::{DeviceHandle, MediaFormat};
use crate::error::{SessionError, SessionResult};
use crate::task::RepeatingTask;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// How often the device hands over buffered media
    pub timeslice: Duration,
    pub preferences: FormatPreferences,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            timeslice: Duration::from_millis(1000),
            preferences: FormatPreferences::default(),
        }
    }
}

struct ActiveCapture {
    format: MediaFormat,
    collector: JoinHandle<Vec<Bytes>>,
    ticker: RepeatingTask,
    started_at: Instant,
}

/// Drives the device's recording primitive and assembles the result
pub struct Recorder {
    config: RecorderConfig,
    urls: ObjectUrlRegistry,
    elapsed: Arc<AtomicU64>,
    active: Option<ActiveCapture>,
}

impl Recorder {
    pub fn new(config: RecorderConfig, urls: ObjectUrlRegistry) -> Self {
        Self {
            config,
            urls,
            elapsed: Arc::new(AtomicU64::new(0)),
            active: None,
        }
    }

    /// Negotiate a format and begin buffering slices from `handle`
    pub fn start(&mut self, handle: &mut dyn DeviceHandle) -> SessionResult<MediaFormat> {
        if self.active.is_some() {
            return Err(SessionError::Capture("recorder already running".to_string()));
        }

        let preferences = self.config.preferences.for_mode(handle.mode());
        let format = select_format(preferences, handle);

        let slices = handle
            .start_recording(&format, self.config.timeslice)
            .map_err(|e| SessionError::Capture(format!("{:#}", e)))?;

        self.elapsed.store(0, Ordering::SeqCst);
        let elapsed = Arc::clone(&self.elapsed);

        self.active = Some(ActiveCapture {
            format: format.clone(),
            collector: tokio::spawn(collect_slices(slices)),
            ticker: RepeatingTask::spawn("elapsed-tick", TICK, move || {
                elapsed.fetch_add(1, Ordering::SeqCst);
                ControlFlow::Continue(())
            }),
            started_at: Instant::now(),
        });

        info!("Recording started as {}", format.mime);

        Ok(format)
    }

    /// Flush all slices into one blob and mint its local URI
    ///
    /// Returns `None` when nothing is being recorded, so repeated stops are harmless.
    pub async fn stop(
        &mut self,
        handle: &mut dyn DeviceHandle,
    ) -> SessionResult<Option<Recording>> {
        let Some(mut active) = self.active.take() else {
            debug!("Stop ignored: recorder already finalized");
            return Ok(None);
        };

        active.ticker.cancel().await;
        handle.stop_recording();

        let slices = active
            .collector
            .await
            .map_err(|e| SessionError::Capture(format!("slice collector failed: {}", e)))?;

        let duration_seconds = active.started_at.elapsed().as_secs_f64();
        let data = finalize(&active.format, slices)
            .map_err(|e| SessionError::Capture(format!("{:#}", e)))?;

        let blob = Blob::new(data, active.format.mime.clone());
        let local_uri = self.urls.create(&blob);

        info!(
            "Recording finalized: {} bytes, {:.1}s, {}",
            blob.size(),
            duration_seconds,
            active.format.mime
        );

        Ok(Some(Recording {
            blob,
            duration_seconds,
            local_uri,
        }))
    }

    /// Discard everything captured so far
    pub async fn cancel(&mut self, handle: Option<&mut (dyn DeviceHandle + 'static)>) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        active.ticker.cancel().await;
        if let Some(handle) = handle {
            handle.stop_recording();
        }
        active.collector.abort();
        self.elapsed.store(0, Ordering::SeqCst);

        info!("Recording cancelled");
    }

    /// Synchronous teardown
    pub fn abort(&mut self) {
        if let Some(mut active) = self.active.take() {
            warn!("Aborting active recording");
            active.ticker.cancel_now();
            active.collector.abort();
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    pub fn reset_elapsed(&self) {
        self.elapsed.store(0, Ordering::SeqCst);
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn ticker_active(&self) -> bool {
        self.active
            .as_ref()
            .map(|a| a.ticker.is_active())
            .unwrap_or(false)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn collect_slices(mut rx: mpsc::UnboundedReceiver<Bytes>) -> Vec<Bytes> {
    let mut slices = Vec::new();

    while let Some(slice) = rx.recv().await {
        debug!("Buffered slice {} ({} bytes)", slices.len(), slice.len());
        slices.push(slice);
    }

    slices
}
