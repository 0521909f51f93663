use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::meter::LevelMeter;
use super::source::{CaptureMode, DeviceHandle, DeviceSource, PreviewSurface};
use crate::error::DeviceError;

/// Owns the device handle and the level meter attached to it
pub struct DeviceSessionManager {
    source: Arc<dyn DeviceSource>,
    preview: Option<Arc<dyn PreviewSurface>>,
    meter_interval: Duration,
    handle: Option<Box<dyn DeviceHandle>>,
    meter: Option<LevelMeter>,
}

impl DeviceSessionManager {
    pub fn new(
        source: Arc<dyn DeviceSource>,
        preview: Option<Arc<dyn PreviewSurface>>,
        meter_interval: Duration,
    ) -> Self {
        Self {
            source,
            preview,
            meter_interval,
            handle: None,
            meter: None,
        }
    }

    /// Acquire devices for `mode`, releasing any handle already held
    pub async fn acquire(&mut self, mode: CaptureMode) -> Result<(), DeviceError> {
        if self.handle.is_some() {
            self.release().await;
        }

        info!("Acquiring {} devices from {}", mode, self.source.name());

        let handle = match self.source.acquire(mode).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Device acquisition failed: {}", e);
                return Err(e);
            }
        };

        if mode == CaptureMode::Video {
            if let Some(preview) = &self.preview {
                preview.attach(handle.stream_id());
            }
        }

        self.meter = handle
            .analyser()
            .map(|analyser| LevelMeter::start(analyser, self.meter_interval));
        self.handle = Some(handle);

        info!("Devices acquired ({} live tracks)", self.live_tracks());

        Ok(())
    }

    /// Stop all tracks, cancel the meter and detach the preview
    pub async fn release(&mut self) {
        if let Some(meter) = self.meter.take() {
            meter.stop().await;
        }
        self.release_handle();
    }

    /// Synchronous release for teardown paths that cannot await
    pub fn release_now(&mut self) {
        if let Some(meter) = self.meter.take() {
            meter.stop_now();
        }
        self.release_handle();
    }

    fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop_recording();
            handle.stop_tracks();

            if handle.mode() == CaptureMode::Video {
                if let Some(preview) = &self.preview {
                    preview.detach();
                }
            }

            info!("Devices released");
        }
    }

    pub fn is_held(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle_mut(&mut self) -> Option<&mut (dyn DeviceHandle + 'static)> {
        self.handle.as_deref_mut()
    }

    /// Current speaking level (0-100), 0 when no meter runs
    pub fn audio_level(&self) -> u8 {
        self.meter.as_ref().map(|m| m.level()).unwrap_or(0)
    }

    pub fn live_tracks(&self) -> usize {
        self.handle.as_ref().map(|h| h.live_tracks()).unwrap_or(0)
    }

    pub fn meter_active(&self) -> bool {
        self.meter.as_ref().map(|m| m.is_active()).unwrap_or(false)
    }
}

impl Drop for DeviceSessionManager {
    fn drop(&mut self) {
        self.release_now();
    }
}
