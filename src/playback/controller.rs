use anyhow::{bail, Result};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use super::element::{MediaElement, MediaEvent};
use super::time::format_time;

/// What the controller is playing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackSource {
    /// Freshly recorded blob behind a session-local URI
    Local { uri: String },
    /// Stored recording behind a short-lived download URI
    Remote { storage_key: String, uri: String },
}

impl PlaybackSource {
    pub fn uri(&self) -> &str {
        match self {
            PlaybackSource::Local { uri } | PlaybackSource::Remote { uri, .. } => uri,
        }
    }
}

/// Displayable transport state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackView {
    pub loaded: bool,
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub position: String,
    pub length: String,
    /// Fraction of the scrub bar filled, 0..=1
    pub progress: f64,
}

/// Thin projection of media element events into transport state
pub struct PlaybackController {
    element: Box<dyn MediaElement>,
    events: mpsc::UnboundedReceiver<MediaEvent>,
    source: Option<PlaybackSource>,
    is_playing: bool,
    current_time: f64,
    duration: f64,
    fallback_duration: Option<f64>,
}

impl PlaybackController {
    pub fn new(
        element: Box<dyn MediaElement>,
        events: mpsc::UnboundedReceiver<MediaEvent>,
    ) -> Self {
        Self {
            element,
            events,
            source: None,
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            fallback_duration: None,
        }
    }

    /// Point the element at `source`
    ///
    /// `fallback_duration` is used while the element reports no finite duration.
    pub fn load(&mut self, source: PlaybackSource, fallback_duration: Option<f64>) {
        self.unload();

        debug!("Loading playback source {}", source.uri());
        self.fallback_duration = fallback_duration.filter(|d| d.is_finite() && *d > 0.0);
        self.element.load(source.uri(), self.fallback_duration);
        self.duration = self.fallback_duration.unwrap_or(0.0);
        self.source = Some(source);
    }

    /// Detach the source and forget all transport state
    pub fn unload(&mut self) {
        if self.source.is_some() {
            self.element.unload();
        }
        while self.events.try_recv().is_ok() {}

        self.source = None;
        self.is_playing = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.fallback_duration = None;
    }

    pub fn source(&self) -> Option<&PlaybackSource> {
        self.source.as_ref()
    }

    pub fn toggle_play(&mut self) -> Result<()> {
        self.pump();

        if self.source.is_none() {
            bail!("Nothing loaded for playback");
        }

        if self.is_playing {
            self.element.pause();
            self.is_playing = false;
        } else {
            self.element.play()?;
            self.is_playing = true;
        }

        Ok(())
    }

    /// Jump by `delta` seconds, clamped to `[0, duration]`
    pub fn seek_relative(&mut self, delta: f64) {
        self.pump();

        if self.source.is_none() || !delta.is_finite() {
            return;
        }

        let target = self.current_time + delta;
        let target = if self.duration > 0.0 {
            target.clamp(0.0, self.duration)
        } else {
            target.max(0.0)
        };

        self.seek(target);
    }

    /// Jump to a fraction of the duration, e.g. from a pointer on the scrub bar
    pub fn seek_to_fraction(&mut self, fraction: f64) {
        self.pump();

        if self.source.is_none() || self.duration <= 0.0 || !fraction.is_finite() {
            return;
        }

        self.seek(fraction.clamp(0.0, 1.0) * self.duration);
    }

    fn seek(&mut self, target: f64) {
        self.element.seek(target);
        self.current_time = target;
    }

    /// Apply every event the element has emitted so far
    pub fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
        }
    }

    pub fn apply(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::LoadedMetadata { duration } | MediaEvent::DurationChange { duration } => {
                self.duration = if duration.is_finite() && duration > 0.0 {
                    duration
                } else {
                    self.fallback_duration.unwrap_or(0.0)
                };
            }
            MediaEvent::TimeUpdate { current_time } => {
                if current_time.is_finite() {
                    self.current_time = if self.duration > 0.0 {
                        current_time.clamp(0.0, self.duration)
                    } else {
                        current_time.max(0.0)
                    };
                }
            }
            MediaEvent::Play => self.is_playing = true,
            MediaEvent::Pause => self.is_playing = false,
            MediaEvent::Ended => {
                self.is_playing = false;
                self.current_time = self.duration;
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn view(&mut self) -> PlaybackView {
        self.pump();

        let progress = if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };

        PlaybackView {
            loaded: self.source.is_some(),
            is_playing: self.is_playing,
            current_time: self.current_time,
            duration: self.duration,
            position: format_time(self.current_time),
            length: format_time(self.duration),
            progress,
        }
    }
}
