use std::io::Cursor;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::recorder::ObjectUrlRegistry;
use crate::task::RepeatingTask;

/// Native notifications from a media element
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata { duration: f64 },
    DurationChange { duration: f64 },
    TimeUpdate { current_time: f64 },
    Play,
    Pause,
    Ended,
}

/// Something that can play a URI and reports back through `MediaEvent`s
pub trait MediaElement: Send {
    /// Start loading `uri`
    ///
    /// `fallback_duration` marks the end of media that reports no finite duration.
    fn load(&mut self, uri: &str, fallback_duration: Option<f64>);
    fn unload(&mut self);
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
}

const TIME_UPDATE_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Default)]
struct Clock {
    loaded: bool,
    position: f64,
    /// Where playback stops: the real duration, else the fallback
    end: f64,
    playing_since: Option<Instant>,
}

impl Clock {
    fn current(&self) -> f64 {
        let position = match self.playing_since {
            Some(since) => self.position + since.elapsed().as_secs_f64(),
            None => self.position,
        };
        position.min(self.end)
    }
}

/// Headless element driven by the tokio clock
///
/// Local WAV blobs report their real duration; anything else reports an
/// unknown (infinite) duration, as a browser does for streamed webm, and ends
/// at the fallback duration given on load.
pub struct VirtualMediaElement {
    urls: ObjectUrlRegistry,
    events: mpsc::UnboundedSender<MediaEvent>,
    clock: Arc<Mutex<Clock>>,
    ticker: Option<RepeatingTask>,
}

impl VirtualMediaElement {
    pub fn new(urls: ObjectUrlRegistry) -> (Self, mpsc::UnboundedReceiver<MediaEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let element = Self {
            urls,
            events,
            clock: Arc::new(Mutex::new(Clock::default())),
            ticker: None,
        };
        (element, rx)
    }

    fn probe_duration(&self, uri: &str) -> f64 {
        let Some(blob) = self.urls.resolve(uri) else {
            return f64::INFINITY;
        };

        if !blob.mime.starts_with("audio/wav") {
            return f64::INFINITY;
        }

        match hound::WavReader::new(Cursor::new(blob.data.to_vec())) {
            Ok(reader) => reader.duration() as f64 / reader.spec().sample_rate as f64,
            Err(e) => {
                debug!("Could not probe WAV duration: {}", e);
                f64::INFINITY
            }
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel_now();
        }
    }

    fn emit(&self, event: MediaEvent) {
        let _ = self.events.send(event);
    }
}

impl MediaElement for VirtualMediaElement {
    fn load(&mut self, uri: &str, fallback_duration: Option<f64>) {
        self.stop_ticker();

        let duration = self.probe_duration(uri);
        let end = if duration.is_finite() {
            duration
        } else {
            fallback_duration
                .filter(|d| d.is_finite() && *d >= 0.0)
                .unwrap_or(f64::INFINITY)
        };
        *self.clock.lock() = Clock {
            loaded: true,
            position: 0.0,
            end,
            playing_since: None,
        };

        self.emit(MediaEvent::LoadedMetadata { duration });
    }

    fn unload(&mut self) {
        self.stop_ticker();
        *self.clock.lock() = Clock::default();
    }

    fn play(&mut self) -> Result<()> {
        {
            let mut clock = self.clock.lock();
            if !clock.loaded {
                bail!("No media loaded");
            }
            if clock.playing_since.is_some() {
                return Ok(());
            }
            if clock.position >= clock.end {
                clock.position = 0.0;
            }
            clock.playing_since = Some(Instant::now());
        }
        self.emit(MediaEvent::Play);

        let clock = Arc::clone(&self.clock);
        let events = self.events.clone();
        self.ticker = Some(RepeatingTask::spawn(
            "playback-clock",
            TIME_UPDATE_INTERVAL,
            move || {
                let mut clock = clock.lock();
                let current = clock.current();

                if current >= clock.end {
                    clock.position = clock.end;
                    clock.playing_since = None;
                    let _ = events.send(MediaEvent::TimeUpdate {
                        current_time: current,
                    });
                    let _ = events.send(MediaEvent::Ended);
                    return ControlFlow::Break(());
                }

                let _ = events.send(MediaEvent::TimeUpdate {
                    current_time: current,
                });
                ControlFlow::Continue(())
            },
        ));

        Ok(())
    }

    fn pause(&mut self) {
        self.stop_ticker();
        {
            let mut clock = self.clock.lock();
            clock.position = clock.current();
            clock.playing_since = None;
        }
        self.emit(MediaEvent::Pause);
    }

    fn seek(&mut self, seconds: f64) {
        let current_time = {
            let mut clock = self.clock.lock();
            clock.position = seconds.clamp(0.0, clock.end);
            if clock.playing_since.is_some() {
                clock.playing_since = Some(Instant::now());
            }
            clock.position
        };
        self.emit(MediaEvent::TimeUpdate { current_time });
    }
}

impl Drop for VirtualMediaElement {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
