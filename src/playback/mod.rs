//! Playback Controller
//!
//! Transport over a local or remote recording. The controller never polls: its state
//! is whatever the media element last reported through `MediaEvent`s.

mod controller;
mod element;
mod time;

pub use controller::{PlaybackController, PlaybackSource, PlaybackView};
pub use element::{MediaElement, MediaEvent, VirtualMediaElement};
pub use time::format_time;
