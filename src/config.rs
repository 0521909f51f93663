use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::device::CaptureMode;
use crate::recorder::{FormatPreferences, DEFAULT_AUDIO_FORMATS, DEFAULT_VIDEO_FORMATS};
use crate::session::SessionConfig;
use crate::upload::{UploadBinding, DEFAULT_MAX_UPLOAD_BYTES};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub default_mode: CaptureMode,
    /// WAV file replayed as the microphone
    pub input: Option<PathBuf>,
    pub timeslice_ms: u64,
    pub meter_interval_ms: u64,
    pub max_upload_bytes: u64,
    pub video_formats: Vec<String>,
    pub audio_formats: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_mode: CaptureMode::Video,
            input: None,
            timeslice_ms: 1000,
            meter_interval_ms: 16,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            video_formats: DEFAULT_VIDEO_FORMATS.iter().map(|s| s.to_string()).collect(),
            audio_formats: DEFAULT_AUDIO_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CaptureConfig {
    /// Session settings for a new session bound to `binding`
    pub fn session_config(
        &self,
        mode: Option<CaptureMode>,
        binding: UploadBinding,
    ) -> SessionConfig {
        SessionConfig {
            mode: mode.unwrap_or(self.default_mode),
            binding,
            timeslice: Duration::from_millis(self.timeslice_ms),
            meter_interval: Duration::from_millis(self.meter_interval_ms),
            max_upload_bytes: self.max_upload_bytes,
            preferences: FormatPreferences {
                video: self.video_formats.clone(),
                audio: self.audio_formats.clone(),
            },
            ..SessionConfig::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Transfers of large recordings get their own, longer timeout
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_secs: u64,
    pub token: Option<String>,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_transfer_timeout() -> u64 {
    600
}

impl Config {
    /// Load `path` (extension optional) with `PRACTICE_CAPTURE__*` overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("PRACTICE_CAPTURE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
