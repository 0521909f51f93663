pub mod config;
pub mod device;
pub mod error;
pub mod http;
pub mod playback;
pub mod recorder;
pub mod session;
pub mod task;
pub mod upload;

pub use config::Config;
pub use device::{
    Analyser, CaptureMode, DeviceHandle, DeviceSessionManager, DeviceSource, FileDeviceSource,
    MediaFormat, PreviewSurface,
};
pub use error::{DeviceError, SessionError, SessionResult};
pub use http::{create_router, AppState};
pub use playback::{format_time, MediaElement, MediaEvent, PlaybackController, PlaybackSource};
pub use recorder::{Blob, ObjectUrlRegistry, Recording};
pub use session::{CaptureSession, Collaborators, SessionConfig, SessionSnapshot, SessionState};
pub use upload::{
    BlobTransport, HttpBlobTransport, HttpRemoteStore, OwnerRecord, RemoteReference, RemoteStore,
    UploadBinding, UploadPipeline,
};
