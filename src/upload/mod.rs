//! Upload Pipeline
//!
//! Moves a finished recording to backend storage and attaches it to its owner record.

mod collaborators;
mod http;
mod pipeline;

pub use collaborators::{
    BlobTransport, OwnerRecord, RemoteReference, RemoteStore, UploadBinding, UploadDestination,
};
pub use http::{HttpBlobTransport, HttpRemoteStore};
pub use pipeline::{
    UploadPipeline, DEFAULT_MAX_UPLOAD_BYTES, PROGRESS_DESTINATION, PROGRESS_DONE,
    PROGRESS_TRANSFERRED,
};
