use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::recorder::Blob;

/// Time-limited upload target handed out by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDestination {
    pub destination_uri: String,
    pub storage_key: String,
}

/// Record a stored recording can be attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerRecord {
    StarStory(String),
    PracticeQuestion(String),
}

impl fmt::Display for OwnerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerRecord::StarStory(id) => write!(f, "STAR story {}", id),
            OwnerRecord::PracticeQuestion(id) => write!(f, "practice question {}", id),
        }
    }
}

/// What an upload is about and where it gets attached
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadBinding {
    /// Free-form question context sent with every backend call
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub owner: Option<OwnerRecord>,
}

/// Durable pointer to an uploaded recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteReference {
    pub storage_key: String,
    pub binding: UploadBinding,
    /// Recorded length, used while the streamed media reports none
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

/// Backend operations on stored recordings
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    async fn request_upload_destination(
        &self,
        file_name: &str,
        content_type: &str,
        context: &str,
    ) -> Result<UploadDestination>;

    async fn persist_reference(&self, storage_key: &str, owner: &OwnerRecord) -> Result<()>;

    /// Short-lived URI the recording can be streamed from
    async fn resolve_download_uri(&self, storage_key: &str) -> Result<String>;

    async fn delete_recording(&self, storage_key: &str, context: &str) -> Result<()>;
}

/// Direct transfer of a blob to an upload destination
#[async_trait::async_trait]
pub trait BlobTransport: Send + Sync {
    async fn put(&self, destination_uri: &str, blob: &Blob, content_type: &str) -> Result<()>;
}
