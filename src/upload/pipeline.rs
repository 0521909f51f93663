use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info, warn};

use super::collaborators::{BlobTransport, RemoteReference, RemoteStore, UploadBinding};
use crate::error::{SessionError, SessionResult};
use crate::recorder::{extension_for, Recording};

/// 100 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

pub const PROGRESS_DESTINATION: u8 = 20;
pub const PROGRESS_TRANSFERRED: u8 = 70;
pub const PROGRESS_DONE: u8 = 100;

/// Sends a finished recording to the backend
///
/// Steps run strictly in sequence: destination request, direct transfer, then
/// persistence against the owner record (skipped when the binding has no owner).
/// Progress is coarse because the transfer exposes no byte-level events.
pub struct UploadPipeline {
    store: Arc<dyn RemoteStore>,
    transport: Arc<dyn BlobTransport>,
    max_bytes: u64,
}

impl UploadPipeline {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        transport: Arc<dyn BlobTransport>,
        max_bytes: u64,
    ) -> Self {
        Self {
            store,
            transport,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Fails with `TooLarge` before any network call if the blob exceeds the ceiling
    pub fn check_size(&self, recording: &Recording) -> SessionResult<()> {
        let size = recording.blob.size();
        if size > self.max_bytes {
            warn!("Recording of {} bytes exceeds upload limit {}", size, self.max_bytes);
            return Err(SessionError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    pub async fn upload<P>(
        &self,
        recording: &Recording,
        binding: &UploadBinding,
        mut progress: P,
    ) -> SessionResult<RemoteReference>
    where
        P: FnMut(u8) + Send,
    {
        self.check_size(recording)?;

        let content_type = recording.blob.mime.as_str();
        let file_name = format!(
            "practice-{}.{}",
            Utc::now().format("%Y%m%d-%H%M%S"),
            extension_for(content_type)
        );

        info!("Uploading {} ({} bytes)", file_name, recording.blob.size());

        let result: anyhow::Result<String> = async {
            let destination = self
                .store
                .request_upload_destination(&file_name, content_type, &binding.context)
                .await
                .context("Failed to get upload destination")?;
            progress(PROGRESS_DESTINATION);

            self.transport
                .put(&destination.destination_uri, &recording.blob, content_type)
                .await
                .context("Failed to transfer recording")?;
            progress(PROGRESS_TRANSFERRED);

            if let Some(owner) = &binding.owner {
                self.store
                    .persist_reference(&destination.storage_key, owner)
                    .await
                    .with_context(|| format!("Failed to attach recording to {}", owner))?;
            }
            progress(PROGRESS_DONE);

            Ok(destination.storage_key)
        }
        .await;

        match result {
            Ok(storage_key) => {
                info!("Upload complete: {}", storage_key);
                Ok(RemoteReference {
                    storage_key,
                    binding: binding.clone(),
                    duration_seconds: Some(recording.duration_seconds),
                })
            }
            Err(e) => {
                error!("Upload failed: {:#}", e);
                Err(SessionError::UploadFailed(e))
            }
        }
    }
}
