//! Backend collaborators over HTTP
//!
//! - `POST {base}/recordings/upload-url` - pre-signed destination + storage key
//! - `PUT {base}/star-stories/{id}/recording` - attach to a STAR story
//! - `PUT {base}/practice-questions/{id}/recording` - attach to a practice question
//! - `GET {base}/recordings/download-url?key=` - short-lived playback URI
//! - `DELETE {base}/recordings?key=&context=` - remove a stored recording

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::collaborators::{BlobTransport, OwnerRecord, RemoteStore, UploadDestination};
use crate::recorder::Blob;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlRequest<'a> {
    file_name: &'a str,
    content_type: &'a str,
    context: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlResponse {
    upload_url: String,
    key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AttachRecordingRequest<'a> {
    recording_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct DownloadUrlResponse {
    url: String,
}

pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemoteStore {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        token: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait::async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn request_upload_destination(
        &self,
        file_name: &str,
        content_type: &str,
        context: &str,
    ) -> Result<UploadDestination> {
        let body = UploadUrlRequest {
            file_name,
            content_type,
            context,
        };

        let response: UploadUrlResponse = self
            .authorized(self.client.post(self.url("/recordings/upload-url")))
            .json(&body)
            .send()
            .await
            .context("Upload URL request failed")?
            .error_for_status()
            .context("Upload URL request rejected")?
            .json()
            .await
            .context("Invalid upload URL response")?;

        debug!("Got upload destination for key {}", response.key);

        Ok(UploadDestination {
            destination_uri: response.upload_url,
            storage_key: response.key,
        })
    }

    async fn persist_reference(&self, storage_key: &str, owner: &OwnerRecord) -> Result<()> {
        let path = match owner {
            OwnerRecord::StarStory(id) => format!("/star-stories/{}/recording", id),
            OwnerRecord::PracticeQuestion(id) => format!("/practice-questions/{}/recording", id),
        };

        self.authorized(self.client.put(self.url(&path)))
            .json(&AttachRecordingRequest {
                recording_key: storage_key,
            })
            .send()
            .await
            .context("Attach request failed")?
            .error_for_status()
            .context("Attach request rejected")?;

        Ok(())
    }

    async fn resolve_download_uri(&self, storage_key: &str) -> Result<String> {
        let response: DownloadUrlResponse = self
            .authorized(self.client.get(self.url("/recordings/download-url")))
            .query(&[("key", storage_key)])
            .send()
            .await
            .context("Download URL request failed")?
            .error_for_status()
            .context("Download URL request rejected")?
            .json()
            .await
            .context("Invalid download URL response")?;

        Ok(response.url)
    }

    async fn delete_recording(&self, storage_key: &str, context: &str) -> Result<()> {
        self.authorized(self.client.delete(self.url("/recordings")))
            .query(&[("key", storage_key), ("context", context)])
            .send()
            .await
            .context("Delete request failed")?
            .error_for_status()
            .context("Delete request rejected")?;

        Ok(())
    }
}

/// Direct PUT of the blob to a pre-signed destination
pub struct HttpBlobTransport {
    client: Client,
}

impl HttpBlobTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl BlobTransport for HttpBlobTransport {
    async fn put(&self, destination_uri: &str, blob: &Blob, content_type: &str) -> Result<()> {
        debug!("PUT {} bytes to destination", blob.size());

        self.client
            .put(destination_uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(blob.data.clone())
            .send()
            .await
            .context("Transfer request failed")?
            .error_for_status()
            .context("Transfer rejected by destination")?;

        Ok(())
    }
}
