//! Google Drive v3 REST implementation of [`DriveBackend`].

use super::{DriveBackend, Media, RemoteFolder, UploadMetadata, FOLDER_MIME_TYPE};
use crate::config::DriveConfig;
use crate::transfer::progress::UploadProgress;
use crate::transfer::progress_stream::ProgressStream;
use crate::{BackupError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::debug;

const LIST_PAGE_SIZE: &str = "1000";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderPage {
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<RemoteFolder>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// Authorized Drive client.
#[derive(Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    api_base_url: String,
    upload_base_url: String,
    access_token: String,
}

impl DriveClient {
    pub fn new(config: &DriveConfig, access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    async fn created_id(response: reqwest::Response, what: &str) -> Result<String> {
        let response = check_status(response, what).await?;
        let created: CreatedFile = response
            .json()
            .await
            .map_err(|e| BackupError::Backend(format!("{}: unexpected response: {}", what, e)))?;
        Ok(created.id)
    }
}

/// Turn a non-2xx response into a backend error carrying the response text.
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    Err(BackupError::Backend(format!("{} failed with status {}: {}", what, status, text)))
}

fn request_error(what: &str, err: reqwest::Error) -> BackupError {
    BackupError::Backend(format!("{} request failed: {}", what, err))
}

fn folder_metadata(name: &str, parent_id: Option<&str>) -> serde_json::Value {
    let mut metadata = json!({
        "name": name,
        "mimeType": FOLDER_MIME_TYPE,
    });
    if let Some(parent) = parent_id {
        metadata["parents"] = json!([parent]);
    }
    metadata
}

fn file_metadata(metadata: &UploadMetadata, parent_id: Option<&str>) -> serde_json::Value {
    let mut value = json!({ "name": metadata.name });
    if let Some(parent) = parent_id {
        value["parents"] = json!([parent]);
    }
    value
}

/// Opening and closing parts of a multipart/related upload body; the media
/// bytes go between them.
fn multipart_envelope(boundary: &str, metadata: &serde_json::Value, mime_type: &str) -> (Bytes, Bytes) {
    let head = format!(
        "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
        b = boundary,
        m = metadata,
        t = mime_type,
    );
    let tail = format!("\r\n--{}--\r\n", boundary);
    (Bytes::from(head), Bytes::from(tail))
}

#[async_trait]
impl DriveBackend for DriveClient {
    async fn list_folders(&self) -> Result<Vec<RemoteFolder>> {
        let url = format!("{}/files", self.api_base_url);
        let query = format!("mimeType='{}'", FOLDER_MIME_TYPE);
        let mut folders = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", "nextPageToken, files(id, name, trashed)"),
                ("pageSize", LIST_PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&params)
                .send()
                .await
                .map_err(|e| request_error("List folders", e))?;
            let page: FolderPage = check_status(response, "List folders")
                .await?
                .json()
                .await
                .map_err(|e| BackupError::Backend(format!("List folders: unexpected response: {}", e)))?;

            debug!("Listed {} folders", page.files.len());
            folders.extend(page.files);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(folders)
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<String> {
        let url = format!("{}/files", self.api_base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("fields", "id")])
            .json(&folder_metadata(name, parent_id))
            .send()
            .await
            .map_err(|e| request_error("Create folder", e))?;

        Self::created_id(response, "Create folder").await
    }

    async fn create_file(
        &self,
        metadata: &UploadMetadata,
        media: &Media,
        parent_id: Option<&str>,
    ) -> Result<String> {
        let file = tokio::fs::File::open(&media.path).await.map_err(|e| {
            BackupError::Backend(format!("cannot open {}: {}", media.path.display(), e))
        })?;
        let size = file.metadata().await?.len();

        let boundary = format!("drive-backup-{}", uuid::Uuid::new_v4().simple());
        let (head, tail) = multipart_envelope(
            &boundary,
            &file_metadata(metadata, parent_id),
            &media.mime_type,
        );
        let content_length = head.len() as u64 + size + tail.len() as u64;

        let media_stream = ProgressStream::new(
            ReaderStream::new(file),
            UploadProgress::new(metadata.name.clone(), size),
        );

        let body = stream::iter(vec![Ok::<Bytes, std::io::Error>(head)])
            .chain(media_stream)
            .chain(stream::iter(vec![Ok(tail)]));

        let url = format!("{}/files", self.upload_base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(CONTENT_TYPE, format!("multipart/related; boundary={}", boundary))
            .header(CONTENT_LENGTH, content_length)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| request_error("Upload", e))?;

        Self::created_id(response, "Upload").await
    }
}
