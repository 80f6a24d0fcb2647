// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal Drive v3 REST client: list by name, download, create, update.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tally_core::TallyError;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::auth::TokenProvider;

const API_BASE_URL: &str = "https://www.googleapis.com";

/// MIME type stored on uploaded database files.
pub const SQLITE_MIME: &str = "application/x-sqlite3";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: String,
}

/// Drive client scoped to one parent folder.
#[derive(Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    auth: Arc<dyn TokenProvider>,
    folder_id: String,
    base_url: String,
}

impl DriveClient {
    pub fn new(
        http: reqwest::Client,
        auth: Arc<dyn TokenProvider>,
        folder_id: impl Into<String>,
    ) -> Self {
        Self {
            http,
            auth,
            folder_id: folder_id.into(),
            base_url: API_BASE_URL.to_string(),
        }
    }

    /// Overrides the API host (for testing with wiremock).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    pub(crate) fn auth(&self) -> &Arc<dyn TokenProvider> {
        &self.auth
    }

    /// The id of the first non-trashed file named `name` in the folder.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<String>, TallyError> {
        let query = format!(
            "'{}' in parents and name = '{}' and trashed = false",
            escape_query(&self.folder_id),
            escape_query(name)
        );
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .get(format!("{}/drive/v3/files", self.base_url))
            .bearer_auth(token.expose_secret())
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("spaces", "drive"),
                ("pageSize", "10"),
            ])
            .send()
            .await
            .map_err(request_failed)?;

        let list: FileList = check(response, "list files")
            .await?
            .json()
            .await
            .map_err(|e| TallyError::Mirror {
                message: format!("invalid file list response: {e}"),
                source: Some(Box::new(e)),
            })?;

        if list.files.len() > 1 {
            debug!(name, count = list.files.len(), "several remote files share a name, using the first");
        }
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    /// Streams the content of `id` to `dest`, replacing it atomically.
    pub async fn download(&self, id: &str, dest: &Path) -> Result<(), TallyError> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .get(format!("{}/drive/v3/files/{id}", self.base_url))
            .bearer_auth(token.expose_secret())
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(request_failed)?;
        let response = check(response, "download").await?;

        let partial = partial_path(dest);
        let mut file = tokio::fs::File::create(&partial).await.map_err(io_failed)?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(request_failed)?;
            file.write_all(&chunk).await.map_err(io_failed)?;
        }
        file.flush().await.map_err(io_failed)?;
        drop(file);

        tokio::fs::rename(&partial, dest).await.map_err(io_failed)?;
        Ok(())
    }

    /// Replaces the content of `id`. A missing file surfaces as `NotFound`.
    pub async fn update_media(&self, id: &str, source: &Path) -> Result<String, TallyError> {
        let bytes = tokio::fs::read(source).await.map_err(io_failed)?;
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .patch(format!("{}/upload/drive/v3/files/{id}", self.base_url))
            .bearer_auth(token.expose_secret())
            .query(&[("uploadType", "media")])
            .header(reqwest::header::CONTENT_TYPE, SQLITE_MIME)
            .timeout(Duration::from_secs(300))
            .body(bytes)
            .send()
            .await
            .map_err(request_failed)?;

        let file: FileRef = check(response, "upload")
            .await?
            .json()
            .await
            .map_err(|e| TallyError::Mirror {
                message: format!("invalid upload response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(file.id)
    }

    /// Creates an empty file named `name` in the folder and returns its id.
    pub async fn create(&self, name: &str) -> Result<String, TallyError> {
        let token = self.auth.access_token().await?;
        let metadata = serde_json::json!({
            "name": name,
            "parents": [self.folder_id],
            "mimeType": SQLITE_MIME,
        });
        let response = self
            .http
            .post(format!("{}/drive/v3/files", self.base_url))
            .bearer_auth(token.expose_secret())
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await
            .map_err(request_failed)?;

        let file: FileRef = check(response, "create")
            .await?
            .json()
            .await
            .map_err(|e| TallyError::Mirror {
                message: format!("invalid create response: {e}"),
                source: Some(Box::new(e)),
            })?;
        debug!(name, id = %file.id, "created remote file");
        Ok(file.id)
    }
}

/// Maps non-success statuses to errors; 404 becomes `NotFound`.
async fn check(response: Response, op: &str) -> Result<Response, TallyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(TallyError::NotFound(format!("drive {op}: {body}")));
    }
    Err(TallyError::Mirror {
        message: format!("drive {op} returned {status}: {body}"),
        source: None,
    })
}

fn request_failed(e: reqwest::Error) -> TallyError {
    TallyError::Mirror {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

fn io_failed(e: std::io::Error) -> TallyError {
    TallyError::Mirror {
        message: format!("local file error: {e}"),
        source: Some(Box::new(e)),
    }
}

fn partial_path(dest: &Path) -> std::path::PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    name.push(".part");
    dest.with_file_name(name)
}

/// Escapes a literal for a Drive `q` expression.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
