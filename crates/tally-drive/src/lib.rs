// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Drive remote mirror for Tally.
//!
//! Keeps a copy of the SQLite database as a single file in a Drive folder,
//! authenticating as a service account.

pub mod auth;
pub mod client;
pub mod credentials;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tally_config::model::MirrorConfig;
use tally_core::{AdapterType, HealthStatus, PluginAdapter, RemoteMirror, TallyError};
use tokio::sync::OnceCell;
use tracing::info;

pub use auth::{ServiceAccountAuth, StaticToken, TokenProvider};
pub use client::DriveClient;
pub use credentials::ServiceAccountKey;

/// Drive-backed [`RemoteMirror`].
///
/// Nothing touches the network until [`RemoteMirror::authenticate`] runs.
pub struct DriveMirror {
    config: MirrorConfig,
    client: OnceCell<DriveClient>,
}

impl DriveMirror {
    pub fn new(config: MirrorConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Wraps an already configured client.
    pub fn with_client(client: DriveClient) -> Self {
        Self {
            config: MirrorConfig::default(),
            client: OnceCell::new_with(Some(client)),
        }
    }

    fn client(&self) -> Result<&DriveClient, TallyError> {
        self.client.get().ok_or_else(|| TallyError::Mirror {
            message: "mirror not authenticated -- call authenticate() first".to_string(),
            source: None,
        })
    }

    fn build_client(&self) -> Result<DriveClient, TallyError> {
        let folder_id = self.config.folder_id.clone().ok_or_else(|| {
            TallyError::Config("mirror.folder_id is required when the mirror is enabled".to_string())
        })?;
        let key = ServiceAccountKey::from_config(&self.config)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| TallyError::Mirror {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        let auth = ServiceAccountAuth::new(&key, http.clone())?;
        info!(account = %key.client_email, "using Drive service account");

        Ok(DriveClient::new(http, Arc::new(auth), folder_id))
    }
}

#[async_trait]
impl PluginAdapter for DriveMirror {
    fn name(&self) -> &str {
        "google-drive"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mirror
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        let Ok(client) = self.client() else {
            return Ok(HealthStatus::Unhealthy("not authenticated".to_string()));
        };
        match client.auth().access_token().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Degraded(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        Ok(())
    }
}

#[async_trait]
impl RemoteMirror for DriveMirror {
    async fn authenticate(&self) -> Result<(), TallyError> {
        let client = self
            .client
            .get_or_try_init(|| async { self.build_client() })
            .await?;
        client.auth().access_token().await?;
        info!(folder = %client.folder_id(), "authenticated with Google Drive");
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<String>, TallyError> {
        self.client()?.find_by_name(name).await
    }

    async fn download(&self, id: &str, dest: &Path) -> Result<(), TallyError> {
        self.client()?.download(id, dest).await
    }

    async fn upload(
        &self,
        source: &Path,
        name: &str,
        existing_id: Option<&str>,
    ) -> Result<String, TallyError> {
        let client = self.client()?;
        match existing_id {
            Some(id) => client.update_media(id, source).await,
            None => {
                let id = client.create(name).await?;
                client.update_media(&id, source).await
            }
        }
    }
}
