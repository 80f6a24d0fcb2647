// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google service-account key loading.

use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use tally_config::model::MirrorConfig;
use tally_core::TallyError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The fields of a service-account JSON key that the JWT-bearer grant needs.
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: SecretString,
    pub private_key_id: Option<String>,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct RawKey {
    #[serde(rename = "type")]
    kind: Option<String>,
    client_email: String,
    private_key: String,
    private_key_id: Option<String>,
    token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, TallyError> {
        let raw: RawKey = serde_json::from_str(json).map_err(|e| TallyError::Mirror {
            message: format!("invalid service account credentials: {e}"),
            source: Some(Box::new(e)),
        })?;

        if let Some(kind) = raw.kind.as_deref()
            && kind != "service_account"
        {
            return Err(TallyError::Mirror {
                message: format!("credentials are of type `{kind}`, expected `service_account`"),
                source: None,
            });
        }

        Ok(Self {
            client_email: raw.client_email,
            private_key: SecretString::from(raw.private_key),
            private_key_id: raw.private_key_id,
            token_uri: raw
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, TallyError> {
        let json = std::fs::read_to_string(path).map_err(|e| TallyError::Mirror {
            message: format!("failed to read credentials file {}: {e}", path.display()),
            source: Some(Box::new(e)),
        })?;
        Self::from_json(&json)
    }

    /// Inline JSON wins over a file path.
    pub fn from_config(config: &MirrorConfig) -> Result<Self, TallyError> {
        if let Some(json) = config.credentials_json.as_deref() {
            return Self::from_json(json);
        }
        if let Some(path) = config.credentials_file.as_deref() {
            return Self::from_file(Path::new(path));
        }
        Err(TallyError::Config(
            "mirror credentials are not configured (mirror.credentials_json or mirror.credentials_file)"
                .to_string(),
        ))
    }
}
