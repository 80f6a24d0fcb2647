// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tally counter bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

const REDACTED: &str = "<redacted>";

/// Top-level Tally configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    /// Process-wide behaviour.
    #[serde(default)]
    pub bot: BotConfig,

    /// Discord gateway settings.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Local SQLite store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote mirror (Google Drive) settings.
    #[serde(default)]
    pub mirror: MirrorConfig,

    /// Liveness HTTP endpoint settings.
    #[serde(default)]
    pub health: HealthConfig,

    /// Interactive presentation settings.
    #[serde(default)]
    pub views: ViewsConfig,
}

impl TallyConfig {
    /// A copy safe to print: every secret value is replaced.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.discord.token.is_some() {
            copy.discord.token = Some(REDACTED.to_string());
        }
        if copy.mirror.credentials_json.is_some() {
            copy.mirror.credentials_json = Some(REDACTED.to_string());
        }
        copy
    }

    /// Render the effective configuration as TOML with secrets redacted.
    pub fn to_redacted_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&self.redacted())
    }
}

/// Operating mode: how much diagnostic detail reaches end users.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperatingMode {
    /// Full error detail is shown to the requester.
    #[default]
    Development,
    /// Only a generic apology is shown; detail is logged.
    Production,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    #[serde(default)]
    pub mode: OperatingMode,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    /// Bot token. Required by `serve`.
    #[serde(default)]
    pub token: Option<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "counters.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Remote mirror configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorConfig {
    /// Disable to run without a remote backup.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Drive folder that holds the database file.
    #[serde(default)]
    pub folder_id: Option<String>,

    /// Service-account key as an inline JSON string.
    #[serde(default)]
    pub credentials_json: Option<String>,

    /// Path to a service-account key file. Ignored if `credentials_json` is set.
    #[serde(default)]
    pub credentials_file: Option<String>,

    /// Remote file name. Defaults to the file name of `storage.database_path`.
    #[serde(default)]
    pub remote_name: Option<String>,

    /// Seconds between dirty-flag checks.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            folder_id: None,
            credentials_json: None,
            credentials_file: None,
            remote_name: None,
            sync_interval_secs: default_sync_interval_secs(),
        }
    }
}

impl MirrorConfig {
    /// Resolve the remote file name against the local database path.
    pub fn resolved_remote_name(&self, database_path: &str) -> String {
        if let Some(name) = &self.remote_name {
            return name.clone();
        }
        Path::new(database_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(default_database_path)
    }
}

fn default_sync_interval_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

/// Liveness endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Interactive presentation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ViewsConfig {
    /// Counters per page. Discord allows five component rows; one is navigation.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// How long a confirmation prompt waits for its author.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    /// How long the startup stale-view prompt waits before removing the view.
    #[serde(default = "default_stale_prompt_timeout_secs")]
    pub stale_prompt_timeout_secs: u64,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            stale_prompt_timeout_secs: default_stale_prompt_timeout_secs(),
        }
    }
}

fn default_page_size() -> usize {
    4
}

fn default_confirm_timeout_secs() -> u64 {
    60
}

fn default_stale_prompt_timeout_secs() -> u64 {
    3
}
