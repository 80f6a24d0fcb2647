// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! [`validate_config`] checks constraints every command needs;
//! [`require_runtime_settings`] adds the keys only `serve` cannot run without.

use crate::diagnostic::ConfigError;
use crate::model::TallyConfig;

/// Discord allows five action rows; the last is navigation.
const MAX_PAGE_SIZE: usize = 4;

/// Validate a deserialized configuration, collecting every error.
pub fn validate_config(config: &TallyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.mirror.sync_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "mirror.sync_interval_secs must be greater than 0".to_string(),
        });
    }

    if let Some(name) = &config.mirror.remote_name
        && name.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "mirror.remote_name must not be empty when set".to_string(),
        });
    }

    if !(1..=MAX_PAGE_SIZE).contains(&config.views.page_size) {
        errors.push(ConfigError::Validation {
            message: format!(
                "views.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                config.views.page_size
            ),
        });
    }

    if config.views.confirm_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "views.confirm_timeout_secs must be greater than 0".to_string(),
        });
    }

    let addr = config.health.bind_address.trim();
    if addr.is_empty() {
        errors.push(ConfigError::Validation {
            message: "health.bind_address must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!(
                    "health.bind_address `{addr}` is not a valid IP address or hostname"
                ),
            });
        }
    }

    if config.health.enabled && config.health.port == 0 {
        errors.push(ConfigError::Validation {
            message: "health.port must not be 0".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check the settings `serve` refuses to start without.
///
/// The Discord token is always required; the mirror folder and one credential
/// source are required while the mirror is enabled.
pub fn require_runtime_settings(config: &TallyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if is_blank(config.discord.token.as_deref()) {
        errors.push(ConfigError::missing("discord.token"));
    }

    if config.mirror.enabled {
        if is_blank(config.mirror.folder_id.as_deref()) {
            errors.push(ConfigError::missing("mirror.folder_id"));
        }
        if is_blank(config.mirror.credentials_json.as_deref())
            && is_blank(config.mirror.credentials_file.as_deref())
        {
            errors.push(ConfigError::missing("mirror.credentials_json"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runnable() -> TallyConfig {
        let mut config = TallyConfig::default();
        config.discord.token = Some("token".into());
        config.mirror.folder_id = Some("folder".into());
        config.mirror.credentials_file = Some("/etc/tally/sa.json".into());
        config
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&TallyConfig::default()).is_ok());
    }

    #[test]
    fn zero_sync_interval_fails_validation() {
        let mut config = TallyConfig::default();
        config.mirror.sync_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("sync_interval_secs"));
    }

    #[test]
    fn page_size_out_of_range_fails_validation() {
        let mut config = TallyConfig::default();
        config.views.page_size = 5;
        assert!(validate_config(&config).is_err());
        config.views.page_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = TallyConfig::default();
        config.storage.database_path = " ".into();
        config.health.bind_address = "not a host!".into();
        config.views.page_size = 9;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn runtime_settings_require_token() {
        let mut config = runnable();
        assert!(require_runtime_settings(&config).is_ok());
        config.discord.token = Some("  ".into());
        let errors = require_runtime_settings(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("discord.token"));
    }

    #[test]
    fn disabled_mirror_needs_no_credentials() {
        let mut config = TallyConfig::default();
        config.discord.token = Some("token".into());
        config.mirror.enabled = false;
        assert!(require_runtime_settings(&config).is_ok());
    }

    #[test]
    fn enabled_mirror_needs_folder_and_credentials() {
        let mut config = TallyConfig::default();
        config.discord.token = Some("token".into());
        let errors = require_runtime_settings(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
