// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `/etc/tally/tally.toml`, `~/.config/tally/tally.toml`,
//! `./tally.toml`, then `TALLY_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::TallyConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/tally/tally.toml";
pub(crate) const LOCAL_CONFIG: &str = "tally.toml";

/// Sections recognised in `TALLY_<SECTION>_<KEY>` environment variables.
const ENV_SECTIONS: &[&str] = &["bot", "discord", "storage", "mirror", "health", "views"];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tally/tally.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
pub fn load_config() -> Result<TallyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<TallyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TallyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TallyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TallyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TallyConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider with an explicit section-to-dot mapping.
///
/// `Env::split("_")` would turn `TALLY_MIRROR_FOLDER_ID` into
/// `mirror.folder.id`; only the first underscore after the section is a separator.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("TALLY_").map(|key| map_env_key(key.as_str()).into())
}

/// Env keys arrive in their original case (`MIRROR_FOLDER_ID`).
pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("mirror_folder_id"), "mirror.folder_id");
        assert_eq!(map_env_key("discord_token"), "discord.token");
        assert_eq!(
            map_env_key("views_stale_prompt_timeout_secs"),
            "views.stale_prompt_timeout_secs"
        );
        assert_eq!(map_env_key("unknown_key"), "unknown_key");
    }

    #[test]
    fn upper_case_env_keys_are_mapped() {
        assert_eq!(map_env_key("DISCORD_TOKEN"), "discord.token");
        assert_eq!(map_env_key("STORAGE_WAL_MODE"), "storage.wal_mode");
    }

    #[test]
    fn discord_token_comes_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TALLY_DISCORD_TOKEN", "from-env");
            jail.set_env("TALLY_MIRROR_ENABLED", "false");

            let config = load_config()?;
            assert_eq!(config.discord.token.as_deref(), Some("from-env"));
            assert!(!config.mirror.enabled);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_toml_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("tally.toml", "[bot]\nlog_level = \"warn\"\n")?;
            jail.set_env("TALLY_BOT_LOG_LEVEL", "debug");
            jail.set_env("TALLY_MIRROR_SYNC_INTERVAL_SECS", "15");

            let config = load_config()?;
            assert_eq!(config.bot.log_level, "debug");
            assert_eq!(config.mirror.sync_interval_secs, 15);
            Ok(())
        });
    }
}
