// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tally - shared, button-driven counters for Discord.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod backup;
mod health;
mod serve;
mod shutdown;

use clap::{Parser, Subcommand};

/// Tally - shared, button-driven counters for Discord.
#[derive(Parser, Debug)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to Discord and serve counters (default).
    Serve,
    /// Write a consistent copy of the configured database.
    Backup {
        /// Destination file for the copy.
        path: String,
    },
    /// Validate and print the effective configuration with secrets redacted.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match tally_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            tally_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Commands::Backup { path } => {
            if let Err(e) = backup::run_backup(&config.storage.database_path, &path) {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Commands::Config => match config.to_redacted_toml() {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("error: failed to render configuration: {e}");
                std::process::exit(1);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["tally"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn backup_takes_a_destination() {
        let cli = Cli::try_parse_from(["tally", "backup", "/tmp/copy.db"]).unwrap();
        match cli.command {
            Some(Commands::Backup { path }) => assert_eq!(path, "/tmp/copy.db"),
            other => panic!("expected backup, got {other:?}"),
        }
        assert!(Cli::try_parse_from(["tally", "backup"]).is_err());
    }

    #[test]
    fn default_config_renders_without_secrets() {
        let mut config = tally_config::TallyConfig::default();
        config.discord.token = Some("very-secret-token".into());
        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("very-secret-token"));
        assert!(rendered.contains("database_path"));
    }
}
