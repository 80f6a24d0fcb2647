// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tally serve` command implementation.
//!
//! Brings the bot up in dependency order: mirror, database pull, store,
//! pipeline, background loops, view reattachment, liveness endpoint and
//! finally the Discord gateway. Tears it down in reverse on SIGINT/SIGTERM.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tally_config::{OperatingMode, TallyConfig};
use tally_core::{
    CounterStore, HealthStatus, PluginAdapter, RemoteMirror, TallyError, ViewSurface,
};
use tally_discord::{DiscordSurface, FrontEndSettings, Handler};
use tally_drive::DriveMirror;
use tally_pipeline::{
    AlwaysRemove, ConsolePrompt, LedgerState, MirroredDatabase, Pipeline, PullOutcome,
    StaleViewPolicy, SyncOutcome, SyncScheduler,
};
use tally_storage::SqliteStore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::health::{self, HealthState};
use crate::shutdown;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs the `tally serve` command.
pub async fn run_serve(config: TallyConfig) -> Result<(), TallyError> {
    if let Err(errors) = tally_config::require_runtime_settings(&config) {
        tally_config::render_errors(&errors);
        return Err(TallyError::Config(format!(
            "{} required setting(s) missing",
            errors.len()
        )));
    }
    let token = config
        .discord
        .token
        .clone()
        .ok_or_else(|| TallyError::Config("discord.token is not set".into()))?;

    init_tracing(&config.bot.log_level);
    info!(version = VERSION, mode = %config.bot.mode, "starting tally serve");

    let database = match prepare_mirror(&config).await? {
        Some(database) => {
            match database.pull().await? {
                PullOutcome::Downloaded { id } => info!(id = %id, "using mirrored database"),
                PullOutcome::Missing => {}
            }
            Some(database)
        }
        None => {
            warn!("mirror disabled, changes are kept locally only");
            None
        }
    };

    let store = SqliteStore::new(config.storage.clone());
    store.initialize().await?;
    let store: Arc<dyn CounterStore> = Arc::new(store);
    info!(path = %config.storage.database_path, "store opened");

    let surface = Arc::new(DiscordSurface::new(
        tally_discord::rest_client(&token),
        config.views.page_size,
    ));
    let state = LedgerState::new();
    let (pipeline, worker) = Pipeline::new(
        Arc::clone(&store),
        surface.clone() as Arc<dyn ViewSurface>,
        Arc::clone(&state),
    );

    let cancel = shutdown::install_signal_handler();
    let worker_task = tokio::spawn(worker.run(cancel.clone()));

    let scheduler = database.map(|database| {
        Arc::new(SyncScheduler::new(
            database,
            Arc::clone(&store),
            Arc::clone(&state),
            Duration::from_secs(config.mirror.sync_interval_secs),
        ))
    });
    let scheduler_task = scheduler.as_ref().map(|scheduler| {
        let scheduler = Arc::clone(scheduler);
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    });

    log_surface_health(surface.as_ref()).await;
    let policy = stale_policy(&config);
    let report = pipeline.broadcaster().reattach_all(policy.as_ref()).await;
    info!(
        refreshed = report.refreshed,
        removed = report.removed,
        "tracked views reattached"
    );

    let health_task = spawn_health_server(&config, &pipeline, &cancel);

    let handler = Handler::new(
        pipeline.clone(),
        FrontEndSettings::from_config(&config, VERSION),
    );
    let discord_result = tally_discord::run(&token, handler, cancel.clone()).await;
    if let Err(e) = &discord_result {
        error!(error = %e, "Discord client failed, shutting down");
    }

    cancel.cancel();
    await_task("mutation worker", worker_task).await;
    if let Some(task) = scheduler_task {
        await_task("sync scheduler", task).await;
    }
    if let Some(scheduler) = &scheduler {
        match scheduler.sync_once().await {
            SyncOutcome::Uploaded { .. } => info!("final sync complete"),
            SyncOutcome::Clean => {}
            SyncOutcome::Failed => warn!("final sync failed, local changes are not mirrored"),
        }
    }
    if let Some(task) = health_task {
        await_task("liveness server", task).await;
    }

    store.close().await?;
    info!("tally serve shutdown complete");
    discord_result
}

/// Authenticate the mirror and pair it with the local database file.
///
/// Returns `None` when mirroring is disabled. Authentication failure is fatal.
async fn prepare_mirror(
    config: &TallyConfig,
) -> Result<Option<Arc<MirroredDatabase>>, TallyError> {
    if !config.mirror.enabled {
        return Ok(None);
    }

    let mirror = Arc::new(DriveMirror::new(config.mirror.clone()));
    if let Err(e) = mirror.authenticate().await {
        error!(error = %e, "mirror authentication failed");
        return Err(e);
    }
    info!(mirror = mirror.name(), "mirror authenticated");

    let local_path = PathBuf::from(&config.storage.database_path);
    let remote_name = config
        .mirror
        .resolved_remote_name(&config.storage.database_path);
    Ok(Some(Arc::new(MirroredDatabase::new(
        mirror as Arc<dyn RemoteMirror>,
        remote_name,
        local_path,
    ))))
}

/// Ask on the console in development, remove silently otherwise.
fn stale_policy(config: &TallyConfig) -> Box<dyn StaleViewPolicy> {
    if config.bot.mode == OperatingMode::Development && std::io::stdin().is_terminal() {
        Box::new(ConsolePrompt::stdin(Duration::from_secs(
            config.views.stale_prompt_timeout_secs,
        )))
    } else {
        Box::new(AlwaysRemove)
    }
}

async fn log_surface_health(surface: &DiscordSurface) {
    match surface.health_check().await {
        Ok(HealthStatus::Healthy) => info!("Discord REST reachable"),
        Ok(status) => warn!(status = ?status, "Discord REST check did not pass"),
        Err(e) => warn!(error = %e, "Discord REST check failed"),
    }
}

fn spawn_health_server(
    config: &TallyConfig,
    pipeline: &Pipeline,
    cancel: &tokio_util::sync::CancellationToken,
) -> Option<JoinHandle<()>> {
    if !config.health.enabled {
        return None;
    }

    let health_config = config.health.clone();
    let state = HealthState {
        start_time: Instant::now(),
        version: VERSION,
        pipeline: pipeline.clone(),
    };
    let cancel = cancel.clone();
    Some(tokio::spawn(async move {
        if let Err(e) = health::start_server(&health_config, state, cancel).await {
            error!(error = %e, "liveness server stopped");
        }
    }))
}

async fn await_task(name: &str, task: JoinHandle<()>) {
    if let Err(e) = task.await {
        error!(task = name, error = %e, "background task ended abnormally");
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tally={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
