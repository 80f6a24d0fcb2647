// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord front end for Tally.
//!
//! Slash commands, autocomplete, and counter-list buttons are handled by
//! [`Handler`]; [`DiscordSurface`] lets the pipeline re-render posted lists.
//! All mutations go through the shared [`Pipeline`].

pub mod autocomplete;
pub mod commands;
pub mod components;
pub mod confirm;
pub mod render;
pub mod reply;
pub mod report;
pub mod surface;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::all::{
    Client, Command, Context, EventHandler, GatewayIntents, Http, Interaction, Ready,
};
use tally_config::{OperatingMode, TallyConfig};
use tally_core::TallyError;
use tally_pipeline::Pipeline;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use surface::DiscordSurface;

use crate::reply::{Reply, channel_err};

/// Front-end behaviour taken from configuration.
#[derive(Debug, Clone)]
pub struct FrontEndSettings {
    pub mode: OperatingMode,
    pub version: String,
    pub page_size: usize,
    pub confirm_timeout: Duration,
}

impl FrontEndSettings {
    pub fn from_config(config: &TallyConfig, version: impl Into<String>) -> Self {
        Self {
            mode: config.bot.mode,
            version: version.into(),
            page_size: config.views.page_size,
            confirm_timeout: Duration::from_secs(config.views.confirm_timeout_secs),
        }
    }
}

/// Gateway event handler.
pub struct Handler {
    pipeline: Pipeline,
    settings: FrontEndSettings,
}

impl Handler {
    pub fn new(pipeline: Pipeline, settings: FrontEndSettings) -> Self {
        Self { pipeline, settings }
    }

    async fn report(&self, ctx: &Context, reply: Reply<'_>, command: &str, err: &TallyError) {
        report::send_error_report(ctx, reply, self.settings.mode, command, err).await;
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "connected to Discord");
        match Command::set_global_commands(&ctx.http, commands::definitions()).await {
            Ok(registered) => info!(count = registered.len(), "slash commands registered"),
            Err(e) => error!(error = %e, "failed to register slash commands"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => self.command(&ctx, &command).await,
            Interaction::Autocomplete(command) => self.autocomplete(&ctx, &command).await,
            Interaction::Component(component) => self.component(&ctx, &component).await,
            _ => {}
        }
    }
}

/// A REST client for the surface, usable before the gateway connects.
pub fn rest_client(token: &str) -> Arc<Http> {
    Arc::new(Http::new(token))
}

/// Connects to the gateway and serves events until `cancel` fires.
pub async fn run(token: &str, handler: Handler, cancel: CancellationToken) -> Result<(), TallyError> {
    let mut client = Client::builder(token, GatewayIntents::GUILDS)
        .event_handler(handler)
        .await
        .map_err(channel_err)?;

    let shards = client.shard_manager.clone();
    let stopper = tokio::spawn(async move {
        cancel.cancelled().await;
        info!("stopping Discord shards");
        shards.shutdown_all().await;
    });

    let result = client.start().await;
    stopper.abort();
    match result {
        Ok(()) => {
            info!("Discord client stopped");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Discord client exited with an error");
            Err(channel_err(e))
        }
    }
}
