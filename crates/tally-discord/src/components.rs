// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Button presses on counter lists.
//!
//! Mutating buttons go through interactive admission: the group is locked,
//! every list of the group is shown as processing, and the job is queued.
//! Navigation only re-renders the pressed message.

use serenity::all::{
    ComponentInteraction, Context, CreateInteractionResponse, CreateInteractionResponseMessage,
    EditInteractionResponse,
};
use tally_core::{Delta, GroupKey, TallyError};
use tally_pipeline::{AdmissionError, Job};
use tracing::{debug, info};

use crate::Handler;
use crate::commands::{admission_err, outcome_text};
use crate::confirm;
use crate::render::{self, Control};
use crate::reply::{Reply, channel_err};
use crate::surface;

pub const INACTIVE: &str = "This counter list is no longer active. Use `/listcounters` to post a new one.";

impl Handler {
    pub(crate) async fn component(&self, ctx: &Context, interaction: &ComponentInteraction) {
        let custom_id = &interaction.data.custom_id;
        if confirm::is_confirmation(custom_id) {
            // Answered by the prompt's collector.
            return;
        }
        let Some(control) = Control::parse(custom_id) else {
            debug!(custom_id = %custom_id, "ignoring foreign component");
            return;
        };

        if let Err(e) = self.press(ctx, interaction, control).await {
            self.report(ctx, Reply::Component(interaction), "button", &e)
                .await;
        }
    }

    async fn press(
        &self,
        ctx: &Context,
        interaction: &ComponentInteraction,
        control: Control,
    ) -> Result<(), TallyError> {
        let message_id = interaction.message.id.get();
        let Some(view) = self.pipeline.store().get_active_view(message_id).await? else {
            return self.notice(ctx, interaction, INACTIVE).await;
        };
        let key = view.group_key();

        if self.pipeline.is_locked(&key) {
            return self.busy_notice(ctx, interaction).await;
        }

        match control {
            Control::Increment { name, .. } => {
                self.adjust(ctx, interaction, Job::update_counter(key, name, Delta::Increment))
                    .await
            }
            Control::Decrement { name, .. } => {
                self.adjust(ctx, interaction, Job::update_counter(key, name, Delta::Decrement))
                    .await
            }
            Control::Delete { name, .. } => self.remove_counter(ctx, interaction, key, name).await,
            nav @ (Control::Previous { .. } | Control::Next { .. } | Control::Refresh { .. }) => {
                self.navigate(ctx, interaction, &key, nav.target_page()).await
            }
            Control::Label { .. } | Control::Indicator { .. } => Ok(()),
        }
    }

    async fn notice(
        &self,
        ctx: &Context,
        interaction: &ComponentInteraction,
        text: &str,
    ) -> Result<(), TallyError> {
        interaction
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(text)
                        .ephemeral(true),
                ),
            )
            .await
            .map_err(channel_err)
    }

    async fn busy_notice(
        &self,
        ctx: &Context,
        interaction: &ComponentInteraction,
    ) -> Result<(), TallyError> {
        self.notice(ctx, interaction, &AdmissionError::GroupBusy.to_string())
            .await?;
        let http = ctx.http.clone();
        let token = interaction.token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(crate::reply::NOTICE_LIFETIME).await;
            if let Err(e) = http.delete_original_interaction_response(&token).await {
                debug!(error = %e, "busy notice already gone");
            }
        });
        Ok(())
    }

    /// Increment or decrement; returns once the job is queued.
    async fn adjust(
        &self,
        ctx: &Context,
        interaction: &ComponentInteraction,
        job: Job,
    ) -> Result<(), TallyError> {
        interaction.defer(&ctx.http).await.map_err(channel_err)?;
        let group = job.group.clone();
        match self.pipeline.admit(job).await {
            Ok(()) => {
                debug!(group = %group, user = interaction.user.id.get(), "button admitted");
                Ok(())
            }
            Err(AdmissionError::GroupBusy) => {
                Reply::Component(interaction)
                    .transient(ctx, &AdmissionError::GroupBusy.to_string())
                    .await
            }
            Err(e) => Err(admission_err(e)),
        }
    }

    async fn remove_counter(
        &self,
        ctx: &Context,
        interaction: &ComponentInteraction,
        key: GroupKey,
        name: String,
    ) -> Result<(), TallyError> {
        interaction.defer(&ctx.http).await.map_err(channel_err)?;
        let reply = Reply::Component(interaction);

        let (job, handle) = Job::delete_counter(key.clone(), name.clone()).with_completion();
        match self.pipeline.admit(job).await {
            Ok(()) => {}
            Err(AdmissionError::GroupBusy) => {
                return reply
                    .transient(ctx, &AdmissionError::GroupBusy.to_string())
                    .await;
            }
            Err(e) => return Err(admission_err(e)),
        }

        let outcome = handle.wait().await;
        if let Some(text) = outcome_text(&outcome) {
            reply.followup_text(ctx, &text).await?;
            return Ok(());
        }
        info!(group = %key, counter = %name, "counter deleted from list");

        if self.pipeline.store().is_group_empty(&key).await? {
            self.offer_group_purge(ctx, reply, interaction.user.id, &key)
                .await?;
        }
        Ok(())
    }

    async fn navigate(
        &self,
        ctx: &Context,
        interaction: &ComponentInteraction,
        key: &GroupKey,
        page: usize,
    ) -> Result<(), TallyError> {
        interaction.defer(&ctx.http).await.map_err(channel_err)?;
        let counters = self.pipeline.store().list_counters(key).await?;
        let model = render::render_page(
            &key.group,
            &counters,
            page,
            self.settings.page_size,
            false,
        );
        interaction
            .edit_response(
                &ctx.http,
                EditInteractionResponse::new()
                    .content(model.content.clone())
                    .components(surface::components(&model)),
            )
            .await
            .map_err(channel_err)?;
        debug!(group = %key, page = model.page, "counter list paged");
        Ok(())
    }
}
