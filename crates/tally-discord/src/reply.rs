// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up messaging shared by slash commands and button presses.
//!
//! Every handler defers its interaction first, so all user-visible answers
//! are follow-ups.

use std::sync::Arc;
use std::time::Duration;

use serenity::all::{
    CommandInteraction, ComponentInteraction, Context, CreateEmbed,
    CreateInteractionResponseFollowup, Http, Message, MessageId,
};
use tally_core::TallyError;
use tracing::debug;

/// How long transient success notices stay visible.
pub const NOTICE_LIFETIME: Duration = Duration::from_secs(3);

#[derive(Clone, Copy)]
pub enum Reply<'a> {
    Command(&'a CommandInteraction),
    Component(&'a ComponentInteraction),
}

impl Reply<'_> {
    pub fn token(&self) -> &str {
        match self {
            Reply::Command(i) => &i.token,
            Reply::Component(i) => &i.token,
        }
    }

    pub async fn followup(
        &self,
        ctx: &Context,
        builder: CreateInteractionResponseFollowup,
    ) -> Result<Message, TallyError> {
        let result = match self {
            Reply::Command(i) => i.create_followup(&ctx.http, builder).await,
            Reply::Component(i) => i.create_followup(&ctx.http, builder).await,
        };
        result.map_err(channel_err)
    }

    pub async fn followup_text(&self, ctx: &Context, text: &str) -> Result<Message, TallyError> {
        self.followup(
            ctx,
            CreateInteractionResponseFollowup::new()
                .content(text)
                .ephemeral(true),
        )
        .await
    }

    pub async fn followup_embed(
        &self,
        ctx: &Context,
        embed: CreateEmbed,
    ) -> Result<Message, TallyError> {
        self.followup(
            ctx,
            CreateInteractionResponseFollowup::new()
                .embed(embed)
                .ephemeral(true),
        )
        .await
    }

    pub async fn edit_followup(
        &self,
        ctx: &Context,
        message_id: MessageId,
        builder: CreateInteractionResponseFollowup,
    ) -> Result<Message, TallyError> {
        let result = match self {
            Reply::Command(i) => i.edit_followup(&ctx.http, message_id, builder).await,
            Reply::Component(i) => i.edit_followup(&ctx.http, message_id, builder).await,
        };
        result.map_err(channel_err)
    }

    pub async fn delete_followup(&self, ctx: &Context, message_id: MessageId) {
        let result = match self {
            Reply::Command(i) => i.delete_followup(&ctx.http, message_id).await,
            Reply::Component(i) => i.delete_followup(&ctx.http, message_id).await,
        };
        if let Err(e) = result {
            debug!(error = %e, "follow-up already gone");
        }
    }

    /// Sends an ephemeral notice that deletes itself after [`NOTICE_LIFETIME`].
    pub async fn transient(&self, ctx: &Context, text: &str) -> Result<(), TallyError> {
        let message = self.followup_text(ctx, text).await?;
        let http: Arc<Http> = ctx.http.clone();
        let token = self.token().to_string();
        tokio::spawn(async move {
            tokio::time::sleep(NOTICE_LIFETIME).await;
            if let Err(e) = http.delete_followup_message(&token, message.id).await {
                debug!(error = %e, "transient notice already gone");
            }
        });
        Ok(())
    }
}

pub fn channel_err(e: serenity::Error) -> TallyError {
    TallyError::Channel {
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}

/// `true` when Discord answered 404 (unknown message or channel).
pub fn is_not_found(e: &serenity::Error) -> bool {
    matches!(
        e,
        serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
    )
}
