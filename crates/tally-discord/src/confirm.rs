// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Yes/no confirmation prompts for destructive actions.

use std::time::Duration;

use futures::StreamExt;
use serenity::all::{
    ButtonStyle, ComponentInteractionCollector, Context, CreateActionRow, CreateButton,
    CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, MessageId, UserId,
};
use tally_core::TallyError;
use tracing::debug;

use crate::reply::Reply;

const CONFIRM_ID: &str = "tally:confirm:yes";
const CANCEL_ID: &str = "tally:confirm:no";

pub const NOT_YOURS: &str = "You cannot interact with this confirmation.";
pub const TIMED_OUT: &str = "Confirmation timed out.";

/// What the author decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirmed,
    Cancelled,
    TimedOut,
}

/// Maps a confirmation button id to its decision.
pub fn parse_choice(custom_id: &str) -> Option<Decision> {
    match custom_id {
        CONFIRM_ID => Some(Decision::Confirmed),
        CANCEL_ID => Some(Decision::Cancelled),
        _ => None,
    }
}

pub fn is_confirmation(custom_id: &str) -> bool {
    parse_choice(custom_id).is_some()
}

fn buttons(disabled: bool) -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(CONFIRM_ID)
            .label("Yes, I'm Sure")
            .style(ButtonStyle::Danger)
            .disabled(disabled),
        CreateButton::new(CANCEL_ID)
            .label("No, Cancel")
            .style(ButtonStyle::Secondary)
            .disabled(disabled),
    ])]
}

/// An ephemeral prompt that only its author may answer.
pub struct Confirmation<'a> {
    pub reply: Reply<'a>,
    pub author: UserId,
    pub text: String,
    pub timeout: Duration,
}

/// The prompt message after a decision, for the caller's final edit.
pub struct Prompt {
    pub decision: Decision,
    pub message_id: MessageId,
}

impl Confirmation<'_> {
    pub async fn ask(self, ctx: &Context) -> Result<Prompt, TallyError> {
        let prompt = self
            .reply
            .followup(
                ctx,
                CreateInteractionResponseFollowup::new()
                    .content(&self.text)
                    .components(buttons(false))
                    .ephemeral(true),
            )
            .await?;

        let mut presses = std::pin::pin!(
            ComponentInteractionCollector::new(&ctx.shard)
                .message_id(prompt.id)
                .timeout(self.timeout)
                .stream()
        );

        while let Some(press) = presses.next().await {
            let Some(decision) = parse_choice(&press.data.custom_id) else {
                continue;
            };
            if press.user.id != self.author {
                let refuse = CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(NOT_YOURS)
                        .ephemeral(true),
                );
                if let Err(e) = press.create_response(&ctx.http, refuse).await {
                    debug!(error = %e, "failed to refuse foreign confirmation press");
                }
                continue;
            }

            let content = match decision {
                Decision::Confirmed => "✅ Confirmed. Processing request...",
                _ => "Deletion cancelled.",
            };
            let update = CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .components(Vec::new()),
            );
            if let Err(e) = press.create_response(&ctx.http, update).await {
                debug!(error = %e, "failed to acknowledge confirmation");
            }
            return Ok(Prompt {
                decision,
                message_id: prompt.id,
            });
        }

        self.reply
            .edit_followup(
                ctx,
                prompt.id,
                CreateInteractionResponseFollowup::new()
                    .content(TIMED_OUT)
                    .components(buttons(true)),
            )
            .await?;
        Ok(Prompt {
            decision: Decision::TimedOut,
            message_id: prompt.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_parse() {
        assert_eq!(parse_choice("tally:confirm:yes"), Some(Decision::Confirmed));
        assert_eq!(parse_choice("tally:confirm:no"), Some(Decision::Cancelled));
        assert_eq!(parse_choice("tally:inc:1:apples"), None);
        assert!(is_confirmation(CONFIRM_ID));
    }
}
