// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord messages as a [`ViewSurface`].

use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{
    ActionRowComponent, ButtonKind, ButtonStyle, ChannelId, CreateActionRow, CreateButton,
    EditMessage, Http, Message, MessageId, ReactionType,
};
use tally_core::{
    ActiveView, AdapterType, Counter, HealthStatus, PluginAdapter, TallyError, ViewError,
    ViewSurface,
};
use tracing::debug;

use crate::render::{self, ButtonModel, PageModel, Tone};
use crate::reply::{channel_err, is_not_found};

pub fn button(model: &ButtonModel) -> CreateButton {
    let style = match model.tone {
        Tone::Primary => ButtonStyle::Primary,
        Tone::Secondary => ButtonStyle::Secondary,
        Tone::Success => ButtonStyle::Success,
        Tone::Danger => ButtonStyle::Danger,
    };
    let mut button = CreateButton::new(model.custom_id.clone())
        .style(style)
        .disabled(model.disabled);
    if let Some(label) = &model.label {
        button = button.label(label.clone());
    }
    if let Some(emoji) = model.emoji {
        button = button.emoji(ReactionType::Unicode(emoji.to_string()));
    }
    button
}

pub fn components(model: &PageModel) -> Vec<CreateActionRow> {
    model
        .rows
        .iter()
        .map(|row| CreateActionRow::Buttons(row.iter().map(button).collect()))
        .collect()
}

/// The page a counter list message is currently showing.
pub fn current_page(message: &Message) -> usize {
    let ids = message
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            ActionRowComponent::Button(b) => match &b.data {
                ButtonKind::NonLink { custom_id, .. } => Some(custom_id.as_str()),
                _ => None,
            },
            _ => None,
        });
    render::page_from_ids(ids).unwrap_or(1)
}

/// Renders counter lists by editing the bot's own messages over REST.
pub struct DiscordSurface {
    http: Arc<Http>,
    page_size: usize,
}

impl DiscordSurface {
    pub fn new(http: Arc<Http>, page_size: usize) -> Self {
        Self { http, page_size }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn view_err(e: serenity::Error) -> ViewError {
        if is_not_found(&e) {
            ViewError::NotFound
        } else {
            ViewError::Other(channel_err(e))
        }
    }
}

#[async_trait]
impl PluginAdapter for DiscordSurface {
    fn name(&self) -> &str {
        "discord"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Surface
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        match self.http.get_current_user().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("Discord unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        Ok(())
    }
}

#[async_trait]
impl ViewSurface for DiscordSurface {
    async fn refresh(
        &self,
        view: &ActiveView,
        counters: &[Counter],
        locked: bool,
    ) -> Result<(), ViewError> {
        let channel = ChannelId::new(view.channel_id);
        let message_id = MessageId::new(view.message_id);
        let message = channel
            .message(&*self.http, message_id)
            .await
            .map_err(Self::view_err)?;

        let model = render::render_page(
            &view.group_name,
            counters,
            current_page(&message),
            self.page_size,
            locked,
        );
        channel
            .edit_message(
                &*self.http,
                message_id,
                EditMessage::new()
                    .content(model.content.clone())
                    .components(components(&model)),
            )
            .await
            .map_err(Self::view_err)?;

        debug!(message_id = view.message_id, page = model.page, locked, "view refreshed");
        Ok(())
    }

    async fn remove(&self, view: &ActiveView) -> Result<(), ViewError> {
        ChannelId::new(view.channel_id)
            .delete_message(&*self.http, MessageId::new(view.message_id))
            .await
            .map_err(Self::view_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::Counter;

    #[test]
    fn components_mirror_the_page_model() {
        let counters = vec![Counter::new("apples", 1), Counter::new("pears", 2)];
        let model = render::render_page("fruit", &counters, 1, 4, false);
        let rows = components(&model);
        assert_eq!(rows.len(), 3);
    }
}
