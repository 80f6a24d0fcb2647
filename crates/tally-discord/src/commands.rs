// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slash commands.

use serenity::all::{
    Colour, CommandDataOption, CommandInteraction, CommandOptionType, Context, CreateCommand,
    CreateCommandOption, CreateEmbed, CreateEmbedFooter, CreateInteractionResponseFollowup,
};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tally_core::{ActiveView, GroupKey, TallyError};
use tally_pipeline::{Job, JobError};
use tracing::{info, warn};

use crate::Handler;
use crate::confirm::{Confirmation, Decision};
use crate::render::{self, MAX_NAME_LEN, capitalize};
use crate::reply::{Reply, channel_err};
use crate::surface;

pub const GUILD_ONLY: &str = "This command can only be used in a server.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SlashCommand {
    Version,
    CreateCounter,
    ListCounters,
    ListGroups,
    DeleteCounter,
    DeleteGroup,
}

impl SlashCommand {
    pub fn name(self) -> &'static str {
        self.into()
    }

    fn description(self) -> &'static str {
        match self {
            SlashCommand::Version => "Shows the bot's current version and information.",
            SlashCommand::CreateCounter => "Creates a new counter in a specified group.",
            SlashCommand::ListCounters => "Lists all interactive counters in a specified group.",
            SlashCommand::ListGroups => "Lists all available counter groups in this server.",
            SlashCommand::DeleteCounter => "Deletes a counter from a group.",
            SlashCommand::DeleteGroup => {
                "[DANGEROUS] Deletes an entire group and all of its counters."
            }
        }
    }

    /// `(name, description, autocompleted)` for each string option.
    fn options(self) -> &'static [(&'static str, &'static str, bool)] {
        match self {
            SlashCommand::Version | SlashCommand::ListGroups => &[],
            SlashCommand::CreateCounter => &[
                ("group", "The group name (case-insensitive).", true),
                ("name", "The counter name (case-insensitive).", false),
            ],
            SlashCommand::ListCounters => {
                &[("group", "The group you want to list (case-insensitive).", true)]
            }
            SlashCommand::DeleteCounter => &[
                ("group", "The group the counter belongs to.", true),
                ("name", "The counter to delete.", true),
            ],
            SlashCommand::DeleteGroup => &[("group", "The group to delete permanently.", true)],
        }
    }

    pub fn definition(self) -> CreateCommand {
        self.options().iter().fold(
            CreateCommand::new(self.name())
                .description(self.description())
                .dm_permission(false),
            |command, (name, description, autocomplete)| {
                command.add_option(
                    CreateCommandOption::new(CommandOptionType::String, *name, *description)
                        .required(true)
                        .max_length(MAX_NAME_LEN as u16)
                        .set_autocomplete(*autocomplete),
                )
            },
        )
    }

    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

/// Every command, for global registration.
pub fn definitions() -> Vec<CreateCommand> {
    SlashCommand::iter().map(SlashCommand::definition).collect()
}

/// Trimmed, lower-cased string option `name`.
fn option(options: &[CommandDataOption], name: &str) -> Result<String, TallyError> {
    options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| o.value.as_str())
        .map(normalize)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| TallyError::Internal(format!("missing required option `{name}`")))
        .and_then(|value| within_name_limit(name, value))
}

/// Names longer than [`MAX_NAME_LEN`] would overflow button ids and labels.
fn within_name_limit(option: &str, value: String) -> Result<String, TallyError> {
    let len = value.chars().count();
    if len > MAX_NAME_LEN {
        return Err(TallyError::Internal(format!(
            "option `{option}` is {len} characters, the limit is {MAX_NAME_LEN}"
        )));
    }
    Ok(value)
}

/// Names and groups are stored lower-case.
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

pub fn outcome_text(outcome: &Result<(), JobError>) -> Option<String> {
    match outcome {
        Ok(()) => None,
        Err(JobError::Conflict(message) | JobError::Failed(message)) => {
            Some(format!("❌ **Error:** {message}"))
        }
    }
}

pub fn empty_group_prompt(group: &str) -> String {
    format!(
        "The group **`{}`** is now empty. Would you like to delete it and all its associated messages?",
        capitalize(group)
    )
}

pub fn delete_group_warning(group: &str) -> String {
    format!(
        "**⚠️ IRREVERSIBLE ACTION ⚠️**\n\nThis will permanently delete:\n\
         1. The group **`{}`** and all of its counters from the database.\n\
         2. **ALL** interactive counter list messages ever posted for this group.\n\n\
         Are you absolutely sure?",
        capitalize(group)
    )
}

pub fn group_list(groups: &[String]) -> String {
    let mut sorted: Vec<&String> = groups.iter().collect();
    sorted.sort();
    sorted
        .iter()
        .map(|g| format!("- `{}`", capitalize(g)))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Handler {
    pub(crate) async fn command(&self, ctx: &Context, interaction: &CommandInteraction) {
        let Some(command) = SlashCommand::from_name(&interaction.data.name) else {
            warn!(command = %interaction.data.name, "unknown command");
            return;
        };
        info!(
            command = command.name(),
            guild = interaction.guild_id.map(|g| g.get()),
            user = interaction.user.id.get(),
            "command received"
        );

        let result = match command {
            SlashCommand::Version => self.version_cmd(ctx, interaction).await,
            SlashCommand::CreateCounter => self.create_counter(ctx, interaction).await,
            SlashCommand::ListCounters => self.list_counters(ctx, interaction).await,
            SlashCommand::ListGroups => self.list_groups(ctx, interaction).await,
            SlashCommand::DeleteCounter => self.delete_counter(ctx, interaction).await,
            SlashCommand::DeleteGroup => self.delete_group(ctx, interaction).await,
        };
        if let Err(e) = result {
            self.report(ctx, Reply::Command(interaction), command.name(), &e)
                .await;
        }
    }

    async fn defer_ephemeral(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
    ) -> Result<(), TallyError> {
        interaction
            .defer_ephemeral(&ctx.http)
            .await
            .map_err(channel_err)
    }

    /// `None` after telling the user that the command needs a server.
    async fn guild(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
    ) -> Result<Option<u64>, TallyError> {
        match interaction.guild_id {
            Some(guild) => Ok(Some(guild.get())),
            None => {
                Reply::Command(interaction)
                    .followup_text(ctx, GUILD_ONLY)
                    .await?;
                Ok(None)
            }
        }
    }

    async fn version_cmd(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
    ) -> Result<(), TallyError> {
        self.defer_ephemeral(ctx, interaction).await?;
        let embed = CreateEmbed::new()
            .title("Tally Information")
            .colour(Colour::BLUE)
            .field("Version", format!("`{}`", self.settings.version), false)
            .footer(CreateEmbedFooter::new(format!(
                "BOT_MODE: {}",
                self.settings.mode
            )));
        Reply::Command(interaction)
            .followup_embed(ctx, embed)
            .await?;
        Ok(())
    }

    async fn create_counter(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
    ) -> Result<(), TallyError> {
        self.defer_ephemeral(ctx, interaction).await?;
        let reply = Reply::Command(interaction);
        let Some(guild) = self.guild(ctx, interaction).await? else {
            return Ok(());
        };
        let group = option(&interaction.data.options, "group")?;
        let name = option(&interaction.data.options, "name")?;

        let queued = reply
            .followup_text(
                ctx,
                &format!(
                    "➡️ Your request to create counter `{name}` in group `{group}` has been queued."
                ),
            )
            .await?;

        let (job, handle) =
            Job::create_counter(GroupKey::new(guild, group.clone()), name.clone()).with_completion();
        self.pipeline.submit(job).map_err(admission_err)?;
        let outcome = handle.wait().await;
        reply.delete_followup(ctx, queued.id).await;

        match outcome_text(&outcome) {
            Some(text) => {
                reply.followup_text(ctx, &text).await?;
            }
            None => {
                reply
                    .transient(
                        ctx,
                        &format!("✅ Successfully created counter `{name}` in group `{group}`!"),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn list_counters(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
    ) -> Result<(), TallyError> {
        interaction.defer(&ctx.http).await.map_err(channel_err)?;
        let Some(guild) = self.guild(ctx, interaction).await? else {
            return Ok(());
        };
        let group = option(&interaction.data.options, "group")?;
        let key = GroupKey::new(guild, group.clone());

        let counters = self.pipeline.store().list_counters(&key).await?;
        let model = render::render_page(
            &group,
            &counters,
            1,
            self.settings.page_size,
            self.pipeline.is_locked(&key),
        );
        let message = Reply::Command(interaction)
            .followup(
                ctx,
                CreateInteractionResponseFollowup::new()
                    .content(model.content.clone())
                    .components(surface::components(&model)),
            )
            .await?;

        self.pipeline
            .register_view(&ActiveView {
                message_id: message.id.get(),
                channel_id: message.channel_id.get(),
                guild_id: guild,
                group_name: group,
            })
            .await?;
        info!(group = %key, message_id = message.id.get(), "counter list posted");
        Ok(())
    }

    async fn list_groups(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
    ) -> Result<(), TallyError> {
        self.defer_ephemeral(ctx, interaction).await?;
        let reply = Reply::Command(interaction);
        let Some(guild) = self.guild(ctx, interaction).await? else {
            return Ok(());
        };

        let groups = self.pipeline.store().list_group_names(guild, None).await?;
        if groups.is_empty() {
            reply
                .followup_text(ctx, "There are no counter groups in this server yet.")
                .await?;
            return Ok(());
        }

        let embed = CreateEmbed::new()
            .title("Available Counter Groups")
            .description(group_list(&groups))
            .colour(Colour::BLUE);
        reply.followup_embed(ctx, embed).await?;
        Ok(())
    }

    async fn delete_counter(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
    ) -> Result<(), TallyError> {
        self.defer_ephemeral(ctx, interaction).await?;
        let reply = Reply::Command(interaction);
        let Some(guild) = self.guild(ctx, interaction).await? else {
            return Ok(());
        };
        let group = option(&interaction.data.options, "group")?;
        let name = option(&interaction.data.options, "name")?;
        let key = GroupKey::new(guild, group.clone());

        let (job, handle) = Job::delete_counter(key.clone(), name.clone()).with_completion();
        self.pipeline.submit(job).map_err(admission_err)?;
        let outcome = handle.wait().await;
        if let Some(text) = outcome_text(&outcome) {
            reply.followup_text(ctx, &text).await?;
            return Ok(());
        }
        reply
            .transient(ctx, &format!("✅ Deleted counter `{name}` from group `{group}`."))
            .await?;

        if self.pipeline.store().is_group_empty(&key).await? {
            self.offer_group_purge(ctx, reply, interaction.user.id, &key)
                .await?;
        }
        Ok(())
    }

    async fn delete_group(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
    ) -> Result<(), TallyError> {
        self.defer_ephemeral(ctx, interaction).await?;
        let reply = Reply::Command(interaction);
        let Some(guild) = self.guild(ctx, interaction).await? else {
            return Ok(());
        };
        let group = option(&interaction.data.options, "group")?;

        let known = self
            .pipeline
            .store()
            .list_group_names(guild, Some(&group))
            .await?;
        if known.is_empty() {
            reply
                .followup_text(ctx, &format!("No group named `{group}` found."))
                .await?;
            return Ok(());
        }

        let prompt = Confirmation {
            reply,
            author: interaction.user.id,
            text: delete_group_warning(&group),
            timeout: self.settings.confirm_timeout,
        }
        .ask(ctx)
        .await?;
        if prompt.decision != Decision::Confirmed {
            return Ok(());
        }

        self.run_group_deletion(&GroupKey::new(guild, group.clone()))
            .await?;
        reply
            .edit_followup(
                ctx,
                prompt.message_id,
                CreateInteractionResponseFollowup::new()
                    .content(format!(
                        "✅ Successfully purged group `{group}` and all associated data."
                    ))
                    .components(Vec::new()),
            )
            .await?;
        Ok(())
    }

    /// Asks whether to delete a group that just became empty.
    pub(crate) async fn offer_group_purge(
        &self,
        ctx: &Context,
        reply: Reply<'_>,
        author: serenity::all::UserId,
        key: &GroupKey,
    ) -> Result<(), TallyError> {
        let prompt = Confirmation {
            reply,
            author,
            text: empty_group_prompt(&key.group),
            timeout: self.settings.confirm_timeout,
        }
        .ask(ctx)
        .await?;
        if prompt.decision != Decision::Confirmed {
            return Ok(());
        }

        self.run_group_deletion(key).await?;
        reply
            .edit_followup(
                ctx,
                prompt.message_id,
                CreateInteractionResponseFollowup::new()
                    .content(format!(
                        "✅ Successfully purged the empty group `{}`.",
                        key.group
                    ))
                    .components(Vec::new()),
            )
            .await?;
        Ok(())
    }

    async fn run_group_deletion(&self, key: &GroupKey) -> Result<(), TallyError> {
        let (job, handle) = Job::delete_group(key.clone()).with_completion();
        self.pipeline.submit(job).map_err(admission_err)?;
        handle.wait().await.map_err(|e| match e {
            JobError::Conflict(m) | JobError::Failed(m) => TallyError::Internal(m),
        })
    }
}

pub(crate) fn admission_err(e: tally_pipeline::AdmissionError) -> TallyError {
    TallyError::Internal(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_has_a_unique_name() {
        let names: Vec<&str> = SlashCommand::iter().map(SlashCommand::name).collect();
        assert_eq!(
            names,
            vec![
                "version",
                "createcounter",
                "listcounters",
                "listgroups",
                "deletecounter",
                "deletegroup"
            ]
        );
        assert_eq!(definitions().len(), 6);
        for name in names {
            assert_eq!(SlashCommand::from_name(name).map(SlashCommand::name), Some(name));
        }
        assert_eq!(SlashCommand::from_name("ping"), None);
    }

    #[test]
    fn name_option_autocompletes_only_for_deletion() {
        let autocompleted = |c: SlashCommand| {
            c.options()
                .iter()
                .filter(|(_, _, auto)| *auto)
                .map(|(name, _, _)| *name)
                .collect::<Vec<_>>()
        };
        assert_eq!(autocompleted(SlashCommand::CreateCounter), vec!["group"]);
        assert_eq!(autocompleted(SlashCommand::DeleteCounter), vec!["group", "name"]);
    }

    #[test]
    fn overlong_names_are_rejected() {
        let longest = "a".repeat(MAX_NAME_LEN);
        assert_eq!(within_name_limit("name", longest.clone()).unwrap(), longest);

        let err = within_name_limit("name", "a".repeat(MAX_NAME_LEN + 1)).unwrap_err();
        assert!(err.to_string().contains("limit is 50"), "{err}");
    }

    #[test]
    fn multibyte_names_are_counted_in_characters() {
        let accented = "é".repeat(MAX_NAME_LEN);
        assert!(within_name_limit("group", accented).is_ok());
    }

    #[test]
    fn inputs_are_normalized() {
        assert_eq!(normalize("  Fruit "), "fruit");
        assert_eq!(normalize("APPLES"), "apples");
    }

    #[test]
    fn job_errors_become_user_text() {
        assert_eq!(outcome_text(&Ok(())), None);
        assert_eq!(
            outcome_text(&Err(JobError::Conflict(
                "A counter named `apples` already exists in group `fruit`.".into()
            ))),
            Some("❌ **Error:** A counter named `apples` already exists in group `fruit`.".into())
        );
    }

    #[test]
    fn group_list_is_sorted_and_capitalized() {
        let groups = vec!["veg".to_string(), "fruit".to_string()];
        assert_eq!(group_list(&groups), "- `Fruit`\n- `Veg`");
    }

    #[test]
    fn prompts_name_the_group() {
        assert!(empty_group_prompt("fruit").contains("**`Fruit`** is now empty"));
        assert!(delete_group_warning("fruit").starts_with("**⚠️ IRREVERSIBLE ACTION ⚠️**"));
    }
}
