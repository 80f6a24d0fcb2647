// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Autocomplete for the `group` and `name` command options.

use serenity::all::{
    CommandDataOptionValue, CommandInteraction, Context, CreateAutocompleteResponse,
    CreateInteractionResponse,
};
use tally_core::GroupKey;
use tracing::debug;

use crate::Handler;
use crate::render::capitalize;

/// Discord rejects more choices than this.
pub const MAX_CHOICES: usize = 25;

/// A suggestion: display name and submitted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

/// Case-insensitive substring match, in candidate order.
pub fn suggest<I, S>(candidates: I, current: &str) -> Vec<Choice>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let needle = current.to_lowercase();
    candidates
        .into_iter()
        .filter(|c| c.as_ref().to_lowercase().contains(&needle))
        .take(MAX_CHOICES)
        .map(|c| Choice {
            name: capitalize(c.as_ref()),
            value: c.as_ref().to_string(),
        })
        .collect()
}

impl Handler {
    pub(crate) async fn autocomplete(&self, ctx: &Context, interaction: &CommandInteraction) {
        let choices = self.autocomplete_choices(interaction).await;

        let response = choices.into_iter().fold(
            CreateAutocompleteResponse::new(),
            |response, choice| response.add_string_choice(choice.name, choice.value),
        );
        if let Err(e) = interaction
            .create_response(&ctx.http, CreateInteractionResponse::Autocomplete(response))
            .await
        {
            debug!(error = %e, "failed to answer autocomplete");
        }
    }

    /// Errors yield no suggestions.
    async fn autocomplete_choices(&self, interaction: &CommandInteraction) -> Vec<Choice> {
        let Some(guild_id) = interaction.guild_id.map(|g| g.get()) else {
            return Vec::new();
        };
        let Some(focused) = interaction.data.autocomplete() else {
            return Vec::new();
        };
        let store = self.pipeline.store();

        match focused.name {
            "group" => match store.list_group_names(guild_id, None).await {
                Ok(groups) => suggest(groups, focused.value),
                Err(e) => {
                    debug!(error = %e, "group autocomplete failed");
                    Vec::new()
                }
            },
            "name" => {
                let group = interaction.data.options.iter().find_map(|o| match &o.value {
                    CommandDataOptionValue::String(s) if o.name == "group" => Some(s.to_lowercase()),
                    _ => None,
                });
                let Some(group) = group.filter(|g| !g.is_empty()) else {
                    return Vec::new();
                };
                match store.list_counters(&GroupKey::new(guild_id, group)).await {
                    Ok(counters) => suggest(counters.iter().map(|c| c.name.as_str()), focused.value),
                    Err(e) => {
                        debug!(error = %e, "counter autocomplete failed");
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_insensitive_substrings() {
        let groups = ["fruit", "vegetables", "frozen"];
        let choices = suggest(groups, "FR");
        assert_eq!(
            choices,
            vec![
                Choice {
                    name: "Fruit".to_string(),
                    value: "fruit".to_string()
                },
                Choice {
                    name: "Frozen".to_string(),
                    value: "frozen".to_string()
                },
            ]
        );
    }

    #[test]
    fn empty_input_matches_everything() {
        assert_eq!(suggest(["a", "b"], "").len(), 2);
    }

    #[test]
    fn caps_at_twenty_five() {
        let many: Vec<String> = (0..40).map(|i| format!("group{i}")).collect();
        let choices = suggest(&many, "group");
        assert_eq!(choices.len(), MAX_CHOICES);
        assert_eq!(choices[0].value, "group0");
    }

    #[test]
    fn no_match_is_empty() {
        assert!(suggest(["fruit"], "veg").is_empty());
    }
}
