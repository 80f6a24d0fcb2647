// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure model of an interactive counter list.
//!
//! A page is rendered into plain data ([`PageModel`]) so layout rules can be
//! tested without a gateway connection; [`crate::surface`] turns it into
//! serenity builders. The current page lives in the control identifiers
//! themselves, so any re-render can recover it from the message.

use tally_core::Counter;

pub const DEFAULT_PAGE_SIZE: usize = 4;
/// Discord allows five action rows; one is reserved for navigation.
pub const MAX_PAGE_SIZE: usize = 4;

const PREFIX: &str = "tally";

/// Longest accepted group or counter name, in characters.
///
/// Keeps `tally:label:<page>:<name>` under Discord's 100-character custom id
/// limit and `Name: <i64>` under its 80-character label limit.
pub const MAX_NAME_LEN: usize = 50;

/// Discord's button label limit.
pub const MAX_LABEL_LEN: usize = 80;

pub const LOCKED_CONTENT: &str =
    "**⏳ Processing...**\n*This message will update automatically.*";

/// Style of a rendered button, mirrored onto Discord's button styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonModel {
    pub custom_id: String,
    pub label: Option<String>,
    pub emoji: Option<&'static str>,
    pub tone: Tone,
    pub disabled: bool,
}

impl ButtonModel {
    fn new(control: Control, tone: Tone) -> Self {
        Self {
            custom_id: control.encode(),
            label: None,
            emoji: None,
            tone,
            disabled: false,
        }
    }

    fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn emoji(mut self, emoji: &'static str) -> Self {
        self.emoji = Some(emoji);
        self
    }

    fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageModel {
    pub content: String,
    pub rows: Vec<Vec<ButtonModel>>,
    /// The clamped, 1-based page actually rendered.
    pub page: usize,
    pub total_pages: usize,
}

/// A button on a counter list, with the page it was rendered on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Label { page: usize, name: String },
    Increment { page: usize, name: String },
    Decrement { page: usize, name: String },
    Delete { page: usize, name: String },
    Previous { page: usize },
    Indicator { page: usize },
    Next { page: usize },
    Refresh { page: usize },
}

impl Control {
    /// Encodes as `tally:<action>:<page>[:<name>]`.
    pub fn encode(&self) -> String {
        match self {
            Control::Label { page, name } => format!("{PREFIX}:label:{page}:{name}"),
            Control::Increment { page, name } => format!("{PREFIX}:inc:{page}:{name}"),
            Control::Decrement { page, name } => format!("{PREFIX}:dec:{page}:{name}"),
            Control::Delete { page, name } => format!("{PREFIX}:del:{page}:{name}"),
            Control::Previous { page } => format!("{PREFIX}:prev:{page}"),
            Control::Indicator { page } => format!("{PREFIX}:page:{page}"),
            Control::Next { page } => format!("{PREFIX}:next:{page}"),
            Control::Refresh { page } => format!("{PREFIX}:refresh:{page}"),
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.splitn(4, ':');
        if parts.next()? != PREFIX {
            return None;
        }
        let action = parts.next()?;
        let page: usize = parts.next()?.parse().ok()?;
        let name = parts.next().map(str::to_string);

        let control = match (action, name) {
            ("label", Some(name)) => Control::Label { page, name },
            ("inc", Some(name)) => Control::Increment { page, name },
            ("dec", Some(name)) => Control::Decrement { page, name },
            ("del", Some(name)) => Control::Delete { page, name },
            ("prev", None) => Control::Previous { page },
            ("page", None) => Control::Indicator { page },
            ("next", None) => Control::Next { page },
            ("refresh", None) => Control::Refresh { page },
            _ => return None,
        };
        Some(control)
    }

    pub fn page(&self) -> usize {
        match self {
            Control::Label { page, .. }
            | Control::Increment { page, .. }
            | Control::Decrement { page, .. }
            | Control::Delete { page, .. }
            | Control::Previous { page }
            | Control::Indicator { page }
            | Control::Next { page }
            | Control::Refresh { page } => *page,
        }
    }

    /// The page a navigation control leads to, before clamping.
    pub fn target_page(&self) -> usize {
        match self {
            Control::Previous { page } => page.saturating_sub(1),
            Control::Next { page } => page + 1,
            other => other.page(),
        }
    }
}

/// The page recorded in the first parseable control identifier.
pub fn page_from_ids<'a>(custom_ids: impl IntoIterator<Item = &'a str>) -> Option<usize> {
    custom_ids
        .into_iter()
        .find_map(Control::parse)
        .map(|c| c.page())
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

/// Upper-cases the first character and lower-cases the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Cuts a label to [`MAX_LABEL_LEN`] characters.
fn fit_label(label: String) -> String {
    match label.char_indices().nth(MAX_LABEL_LEN) {
        Some((end, _)) => label[..end].to_string(),
        None => label,
    }
}

/// Lays out `page` of `counters` for `group`.
pub fn render_page(
    group: &str,
    counters: &[Counter],
    page: usize,
    page_size: usize,
    locked: bool,
) -> PageModel {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let total_pages = total_pages(counters.len(), page_size);
    let page = page.clamp(1, total_pages);

    let content = if locked {
        LOCKED_CONTENT.to_string()
    } else {
        let title = format!("**Counters in Group: `{}`**\n", capitalize(group));
        if counters.is_empty() {
            title + "This group has no counters. Use `/createcounter` to add one!"
        } else {
            title + "*This is an interactive message.*"
        }
    };

    let start = (page - 1) * page_size;
    let mut rows: Vec<Vec<ButtonModel>> = counters
        .iter()
        .skip(start)
        .take(page_size)
        .map(|counter| {
            let name = counter.name.clone();
            vec![
                ButtonModel::new(
                    Control::Label {
                        page,
                        name: name.clone(),
                    },
                    Tone::Secondary,
                )
                .label(fit_label(format!(
                    "{}: {}",
                    capitalize(&counter.name),
                    counter.value
                )))
                .disabled(true),
                ButtonModel::new(
                    Control::Increment {
                        page,
                        name: name.clone(),
                    },
                    Tone::Success,
                )
                .emoji("🔼")
                .disabled(locked),
                ButtonModel::new(
                    Control::Decrement {
                        page,
                        name: name.clone(),
                    },
                    Tone::Danger,
                )
                .emoji("🔽")
                .disabled(locked),
                ButtonModel::new(Control::Delete { page, name }, Tone::Secondary)
                    .emoji("❌")
                    .disabled(locked),
            ]
        })
        .collect();

    rows.push(vec![
        ButtonModel::new(Control::Previous { page }, Tone::Primary)
            .label("◀️")
            .disabled(locked || page <= 1),
        ButtonModel::new(Control::Indicator { page }, Tone::Secondary)
            .label(format!("Page {page}/{total_pages}"))
            .disabled(true),
        ButtonModel::new(Control::Next { page }, Tone::Primary)
            .label("▶️")
            .disabled(locked || page >= total_pages),
        ButtonModel::new(Control::Refresh { page }, Tone::Primary)
            .label("Refresh")
            .emoji("🔄")
            .disabled(locked),
    ]);

    PageModel {
        content,
        rows,
        page,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(n: usize) -> Vec<Counter> {
        (0..n)
            .map(|i| Counter::new(format!("c{i}"), i as i64))
            .collect()
    }

    #[test]
    fn capitalize_matches_display_rules() {
        assert_eq!(capitalize("apples"), "Apples");
        assert_eq!(capitalize("APPLES"), "Apples");
        assert_eq!(capitalize("big apple"), "Big apple");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn total_pages_is_at_least_one() {
        assert_eq!(total_pages(0, 4), 1);
        assert_eq!(total_pages(4, 4), 1);
        assert_eq!(total_pages(5, 4), 2);
        assert_eq!(total_pages(9, 4), 3);
    }

    #[test]
    fn page_rows_hold_label_and_three_actions() {
        let model = render_page("fruit", &[Counter::new("apples", 3)], 1, 4, false);
        assert_eq!(model.rows.len(), 2);

        let row = &model.rows[0];
        assert_eq!(row[0].label.as_deref(), Some("Apples: 3"));
        assert!(row[0].disabled);
        assert_eq!(
            row.iter().skip(1).map(|b| b.emoji).collect::<Vec<_>>(),
            vec![Some("🔼"), Some("🔽"), Some("❌")]
        );
        assert!(row.iter().skip(1).all(|b| !b.disabled));
        assert_eq!(
            model.content,
            "**Counters in Group: `Fruit`**\n*This is an interactive message.*"
        );
    }

    #[test]
    fn navigation_row_reflects_position() {
        let model = render_page("g", &counters(9), 2, 4, false);
        let nav = model.rows.last().unwrap();
        assert_eq!(nav[1].label.as_deref(), Some("Page 2/3"));
        assert!(!nav[0].disabled, "prev enabled on page 2");
        assert!(!nav[2].disabled, "next enabled on page 2");
        assert!(!nav[3].disabled);

        let first = render_page("g", &counters(9), 1, 4, false);
        assert!(first.rows.last().unwrap()[0].disabled);
        let last = render_page("g", &counters(9), 3, 4, false);
        assert!(last.rows.last().unwrap()[2].disabled);
        assert_eq!(last.rows.len(), 2, "one counter on the last page");
    }

    #[test]
    fn page_is_clamped() {
        assert_eq!(render_page("g", &counters(5), 0, 4, false).page, 1);
        assert_eq!(render_page("g", &counters(5), 7, 4, false).page, 2);
        assert_eq!(render_page("g", &[], 3, 4, false).page, 1);
    }

    #[test]
    fn locked_render_disables_every_control() {
        let model = render_page("g", &counters(6), 1, 4, true);
        assert_eq!(model.content, LOCKED_CONTENT);
        assert!(model.rows.iter().flatten().all(|b| b.disabled));
    }

    #[test]
    fn empty_group_shows_hint() {
        let model = render_page("veg", &[], 1, 4, false);
        assert!(model.content.contains("Use `/createcounter` to add one!"));
        assert_eq!(model.rows.len(), 1);
        assert_eq!(model.rows[0][1].label.as_deref(), Some("Page 1/1"));
    }

    #[test]
    fn smaller_page_size_is_honoured() {
        let model = render_page("g", &counters(3), 1, 2, false);
        assert_eq!(model.total_pages, 2);
        assert_eq!(model.rows.len(), 3);
        assert_eq!(render_page("g", &counters(8), 1, 9, false).rows.len(), 5);
    }

    #[test]
    fn controls_round_trip_with_page() {
        let controls = [
            Control::Increment {
                page: 2,
                name: "a:b".to_string(),
            },
            Control::Delete {
                page: 1,
                name: "pears".to_string(),
            },
            Control::Next { page: 3 },
            Control::Refresh { page: 1 },
        ];
        for control in controls {
            assert_eq!(Control::parse(&control.encode()), Some(control));
        }
    }

    #[test]
    fn foreign_ids_are_ignored() {
        assert_eq!(Control::parse("inc:apples"), None);
        assert_eq!(Control::parse("tally:inc:x:apples"), None);
        assert_eq!(Control::parse("tally:prev:1:extra"), None);
        assert_eq!(Control::parse("tally:confirm:yes"), None);
    }

    #[test]
    fn navigation_targets() {
        assert_eq!(Control::Previous { page: 2 }.target_page(), 1);
        assert_eq!(Control::Previous { page: 1 }.target_page(), 0);
        assert_eq!(Control::Next { page: 2 }.target_page(), 3);
        assert_eq!(Control::Refresh { page: 2 }.target_page(), 2);
    }

    #[test]
    fn rendered_page_is_recoverable_from_ids() {
        let model = render_page("g", &counters(9), 3, 4, false);
        let ids = model.rows.iter().flatten().map(|b| b.custom_id.as_str());
        assert_eq!(page_from_ids(ids), Some(3));
        assert_eq!(page_from_ids(["other", "x:y"]), None);
    }

    #[test]
    fn longest_names_fit_discord_limits() {
        let longest = "é".repeat(MAX_NAME_LEN);
        let counters: Vec<Counter> = (0..9)
            .map(|i| Counter::new(format!("{i}{}", &longest[2..]), i64::MIN))
            .collect();
        let model = render_page(&longest, &counters, 3, MAX_PAGE_SIZE, false);
        assert_eq!(model.page, 3);

        for button in model.rows.iter().flatten() {
            assert!(button.custom_id.chars().count() <= 100, "{}", button.custom_id);
            if let Some(label) = &button.label {
                assert!(label.chars().count() <= MAX_LABEL_LEN, "{label}");
            }
        }
    }

    #[test]
    fn oversized_labels_are_cut() {
        let long = Counter::new("x".repeat(120), 5);
        let model = render_page("fruit", &[long], 1, 4, false);
        let label = model.rows[0][0].label.as_deref().unwrap();
        assert_eq!(label.chars().count(), MAX_LABEL_LEN);
    }
}
