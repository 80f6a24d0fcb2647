// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing error reports for failed commands and button presses.

use std::error::Error;
use std::fmt::Write as _;

use serenity::all::{Colour, Context, CreateEmbed, CreateEmbedFooter};
use tally_config::OperatingMode;
use tally_core::TallyError;
use tracing::{error, warn};

use crate::reply::Reply;

/// Embed field values are capped at this many characters.
pub const FIELD_LIMIT: usize = 1024;

pub const PRODUCTION_APOLOGY: &str =
    "Sorry, an unexpected error occurred. The developers have been automatically notified.";

const TRUNCATED: &str = "... (truncated)";
const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReport {
    /// Development: full detail in an embed.
    Crash {
        title: String,
        detail: String,
    },
    /// Production: a generic apology.
    Apology(String),
}

impl ErrorReport {
    pub fn build(mode: OperatingMode, command: &str, err: &(dyn Error + 'static)) -> Self {
        match mode {
            OperatingMode::Production => ErrorReport::Apology(PRODUCTION_APOLOGY.to_string()),
            OperatingMode::Development => ErrorReport::Crash {
                title: format!("💥 Crash Report in: `/{command}`"),
                detail: fenced(&error_chain(err)),
            },
        }
    }
}

/// The error and each of its sources, one per line.
pub fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(out, "\ncaused by: {cause}");
        source = cause.source();
    }
    out
}

/// Wraps `detail` in a code fence, truncating so the result fits one field.
pub fn fenced(detail: &str) -> String {
    let budget = FIELD_LIMIT - 2 * FENCE.len();
    if detail.chars().count() <= budget {
        return format!("{FENCE}{detail}{FENCE}");
    }
    let kept: String = detail.chars().take(budget - TRUNCATED.len()).collect();
    format!("{FENCE}{kept}{TRUNCATED}{FENCE}")
}

/// Logs `err` in full and tells the user, in the style `mode` calls for.
pub async fn send_error_report(
    ctx: &Context,
    reply: Reply<'_>,
    mode: OperatingMode,
    command: &str,
    err: &TallyError,
) {
    error!(command, error = %error_chain(err), "interaction failed");
    let report = ErrorReport::build(mode, command, err);

    let result = match report {
        ErrorReport::Apology(text) => reply.followup_text(ctx, &text).await.map(|_| ()),
        ErrorReport::Crash { title, detail } => {
            let embed = CreateEmbed::new()
                .title(title)
                .description("An unhandled error was caught by the error handler.")
                .colour(Colour::RED)
                .field("Error", detail, false)
                .footer(CreateEmbedFooter::new("This is a development-only error report."));
            reply.followup_embed(ctx, embed).await.map(|_| ())
        }
    };

    if let Err(e) = result {
        warn!(command, error = %e, "failed to deliver error report");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_future_can_cross_threads() {
        fn assert_send<T: Send>(_: T) {}
        fn check(ctx: &Context, reply: Reply<'_>, err: &TallyError) {
            assert_send(send_error_report(ctx, reply, OperatingMode::Production, "version", err));
        }
        let _ = check;
    }

    #[test]
    fn production_hides_detail() {
        let err = TallyError::Internal("secret path /var/db".into());
        let report = ErrorReport::build(OperatingMode::Production, "listcounters", &err);
        assert_eq!(report, ErrorReport::Apology(PRODUCTION_APOLOGY.to_string()));
    }

    #[test]
    fn development_names_the_command() {
        let err = TallyError::Internal("boom".into());
        let ErrorReport::Crash { title, detail } =
            ErrorReport::build(OperatingMode::Development, "createcounter", &err)
        else {
            panic!("expected a crash report");
        };
        assert_eq!(title, "💥 Crash Report in: `/createcounter`");
        assert_eq!(detail, "```internal error: boom```");
    }

    #[test]
    fn chain_includes_sources() {
        let err = TallyError::Storage {
            source: Box::new(std::io::Error::other("disk full")),
        };
        let chain = error_chain(&err);
        assert_eq!(chain, "storage error: disk full\ncaused by: disk full");
    }

    #[test]
    fn long_detail_is_truncated_to_field_limit() {
        let long = "é".repeat(5000);
        let out = fenced(&long);
        assert_eq!(out.chars().count(), FIELD_LIMIT);
        assert!(out.ends_with("... (truncated)```"));

        let exact = "x".repeat(FIELD_LIMIT - 6);
        assert_eq!(fenced(&exact).chars().count(), FIELD_LIMIT);
        assert!(!fenced(&exact).contains("truncated"));
    }
}
