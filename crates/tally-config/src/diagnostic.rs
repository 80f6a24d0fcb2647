// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.

use miette::Diagnostic;
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error rendered through miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}` (from {origin})")]
    #[diagnostic(
        code(tally::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// Dotted path, e.g. `mirror.foldr_id`.
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        /// The file or environment variable set that supplied the key.
        origin: String,
    },

    #[error("invalid value for `{key}`: found {found}")]
    #[diagnostic(code(tally::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
    },

    /// A key with no default that the requested command cannot run without.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(tally::config::missing_key),
        help("set `{key}` in tally.toml or via {env}")
    )]
    MissingKey { key: String, env: String },

    #[error("validation error: {message}")]
    #[diagnostic(code(tally::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(tally::config::other))]
    Other(String),
}

impl ConfigError {
    /// Missing-key error whose help names the matching `TALLY_*` variable.
    pub fn missing(key: &str) -> Self {
        ConfigError::MissingKey {
            key: key.to_string(),
            env: format!("TALLY_{}", key.replace('.', "_").to_uppercase()),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys here: {valid_keys}"),
        None => format!("valid keys here: {valid_keys}"),
    }
}

/// Convert a `figment::Error` into one `ConfigError` per underlying failure.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let prefix = section_prefix(&error);
                ConfigError::UnknownKey {
                    key: format!("{prefix}{field}"),
                    suggestion: suggest_key(field, expected).map(|s| format!("{prefix}{s}")),
                    valid_keys: expected.join(", "),
                    origin: origin(&error),
                }
            }
            Kind::MissingField(field) => {
                ConfigError::missing(&format!("{}{field}", section_prefix(&error)))
            }
            Kind::InvalidType(found, expected) | Kind::InvalidValue(found, expected) => {
                ConfigError::InvalidType {
                    key: section_prefix(&error).trim_end_matches('.').to_string(),
                    found: found.to_string(),
                    expected: expected.clone(),
                }
            }
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// `mirror.` for an error inside `[mirror]`, empty at the top level.
fn section_prefix(error: &figment::error::Error) -> String {
    error.path.iter().map(|segment| format!("{segment}.")).collect()
}

/// Where the offending value came from, as far as figment knows.
fn origin(error: &figment::error::Error) -> String {
    match &error.metadata {
        Some(meta) => match &meta.source {
            Some(source) => source.to_string(),
            None => meta.name.to_string(),
        },
        None => "defaults".to_string(),
    }
}

/// Suggest the closest valid key above the similarity threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print each error to stderr as a miette report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut report = String::new();
        match handler.render_report(&mut report, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{report}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
