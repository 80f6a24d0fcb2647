// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tally counter bot.
//!
//! This crate provides the trait definitions, error types, and common types
//! shared by the store, the mutation pipeline, and the adapters.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{TallyError, ViewError};
pub use types::{ActiveView, AdapterType, Counter, Delta, GroupKey, HealthStatus};

pub use traits::{CounterStore, PluginAdapter, RemoteMirror, ViewSurface};
