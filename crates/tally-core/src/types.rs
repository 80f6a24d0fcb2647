// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the store, the pipeline, and the adapters.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Addresses one group of counters: a group name scoped to a guild.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub guild_id: u64,
    pub group: String,
}

impl GroupKey {
    pub fn new(guild_id: u64, group: impl Into<String>) -> Self {
        Self {
            guild_id,
            group: group.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.guild_id, self.group)
    }
}

/// A named counter and its current value, as listed for a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub name: String,
    pub value: i64,
}

impl Counter {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One live, externally rendered presentation of a group.
///
/// Identified by the message handle issued by the chat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveView {
    pub message_id: u64,
    pub channel_id: u64,
    pub guild_id: u64,
    pub group_name: String,
}

impl ActiveView {
    /// The group this presentation displays.
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.guild_id, self.group_name.clone())
    }
}

/// Direction of a single-step counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Delta {
    #[strum(serialize = "inc")]
    #[serde(rename = "inc")]
    Increment,
    #[strum(serialize = "dec")]
    #[serde(rename = "dec")]
    Decrement,
}

impl Delta {
    /// The signed amount applied to the counter value.
    pub fn amount(self) -> i64 {
        match self {
            Delta::Increment => 1,
            Delta::Decrement => -1,
        }
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Store,
    Surface,
    Mirror,
}
