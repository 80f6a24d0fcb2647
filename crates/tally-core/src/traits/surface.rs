// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! View surface trait for the channel that displays counter groups.

use async_trait::async_trait;

use crate::error::ViewError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ActiveView, Counter};

/// The remote channel where presentations of a group live.
///
/// Implementations fetch the message addressed by an [`ActiveView`] and
/// report [`ViewError::NotFound`] when it has been deleted out-of-band.
#[async_trait]
pub trait ViewSurface: PluginAdapter {
    /// Re-renders an existing presentation with `counters`.
    ///
    /// When `locked` is set, every interactive control renders disabled.
    async fn refresh(
        &self,
        view: &ActiveView,
        counters: &[Counter],
        locked: bool,
    ) -> Result<(), ViewError>;

    /// Deletes the presentation from the channel.
    async fn remove(&self, view: &ActiveView) -> Result<(), ViewError>;
}
