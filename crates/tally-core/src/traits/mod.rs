// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod mirror;
pub mod store;
pub mod surface;

pub use adapter::PluginAdapter;
pub use mirror::RemoteMirror;
pub use store::CounterStore;
pub use surface::ViewSurface;
