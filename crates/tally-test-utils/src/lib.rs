// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tally integration tests.
//!
//! # Components
//!
//! - [`MockSurface`] - records refreshes and deletions, with injectable missing messages
//! - [`MockMirror`] - in-memory remote file store with a failure switch
//! - [`FaultyStore`] - wraps a real store and fails or panics on demand
//! - [`PipelineHarness`] - a temp SQLite store, mock surface, and running worker

pub mod faulty_store;
pub mod harness;
pub mod mock_mirror;
pub mod mock_surface;

pub use faulty_store::FaultyStore;
pub use harness::PipelineHarness;
pub use mock_mirror::MockMirror;
pub use mock_surface::{MockSurface, RefreshCall};
