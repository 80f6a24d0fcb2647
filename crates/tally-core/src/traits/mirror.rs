// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote mirror trait for off-process backups of the store.

use std::path::Path;

use async_trait::async_trait;

use crate::error::TallyError;
use crate::traits::adapter::PluginAdapter;

/// Remote file storage holding the backup copy of the database.
///
/// The mirror is last-writer-wins and never a second source of truth
/// while the process is running.
#[async_trait]
pub trait RemoteMirror: PluginAdapter {
    /// Verifies credentials against the remote service.
    async fn authenticate(&self) -> Result<(), TallyError>;

    /// Looks up a remote file by name, returning its identifier.
    async fn find_by_name(&self, name: &str) -> Result<Option<String>, TallyError>;

    /// Downloads the remote file `id` to `dest`, replacing it.
    async fn download(&self, id: &str, dest: &Path) -> Result<(), TallyError>;

    /// Uploads `source` under `name`, returning the remote identifier.
    ///
    /// With `existing_id` the remote file is overwritten in place; a stale id
    /// fails with [`TallyError::NotFound`].
    async fn upload(
        &self,
        source: &Path,
        name: &str,
        existing_id: Option<&str>,
    ) -> Result<String, TallyError>;
}
