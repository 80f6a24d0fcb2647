// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory remote mirror.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tally_core::{AdapterType, HealthStatus, PluginAdapter, RemoteMirror, TallyError};

#[derive(Debug, Clone)]
struct RemoteFile {
    name: String,
    bytes: Vec<u8>,
}

/// Remote storage held in a map of id to file.
#[derive(Default)]
pub struct MockMirror {
    files: Mutex<HashMap<String, RemoteFile>>,
    next_id: AtomicU64,
    failing: AtomicBool,
    uploads: AtomicUsize,
    lookups: AtomicUsize,
}

impl MockMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a remote file, returning its id.
    pub fn insert(&self, name: &str, bytes: Vec<u8>) -> String {
        let id = self.allocate_id();
        self.files().insert(
            id.clone(),
            RemoteFile {
                name: name.to_string(),
                bytes,
            },
        );
        id
    }

    /// Delete a remote file behind the client's back.
    pub fn remove(&self, id: &str) {
        self.files().remove(id);
    }

    /// Make every remote call fail until switched off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn contents(&self, id: &str) -> Option<Vec<u8>> {
        self.files().get(id).map(|f| f.bytes.clone())
    }

    pub fn ids_named(&self, name: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .files()
            .iter()
            .filter(|(_, f)| f.name == name)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Successful uploads so far.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn allocate_id(&self) -> String {
        format!("file-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn files(&self) -> std::sync::MutexGuard<'_, HashMap<String, RemoteFile>> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_failing(&self) -> Result<(), TallyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TallyError::Mirror {
                message: "mock mirror unavailable".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

fn io_err(e: std::io::Error) -> TallyError {
    TallyError::Mirror {
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl PluginAdapter for MockMirror {
    fn name(&self) -> &str {
        "mock-mirror"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mirror
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        if self.failing.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("failing".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        Ok(())
    }
}

#[async_trait]
impl RemoteMirror for MockMirror {
    async fn authenticate(&self) -> Result<(), TallyError> {
        self.check_failing()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<String>, TallyError> {
        self.check_failing()?;
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.ids_named(name).into_iter().next())
    }

    async fn download(&self, id: &str, dest: &Path) -> Result<(), TallyError> {
        self.check_failing()?;
        let bytes = self
            .contents(id)
            .ok_or_else(|| TallyError::NotFound(format!("remote file {id}")))?;
        tokio::fs::write(dest, bytes).await.map_err(io_err)
    }

    async fn upload(
        &self,
        source: &Path,
        name: &str,
        existing_id: Option<&str>,
    ) -> Result<String, TallyError> {
        self.check_failing()?;
        let bytes = tokio::fs::read(source).await.map_err(io_err)?;

        let id = match existing_id {
            Some(id) => {
                let mut files = self.files();
                let file = files
                    .get_mut(id)
                    .ok_or_else(|| TallyError::NotFound(format!("remote file {id}")))?;
                file.bytes = bytes;
                id.to_string()
            }
            None => self.insert(name, bytes),
        };
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_find_and_download() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.db");
        tokio::fs::write(&src, b"v1").await.unwrap();

        let mirror = MockMirror::new();
        let id = mirror.upload(&src, "counters.db", None).await.unwrap();
        assert_eq!(mirror.find_by_name("counters.db").await.unwrap(), Some(id.clone()));

        let dest = dir.path().join("dest.db");
        mirror.download(&id, &dest).await.unwrap();
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"v1");
    }

    #[tokio::test]
    async fn stale_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.db");
        tokio::fs::write(&src, b"v1").await.unwrap();

        let mirror = MockMirror::new();
        let err = mirror
            .upload(&src, "counters.db", Some("file-404"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn failing_switch_fails_every_call() {
        let mirror = MockMirror::new();
        mirror.set_failing(true);
        assert!(mirror.authenticate().await.is_err());
        assert!(mirror.find_by_name("x").await.is_err());
    }
}
