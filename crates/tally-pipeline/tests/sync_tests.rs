// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mirror pull/push and the dirty-flag round-trip.

use std::sync::Arc;
use std::time::Duration;

use tally_config::model::StorageConfig;
use tally_core::{Counter, CounterStore, Delta, GroupKey};
use tally_pipeline::{Job, MirroredDatabase, PullOutcome, SyncOutcome, SyncScheduler};
use tally_storage::SqliteStore;
use tally_test_utils::{MockMirror, PipelineHarness};
use tokio_util::sync::CancellationToken;

const NAME: &str = "counters.db";

fn fruit() -> GroupKey {
    GroupKey::new(1, "fruit")
}

fn scheduler(h: &PipelineHarness, mirror: &Arc<MockMirror>) -> SyncScheduler {
    let database = Arc::new(MirroredDatabase::new(
        mirror.clone(),
        NAME,
        h.temp_dir().join("counters.db"),
    ));
    SyncScheduler::new(
        database,
        h.store.clone(),
        h.pipeline.state().clone(),
        Duration::from_secs(60),
    )
}

#[tokio::test]
async fn clean_store_is_not_uploaded() {
    let h = PipelineHarness::new().await.unwrap();
    let mirror = Arc::new(MockMirror::new());
    let sync = scheduler(&h, &mirror);

    assert_eq!(sync.sync_once().await, SyncOutcome::Clean);
    assert_eq!(mirror.upload_count(), 0);
    h.shutdown().await.unwrap();
}

#[tokio::test]
async fn dirty_flag_round_trip() {
    let h = PipelineHarness::new().await.unwrap();
    let mirror = Arc::new(MockMirror::new());
    let sync = scheduler(&h, &mirror);

    h.run(Job::create_counter(fruit(), "apples")).await.unwrap();
    assert!(h.pipeline.is_dirty());

    let SyncOutcome::Uploaded { id } = sync.sync_once().await else {
        panic!("expected an upload");
    };
    assert!(!h.pipeline.is_dirty());
    assert_eq!(mirror.ids_named(NAME), vec![id.clone()]);

    // Uploaded bytes are a readable SQLite database with the counter.
    let copy = h.temp_dir().join("downloaded.db");
    std::fs::write(&copy, mirror.contents(&id).unwrap()).unwrap();
    assert_eq!(counters_in(&copy).await, vec![Counter::new("apples", 0)]);

    assert_eq!(sync.sync_once().await, SyncOutcome::Clean);

    h.run(Job::update_counter(fruit(), "apples", Delta::Increment))
        .await
        .unwrap();
    mirror.set_failing(true);
    assert_eq!(sync.sync_once().await, SyncOutcome::Failed);
    assert!(h.pipeline.is_dirty(), "failed upload keeps the flag");

    mirror.set_failing(false);
    assert_eq!(sync.sync_once().await, SyncOutcome::Uploaded { id: id.clone() });
    assert_eq!(mirror.upload_count(), 2);
    assert_eq!(mirror.ids_named(NAME).len(), 1, "existing file updated in place");

    h.shutdown().await.unwrap();
}

async fn counters_in(path: &std::path::Path) -> Vec<Counter> {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.starts_with(b"SQLite format 3\0"));
    let store = SqliteStore::new(StorageConfig {
        database_path: path.to_string_lossy().into_owned(),
        wal_mode: false,
    });
    store.initialize().await.unwrap();
    let counters = store.list_counters(&fruit()).await.unwrap();
    store.close().await.unwrap();
    counters
}

#[tokio::test]
async fn stale_remote_id_is_looked_up_again() {
    let h = PipelineHarness::new().await.unwrap();
    let mirror = Arc::new(MockMirror::new());
    let sync = scheduler(&h, &mirror);

    h.run(Job::create_counter(fruit(), "apples")).await.unwrap();
    let SyncOutcome::Uploaded { id: first } = sync.sync_once().await else {
        panic!("expected an upload");
    };

    mirror.remove(&first);
    h.run(Job::create_counter(fruit(), "pears")).await.unwrap();
    let SyncOutcome::Uploaded { id: second } = sync.sync_once().await else {
        panic!("expected an upload after re-lookup");
    };
    assert_ne!(first, second);
    assert_eq!(mirror.ids_named(NAME), vec![second]);
    assert!(!h.pipeline.is_dirty());

    h.shutdown().await.unwrap();
}

#[tokio::test]
async fn pull_downloads_existing_remote() {
    let dir = tempfile::tempdir().unwrap();
    let mirror = Arc::new(MockMirror::new());
    let id = mirror.insert(NAME, b"remote bytes".to_vec());
    let local = dir.path().join("counters.db");

    let database = MirroredDatabase::new(mirror.clone(), NAME, &local);
    assert_eq!(database.pull().await.unwrap(), PullOutcome::Downloaded { id });
    assert_eq!(std::fs::read(&local).unwrap(), b"remote bytes");
}

#[tokio::test]
async fn pull_without_remote_leaves_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let mirror = Arc::new(MockMirror::new());
    let local = dir.path().join("counters.db");

    let database = MirroredDatabase::new(mirror, NAME, &local);
    assert_eq!(database.pull().await.unwrap(), PullOutcome::Missing);
    assert!(!local.exists());
}

#[tokio::test]
async fn pull_caches_remote_id_for_push() {
    let h = PipelineHarness::new().await.unwrap();
    let mirror = Arc::new(MockMirror::new());
    let id = mirror.insert(NAME, b"old".to_vec());
    let database = MirroredDatabase::new(mirror.clone(), NAME, h.temp_dir().join("other.db"));

    database.pull().await.unwrap();
    let lookups = mirror.lookup_count();
    assert_eq!(database.push(h.store.as_ref()).await.unwrap(), id);
    assert_eq!(mirror.lookup_count(), lookups, "no second lookup");

    h.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn scheduler_ticks_on_interval_until_cancelled() {
    let h = PipelineHarness::new().await.unwrap();
    let mirror = Arc::new(MockMirror::new());
    let sync = Arc::new(scheduler(&h, &mirror));
    h.pipeline.state().dirty.mark();

    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let sync = sync.clone();
        let cancel = cancel.clone();
        async move { sync.run(cancel).await }
    });

    tokio::time::sleep(Duration::from_secs(61)).await;
    // The upload itself runs on the database thread, outside the paused clock.
    for _ in 0..100 {
        if mirror.upload_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(mirror.upload_count(), 1);
    assert!(!h.pipeline.is_dirty());

    cancel.cancel();
    task.await.unwrap();
    h.shutdown().await.unwrap();
}

#[tokio::test]
async fn pull_discards_journal_left_by_unclean_stop() {
    let dir = tempfile::tempdir().unwrap();
    let storage = |path: std::path::PathBuf, wal_mode| StorageConfig {
        database_path: path.to_string_lossy().into_owned(),
        wal_mode,
    };

    // The remote copy holds the authoritative state.
    let remote_path = dir.path().join("remote.db");
    let remote = SqliteStore::new(storage(remote_path.clone(), false));
    remote.initialize().await.unwrap();
    remote.create_counter(&fruit(), "remote_only").await.unwrap();
    remote.close().await.unwrap();
    let mirror = Arc::new(MockMirror::new());
    mirror.insert(NAME, std::fs::read(&remote_path).unwrap());

    // A previous run crashed with uncheckpointed pages in its WAL.
    let crashed_dir = dir.path().join("crashed");
    std::fs::create_dir(&crashed_dir).unwrap();
    let crashed = SqliteStore::new(storage(crashed_dir.join(NAME), true));
    crashed.initialize().await.unwrap();
    crashed.create_counter(&fruit(), "local_only").await.unwrap();

    let live_dir = dir.path().join("live");
    std::fs::create_dir(&live_dir).unwrap();
    let local = live_dir.join(NAME);
    std::fs::copy(crashed_dir.join(NAME), &local).unwrap();
    std::fs::copy(
        crashed_dir.join("counters.db-wal"),
        live_dir.join("counters.db-wal"),
    )
    .unwrap();
    std::fs::write(live_dir.join("counters.db-shm"), b"").unwrap();

    let database = MirroredDatabase::new(mirror, NAME, &local);
    assert!(matches!(
        database.pull().await.unwrap(),
        PullOutcome::Downloaded { .. }
    ));
    assert!(!live_dir.join("counters.db-wal").exists());
    assert!(!live_dir.join("counters.db-shm").exists());

    let store = SqliteStore::new(storage(local, true));
    store.initialize().await.unwrap();
    assert_eq!(
        store.list_counters(&fruit()).await.unwrap(),
        vec![Counter::new("remote_only", 0)]
    );
    store.close().await.unwrap();
}
