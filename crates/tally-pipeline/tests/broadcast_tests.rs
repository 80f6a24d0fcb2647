// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Refresh, purge, and startup reattachment.

use async_trait::async_trait;
use tally_core::{ActiveView, Counter, GroupKey};
use tally_pipeline::{AlwaysRemove, Job, ReattachReport, RefreshReport, StaleViewPolicy};
use tally_test_utils::PipelineHarness;

fn fruit() -> GroupKey {
    GroupKey::new(1, "fruit")
}

struct KeepAll;

#[async_trait]
impl StaleViewPolicy for KeepAll {
    async fn should_remove(&self, _view: &ActiveView) -> bool {
        false
    }
}

#[tokio::test]
async fn refresh_reconciles_missing_and_skips_failures() {
    let h = PipelineHarness::new().await.unwrap();
    h.run(Job::create_counter(fruit(), "apples")).await.unwrap();
    for id in [1, 2, 3] {
        h.add_view(id, &fruit()).await;
    }
    h.surface.mark_missing(2);
    h.surface.mark_failing(3);
    h.surface.clear();

    let report = h.pipeline.broadcaster().refresh_group(&fruit(), false).await;
    assert_eq!(
        report,
        RefreshReport {
            refreshed: 1,
            removed: 1,
            failed: 1
        }
    );

    let ids: Vec<u64> = h
        .store
        .list_active_views(&fruit())
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.message_id)
        .collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(
        h.surface.refreshes_of(1)[0].counters,
        vec![Counter::new("apples", 0)]
    );

    h.shutdown().await.unwrap();
}

#[tokio::test]
async fn refresh_of_group_without_views_is_empty() {
    let h = PipelineHarness::new().await.unwrap();
    let report = h.pipeline.broadcaster().refresh_group(&fruit(), true).await;
    assert_eq!(report, RefreshReport::default());
    h.shutdown().await.unwrap();
}

#[tokio::test]
async fn purge_is_best_effort() {
    let h = PipelineHarness::new().await.unwrap();
    for id in [1, 2, 3] {
        h.add_view(id, &fruit()).await;
    }
    h.surface.mark_missing(2);
    h.surface.mark_failing(3);

    let deleted = h.pipeline.broadcaster().purge_group(&fruit()).await;
    assert_eq!(deleted, 1);
    assert_eq!(h.surface.removed(), vec![1]);

    h.shutdown().await.unwrap();
}

#[tokio::test]
async fn reattach_removes_missing_views_by_default() {
    let h = PipelineHarness::new().await.unwrap();
    let veg = GroupKey::new(2, "veg");
    h.add_view(1, &fruit()).await;
    h.add_view(2, &veg).await;
    h.add_view(3, &veg).await;
    h.surface.mark_missing(3);

    let report = h.pipeline.broadcaster().reattach_all(&AlwaysRemove).await;
    assert_eq!(
        report,
        ReattachReport {
            refreshed: 2,
            removed: 1,
            kept: 0,
            failed: 0
        }
    );
    assert_eq!(h.store.list_all_active_views().await.unwrap().len(), 2);
    assert!(h.surface.refreshes().iter().all(|c| !c.locked));

    h.shutdown().await.unwrap();
}

#[tokio::test]
async fn reattach_keeps_views_when_policy_declines() {
    let h = PipelineHarness::new().await.unwrap();
    h.add_view(1, &fruit()).await;
    h.surface.mark_missing(1);

    let report = h.pipeline.broadcaster().reattach_all(&KeepAll).await;
    assert_eq!(report.kept, 1);
    assert_eq!(report.removed, 0);
    assert!(h.store.get_active_view(1).await.unwrap().is_some());

    h.shutdown().await.unwrap();
}
