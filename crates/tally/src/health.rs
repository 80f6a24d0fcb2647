// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Liveness endpoint for uptime monitors and hosting platforms.
//!
//! - `GET /` answers with a fixed text.
//! - `GET /health` reports uptime, queue depth and the dirty flag as JSON.

use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use serde::Serialize;
use tally_config::model::HealthConfig;
use tally_core::TallyError;
use tally_pipeline::Pipeline;
use tokio_util::sync::CancellationToken;

pub const ALIVE: &str = "Tally is alive!";

/// Shared state for the liveness handlers.
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Instant,
    pub version: &'static str,
    pub pipeline: Pipeline,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub queue_depth: usize,
    pub dirty: bool,
}

async fn get_root() -> &'static str {
    ALIVE
}

async fn get_health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: state.version,
        uptime_secs: state.start_time.elapsed().as_secs(),
        queue_depth: state.pipeline.queue_len(),
        dirty: state.pipeline.is_dirty(),
    })
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
        .with_state(state)
}

/// Serve the liveness routes until `cancel` fires.
pub async fn start_server(
    config: &HealthConfig,
    state: HealthState,
    cancel: CancellationToken,
) -> Result<(), TallyError> {
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TallyError::Channel {
            message: format!("failed to bind liveness server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("liveness server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| TallyError::Channel {
            message: format!("liveness server error: {e}"),
            source: Some(Box::new(e)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use http::{Request, StatusCode};
    use tally_core::GroupKey;
    use tally_pipeline::Job;
    use tally_test_utils::PipelineHarness;
    use tower::ServiceExt;

    fn state(pipeline: Pipeline) -> HealthState {
        HealthState {
            start_time: Instant::now(),
            version: "0.1.0",
            pipeline,
        }
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn root_says_alive() {
        let h = PipelineHarness::new().await.unwrap();
        let (status, body) = get_body(router(state(h.pipeline.clone())), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, ALIVE);
    }

    #[tokio::test]
    async fn health_reports_clean_idle_pipeline() {
        let h = PipelineHarness::new().await.unwrap();
        let (status, body) = get_body(router(state(h.pipeline.clone())), "/health").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], "0.1.0");
        assert_eq!(json["queue_depth"], 0);
        assert_eq!(json["dirty"], false);
    }

    #[tokio::test]
    async fn health_reports_dirty_after_a_mutation() {
        let h = PipelineHarness::new().await.unwrap();
        let outcome = h
            .run(Job::create_counter(GroupKey::new(1, "fruit"), "apples"))
            .await;
        assert!(outcome.is_ok());

        let (_, body) = get_body(router(state(h.pipeline.clone())), "/health").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["dirty"], true);
    }

    #[tokio::test]
    async fn health_reports_queued_jobs() {
        let h = PipelineHarness::builder().paused().build().await.unwrap();
        h.pipeline
            .submit(Job::create_counter(GroupKey::new(1, "fruit"), "apples"))
            .unwrap();
        h.pipeline
            .submit(Job::create_counter(GroupKey::new(1, "fruit"), "pears"))
            .unwrap();

        let (_, body) = get_body(router(state(h.pipeline.clone())), "/health").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["queue_depth"], 2);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let h = PipelineHarness::new().await.unwrap();
        let (status, _) = get_body(router(state(h.pipeline.clone())), "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
