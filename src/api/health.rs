// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;
use crate::storage::RemoteStore;

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall status ("ok" or "degraded").
    pub status: String,
    /// Individual checks and their results.
    pub checks: ReadyChecks,
}

/// Individual readiness check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyChecks {
    /// Local cache read/write probe.
    pub local_cache: String,
    /// Remote store reachability. Absent when the remote tier is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_store: Option<String>,
    /// Records waiting for a successful remote write.
    pub pending_writes: usize,
}

/// Liveness probe. Always 200 while the process runs.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe.
///
/// Returns 503 only when the local cache fails its probe; an unreachable
/// remote store degrades the status but does not fail readiness, since the
/// service keeps working from the cache.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, body = ReadyResponse),
        (status = 503, body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let local_ok = state.repo.local().health_check().is_ok();

    let remote_store = match state.repo.remote() {
        Some(remote) => Some(match remote.ping().await {
            Ok(()) => "ok".to_string(),
            Err(_) => "unreachable".to_string(),
        }),
        None => None,
    };

    let degraded = !local_ok || remote_store.as_deref() == Some("unreachable");
    let response = ReadyResponse {
        status: if degraded { "degraded" } else { "ok" }.to_string(),
        checks: ReadyChecks {
            local_cache: if local_ok { "ok" } else { "failed" }.to_string(),
            remote_store,
            pending_writes: state.repo.pending_len(),
        },
    };

    let status = if local_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
