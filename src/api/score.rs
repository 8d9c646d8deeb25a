// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credit score endpoints. All of them require a wallet session.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::auth::WalletSession;
use crate::models::UserRecord;
use crate::score::{self, ScoreFactors, MAX_SCORE, MIN_SCORE};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateScoreRequest {
    pub score: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateScoreResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeScoreResponse {
    pub credit_score: i64,
}

/// Fetch the caller's record, creating one with the default score on first
/// sight of the address.
#[utoipa::path(
    get,
    path = "/api/score",
    tag = "Score",
    responses(
        (status = 200, body = UserRecord),
        (status = 401, description = "No wallet session")
    )
)]
pub async fn get_score(
    WalletSession(address): WalletSession,
    State(state): State<AppState>,
) -> Json<UserRecord> {
    Json(state.repo.ensure_user(&address).await)
}

/// Persist a caller-supplied score.
///
/// Out-of-range scores are rejected here with a 400 envelope; repository
/// clamping is a second line of defense, not the contract.
#[utoipa::path(
    post,
    path = "/api/update-score",
    request_body = UpdateScoreRequest,
    tag = "Score",
    responses(
        (status = 200, body = UpdateScoreResponse),
        (status = 400, body = UpdateScoreResponse),
        (status = 401, description = "No wallet session")
    )
)]
pub async fn update_score(
    WalletSession(address): WalletSession,
    State(state): State<AppState>,
    Json(request): Json<UpdateScoreRequest>,
) -> (StatusCode, Json<UpdateScoreResponse>) {
    if !(MIN_SCORE..=MAX_SCORE).contains(&request.score) {
        return (
            StatusCode::BAD_REQUEST,
            Json(UpdateScoreResponse {
                success: false,
                message: Some(format!(
                    "Score must be between {MIN_SCORE} and {MAX_SCORE}"
                )),
            }),
        );
    }

    if state.repo.update_score(&address, request.score).await {
        info!(address = %address, score = request.score, "score updated");
        (
            StatusCode::OK,
            Json(UpdateScoreResponse {
                success: true,
                message: None,
            }),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(UpdateScoreResponse {
                success: false,
                message: Some("Failed to persist score".to_string()),
            }),
        )
    }
}

/// Recompute the caller's score from raw credit factors and persist it.
#[utoipa::path(
    post,
    path = "/api/recompute-score",
    request_body = ScoreFactors,
    tag = "Score",
    responses(
        (status = 200, body = RecomputeScoreResponse),
        (status = 401, description = "No wallet session")
    )
)]
pub async fn recompute_score(
    WalletSession(address): WalletSession,
    State(state): State<AppState>,
    Json(factors): Json<ScoreFactors>,
) -> Json<RecomputeScoreResponse> {
    let credit_score = score::compute(&factors);
    state.repo.update_score(&address, credit_score).await;
    info!(address = %address, score = credit_score, "score recomputed");
    Json(RecomputeScoreResponse { credit_score })
}
