// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::WalletAuthPayload,
    models::{UserRecord, WalletAddress},
    score::ScoreFactors,
    state::AppState,
};

pub mod auth;
pub mod health;
pub mod score;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/nonce", get(auth::get_nonce))
        .route("/complete-siwe", post(auth::complete_siwe))
        .route("/logout", post(auth::logout))
        .route("/score", get(score::get_score))
        .route("/update-score", post(score::update_score))
        .route("/recompute-score", post(score::recompute_score))
        .with_state(state.clone());

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health::health))
        .route("/ready", get(health::ready).with_state(state))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::get_nonce,
        auth::complete_siwe,
        auth::logout,
        score::get_score,
        score::update_score,
        score::recompute_score,
        health::health,
        health::ready
    ),
    components(
        schemas(
            WalletAddress,
            UserRecord,
            WalletAuthPayload,
            ScoreFactors,
            auth::NonceResponse,
            auth::CompleteSiweRequest,
            auth::SiweVerificationResponse,
            auth::LogoutResponse,
            score::UpdateScoreRequest,
            score::UpdateScoreResponse,
            score::RecomputeScoreResponse,
            health::HealthResponse,
            health::ReadyResponse,
            health::ReadyChecks
        )
    ),
    tags(
        (name = "Auth", description = "SIWE wallet authentication"),
        (name = "Score", description = "Credit score storage and computation"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
