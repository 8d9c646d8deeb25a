// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SIWE handshake endpoints.
//!
//! `/api/complete-siwe` always answers HTTP 200: verification outcomes ride
//! in the response envelope (`status` / `isValid` / `message`) so wallet
//! clients can distinguish "your signature is bad" from transport failures.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderName},
    response::AppendHeaders,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::auth::cookies::{
    self, NONCE_MAX_AGE, SESSION_COOKIE, SESSION_MAX_AGE, SIWE_COOKIE,
};
use crate::auth::siwe::{self, SiweFailure, WalletAuthPayload};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct NonceResponse {
    pub nonce: String,
}

/// Body of `/api/complete-siwe`: the wallet's signed payload plus the nonce
/// the client received from `/api/nonce`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteSiweRequest {
    pub payload: WalletAuthPayload,
    pub nonce: String,
}

/// Verification envelope. Mirrors the wallet payload's `status` convention.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiweVerificationResponse {
    pub status: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SiweVerificationResponse {
    fn valid() -> Self {
        Self {
            status: "success".to_string(),
            is_valid: true,
            message: None,
        }
    }

    fn invalid(failure: SiweFailure) -> Self {
        Self {
            status: "error".to_string(),
            is_valid: false,
            message: Some(failure.to_string()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Start a sign-in attempt: mint a nonce and bind it to the client.
///
/// The nonce is recorded in the server-side ledger and mirrored into the
/// short-lived `siwe` cookie that `/api/complete-siwe` checks against.
#[utoipa::path(
    get,
    path = "/api/nonce",
    tag = "Auth",
    responses((status = 200, body = NonceResponse))
)]
pub async fn get_nonce(
    State(state): State<AppState>,
) -> (AppendHeaders<[(HeaderName, String); 1]>, Json<NonceResponse>) {
    let nonce = state.nonces.issue();
    let cookie = cookies::set(SIWE_COOKIE, &nonce, NONCE_MAX_AGE, state.config.secure_cookies);
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(NonceResponse { nonce }),
    )
}

/// Verify a signed SIWE message and establish the wallet session.
#[utoipa::path(
    post,
    path = "/api/complete-siwe",
    request_body = CompleteSiweRequest,
    tag = "Auth",
    responses((status = 200, body = SiweVerificationResponse))
)]
pub async fn complete_siwe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CompleteSiweRequest>,
) -> (
    AppendHeaders<Vec<(HeaderName, String)>>,
    Json<SiweVerificationResponse>,
) {
    let secure = state.config.secure_cookies;
    match verify_attempt(&state, &headers, &request).await {
        Ok(address) => {
            info!(address = %address, "wallet signed in");
            let set_cookies = vec![
                (SET_COOKIE, cookies::set(SESSION_COOKIE, &address, SESSION_MAX_AGE, secure)),
                (SET_COOKIE, cookies::clear(SIWE_COOKIE, secure)),
            ];
            (
                AppendHeaders(set_cookies),
                Json(SiweVerificationResponse::valid()),
            )
        }
        Err(failure) => {
            warn!(address = %request.payload.address, %failure, "sign-in rejected");
            (
                AppendHeaders(Vec::new()),
                Json(SiweVerificationResponse::invalid(failure)),
            )
        }
    }
}

/// The cookie-binding and nonce-ledger checks run before any signature
/// work; the nonce is consumed on the first attempt whatever the outcome.
async fn verify_attempt(
    state: &AppState,
    headers: &HeaderMap,
    request: &CompleteSiweRequest,
) -> Result<String, SiweFailure> {
    let cookie_nonce = cookies::get(headers, SIWE_COOKIE).ok_or(SiweFailure::InvalidNonce)?;
    if request.nonce != cookie_nonce {
        return Err(SiweFailure::InvalidNonce);
    }
    if state.config.strict_nonce && !state.nonces.consume(&request.nonce) {
        return Err(SiweFailure::InvalidNonce);
    }

    let parsed = siwe::validate(&request.payload, Utc::now())?;
    if parsed.nonce != request.nonce {
        return Err(SiweFailure::InvalidNonce);
    }

    // A fresh sign-in guarantees a score record exists for the wallet.
    let record = state
        .repo
        .ensure_user(&request.payload.address.as_str().into())
        .await;
    Ok(record.wallet_address.0)
}

/// Drop the wallet session.
#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "Auth",
    responses((status = 200, body = LogoutResponse))
)]
pub async fn logout(
    State(state): State<AppState>,
) -> (AppendHeaders<[(HeaderName, String); 2]>, Json<LogoutResponse>) {
    let secure = state.config.secure_cookies;
    (
        AppendHeaders([
            (SET_COOKIE, cookies::clear(SESSION_COOKIE, secure)),
            (SET_COOKIE, cookies::clear(SIWE_COOKIE, secure)),
        ]),
        Json(LogoutResponse { success: true }),
    )
}
