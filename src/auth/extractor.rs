// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the authenticated wallet session.
//!
//! Use the `WalletSession` extractor in handlers that require a signed-in
//! wallet:
//!
//! ```rust,ignore
//! async fn my_handler(WalletSession(address): WalletSession) -> impl IntoResponse {
//!     // address is the authenticated WalletAddress
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::cookies::{self, SESSION_COOKIE};
use crate::error::ApiError;
use crate::models::WalletAddress;

/// Extractor yielding the wallet address from the session cookie.
///
/// Rejects with 401 when the cookie is absent. The cookie is set only by a
/// verified SIWE sign-in, so its presence is the session proof.
#[derive(Debug)]
pub struct WalletSession(pub WalletAddress);

impl<S> FromRequestParts<S> for WalletSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        cookies::get(&parts.headers, SESSION_COOKIE)
            .filter(|value| !value.is_empty())
            .map(|address| WalletSession(WalletAddress(address)))
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}
