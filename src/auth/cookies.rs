// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cookie handling for the SIWE handshake and wallet session.
//!
//! Two cookies carry all session state: the short-lived `siwe` nonce cookie
//! set when a login attempt starts, and the `wallet_address` session cookie
//! set after a verified sign-in. Both are HttpOnly and path-wide.

use axum::http::{header::COOKIE, HeaderMap};

/// Nonce cookie name used during the SIWE round trip.
pub const SIWE_COOKIE: &str = "siwe";

/// Session cookie name holding the authenticated wallet address.
pub const SESSION_COOKIE: &str = "wallet_address";

/// Nonce cookie lifetime: 5 minutes.
pub const NONCE_MAX_AGE: u64 = 300;

/// Session cookie lifetime: 7 days.
pub const SESSION_MAX_AGE: u64 = 604_800;

/// Read a cookie value from the request headers.
pub fn get(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get_all(COOKIE).iter().find_map(|value| {
        let value = value.to_str().ok()?;
        value.split(';').find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key == name).then(|| val.to_string())
        })
    })
}

/// Build a `Set-Cookie` value for an HttpOnly session-scoped cookie.
///
/// `secure` adds the `Secure` attribute; deployments behind TLS set it via
/// `SECURE_COOKIES` so the session cookie never travels over plain HTTP.
pub fn set(name: &str, value: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{name}={value}; Max-Age={max_age}; Path=/; HttpOnly; SameSite=Lax{secure}")
}

/// Build a `Set-Cookie` value that expires the cookie immediately.
pub fn clear(name: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{name}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax{secure}")
}
