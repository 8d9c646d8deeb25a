// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet authentication: SIWE verification and session plumbing.
//!
//! The handshake is cookie-bound. `/api/nonce` mints a nonce, records it in
//! the [`NonceStore`] ledger, and mirrors it into the short-lived `siwe`
//! cookie; `/api/complete-siwe` requires the signed message's nonce to match
//! both the cookie and the ledger before checking the signature. A verified
//! sign-in sets the week-long `wallet_address` session cookie that the
//! [`WalletSession`] extractor reads.

pub mod cookies;
pub mod extractor;
pub mod nonce;
pub mod siwe;

pub use extractor::WalletSession;
pub use nonce::NonceStore;
pub use siwe::{SiweFailure, WalletAuthPayload};
