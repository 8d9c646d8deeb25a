// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Core record types shared by the API layer and both storage tiers. All
//! types derive `Serialize`, `Deserialize`, and `ToSchema` for automatic
//! JSON handling and OpenAPI documentation.
//!
//! ## Wallet Address Type
//!
//! The [`WalletAddress`] newtype wraps Ethereum-style addresses (0x-prefixed,
//! 40 hex characters). Addresses are compared case-insensitively; the
//! lowercase form is the canonical storage key.
//!
//! ## Wire Format
//!
//! [`UserRecord`] serializes with camelCase field names (`walletAddress`,
//! `creditScore`, ...) matching the `users` collection document layout used
//! by existing clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::score::{self, DEFAULT_SCORE};

// =============================================================================
// Wallet Address Type
// =============================================================================

/// Ethereum-compatible wallet address wrapper.
///
/// Provides type safety for wallet addresses throughout the API.
/// Format: `0x` followed by 40 hexadecimal characters (20 bytes).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    /// Canonical (lowercase) form used as the storage key in both tiers.
    pub fn canonical(&self) -> String {
        self.0.to_lowercase()
    }

    /// Case-insensitive equality against a raw address string.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(value: String) -> Self {
        WalletAddress(value)
    }
}

impl From<&str> for WalletAddress {
    fn from(value: &str) -> Self {
        WalletAddress(value.to_string())
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

// =============================================================================
// User Record
// =============================================================================

/// A user's credit score record.
///
/// One record per wallet address; the address is the document key in the
/// remote `users` collection and the blob key in the local cache. The score
/// is always within `[300, 900]` — constructors and the repository clamp on
/// every write. There is no deletion path.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// The wallet address that owns this record.
    pub wallet_address: WalletAddress,
    /// Current credit score, clamped to `[300, 900]`.
    pub credit_score: i64,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
    /// Whether the user has verified with a World ID orb.
    #[serde(default)]
    pub orb_verified: bool,
    /// Whether the user has linked a MetaMask account.
    #[serde(default)]
    pub metamask_connected: bool,
}

impl UserRecord {
    /// Build a record for a never-seen address with the default score.
    pub fn new(wallet_address: WalletAddress) -> Self {
        Self {
            wallet_address,
            credit_score: DEFAULT_SCORE,
            updated_at: Utc::now(),
            orb_verified: false,
            metamask_connected: false,
        }
    }

    /// Apply a new score, clamped, and bump the update timestamp.
    pub fn with_score(mut self, credit_score: i64) -> Self {
        self.credit_score = score::clamp(credit_score);
        self.updated_at = Utc::now();
        self
    }
}
