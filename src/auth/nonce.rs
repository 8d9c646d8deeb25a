// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-use nonce ledger for the SIWE handshake.
//!
//! Nonces are 32 lowercase hex characters, live for five minutes, and are
//! consumed on the first verification attempt regardless of outcome. The
//! ledger is a bounded LRU so an attacker spraying `/api/nonce` cannot grow
//! memory without bound; evicted nonces simply fail verification.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use uuid::Uuid;

/// Nonce lifetime.
pub const NONCE_TTL: Duration = Duration::from_secs(300);

/// Maximum outstanding nonces before LRU eviction kicks in.
const CAPACITY: usize = 10_000;

pub struct NonceStore {
    nonces: Mutex<LruCache<String, Instant>>,
    ttl: Duration,
}

impl Default for NonceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceStore {
    pub fn new() -> Self {
        Self::with_ttl(NONCE_TTL)
    }

    fn with_ttl(ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            nonces: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Mint a fresh nonce and record its issue time.
    pub fn issue(&self) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        self.nonces
            .lock()
            .expect("nonce ledger lock poisoned")
            .put(nonce.clone(), Instant::now());
        nonce
    }

    /// Consume a nonce. Returns `true` only for a known, unexpired nonce,
    /// and only on its first consumption.
    pub fn consume(&self, nonce: &str) -> bool {
        let issued_at = self
            .nonces
            .lock()
            .expect("nonce ledger lock poisoned")
            .pop(nonce);
        match issued_at {
            Some(issued_at) => issued_at.elapsed() <= self.ttl,
            None => false,
        }
    }

    /// Outstanding (not yet consumed) nonce count.
    pub fn outstanding(&self) -> usize {
        self.nonces.lock().expect("nonce ledger lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_nonce_is_hex_without_hyphens() {
        let store = NonceStore::new();
        let nonce = store.issue();
        assert_eq!(nonce.len(), 32);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!nonce.contains('-'));
    }

    #[test]
    fn nonce_is_single_use() {
        let store = NonceStore::new();
        let nonce = store.issue();

        assert!(store.consume(&nonce));
        assert!(!store.consume(&nonce));
        assert_eq!(store.outstanding(), 0);
    }

    #[test]
    fn unknown_nonce_is_rejected() {
        let store = NonceStore::new();
        assert!(!store.consume("deadbeef"));
    }

    #[test]
    fn expired_nonce_is_rejected() {
        let store = NonceStore::with_ttl(Duration::ZERO);
        let nonce = store.issue();
        std::thread::sleep(Duration::from_millis(5));
        assert!(!store.consume(&nonce));
    }

    #[test]
    fn nonces_are_unique() {
        let store = NonceStore::new();
        assert_ne!(store.issue(), store.issue());
    }
}
