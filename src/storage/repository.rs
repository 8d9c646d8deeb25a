// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dual-write user repository.
//!
//! Reads prefer the remote document store and mirror hits into the local
//! cache; any remote failure or absence falls back to the cache. Writes land
//! locally first (the durability floor), then propagate to the remote tier;
//! a failed remote write parks the record in an in-memory pending queue that
//! the retry flusher drains once connectivity returns.
//!
//! Callers never see remote errors: a write reports success as long as the
//! local tier accepted it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::models::{UserRecord, WalletAddress};
use crate::score;
use crate::storage::local::LocalCache;
use crate::storage::remote::{RemoteStore, StoreError};

pub struct UserRepository {
    local: LocalCache,
    remote: Option<Arc<dyn RemoteStore>>,
    /// Latest unsynced record per canonical address.
    pending: Mutex<HashMap<String, UserRecord>>,
    /// Addresses already ensured this process lifetime.
    ensured: Mutex<HashSet<String>>,
}

impl UserRepository {
    pub fn new(local: LocalCache, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self {
            local,
            remote,
            pending: Mutex::new(HashMap::new()),
            ensured: Mutex::new(HashSet::new()),
        }
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// Number of records waiting for a successful remote write.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().expect("pending lock poisoned").len()
    }

    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteStore>> {
        self.remote.as_ref()
    }

    /// Fetch a record, remote-first with local fallback.
    pub async fn get(&self, address: &WalletAddress) -> Option<UserRecord> {
        if let Some(remote) = &self.remote {
            match remote.get_user(address).await {
                Ok(Some(record)) => {
                    // Mirror the authoritative copy so the fallback stays warm.
                    if let Err(e) = self.local.put_user(&record) {
                        warn!(address = %address, error = %e, "failed to mirror remote record locally");
                    }
                    return Some(record);
                }
                Ok(None) => {
                    debug!(address = %address, "no remote record, trying local cache");
                }
                Err(e) => {
                    warn!(address = %address, error = %e, "remote read failed, falling back to local cache");
                }
            }
        }

        match self.local.get_user(address) {
            Ok(record) => record,
            Err(e) => {
                warn!(address = %address, error = %e, "local cache read failed");
                None
            }
        }
    }

    /// Persist a record to both tiers. Returns `true` when the local tier
    /// accepted the write; remote failures only queue the record.
    pub async fn save(&self, record: UserRecord) -> bool {
        let record = UserRecord {
            credit_score: score::clamp(record.credit_score),
            ..record
        };

        if let Err(e) = self.local.put_user(&record) {
            warn!(address = %record.wallet_address, error = %e, "local cache write failed");
            return false;
        }

        self.propagate(record).await;
        true
    }

    /// Update only the score of an existing record.
    ///
    /// Locally this rewrites the full record (creating it with defaults when
    /// the address was never cached). Remotely it is a field-level update;
    /// a missing document falls back to a full create.
    pub async fn update_score(&self, address: &WalletAddress, credit_score: i64) -> bool {
        let credit_score = score::clamp(credit_score);

        let record = match self.local.get_user(address) {
            Ok(Some(existing)) => existing.with_score(credit_score),
            Ok(None) => UserRecord::new(address.clone()).with_score(credit_score),
            Err(e) => {
                warn!(address = %address, error = %e, "local cache read failed");
                UserRecord::new(address.clone()).with_score(credit_score)
            }
        };

        if let Err(e) = self.local.put_user(&record) {
            warn!(address = %address, error = %e, "local cache write failed");
            return false;
        }

        if let Some(remote) = &self.remote {
            match remote.update_score(address, credit_score).await {
                Ok(()) => {}
                Err(StoreError::NotFound(_)) => {
                    debug!(address = %address, "remote record missing, creating it");
                    self.propagate(record).await;
                }
                Err(e) => {
                    warn!(address = %address, error = %e, "remote score update failed, queueing");
                    self.queue(record);
                }
            }
        }
        true
    }

    /// Return the record for an address, creating one with the default score
    /// on first sight. Creation is deduplicated per process lifetime.
    pub async fn ensure_user(&self, address: &WalletAddress) -> UserRecord {
        let key = address.canonical();
        let already_ensured = self
            .ensured
            .lock()
            .expect("ensured lock poisoned")
            .contains(&key);

        if let Some(record) = self.get(address).await {
            if !already_ensured {
                self.ensured
                    .lock()
                    .expect("ensured lock poisoned")
                    .insert(key);
            }
            return record;
        }

        let record = UserRecord::new(address.clone());
        if already_ensured {
            // Created earlier this lifetime but both tiers lost it; recreate.
            warn!(address = %address, "ensured record missing from both tiers");
        }
        self.save(record.clone()).await;
        self.ensured
            .lock()
            .expect("ensured lock poisoned")
            .insert(key);
        record
    }

    /// Replay queued records against the remote tier.
    ///
    /// Returns the number of records written. Records that fail again are
    /// re-queued unless a newer write superseded them in the meantime.
    pub async fn flush_pending(&self) -> usize {
        let Some(remote) = &self.remote else {
            return 0;
        };

        let drained: Vec<(String, UserRecord)> = {
            let mut pending = self.pending.lock().expect("pending lock poisoned");
            pending.drain().collect()
        };
        if drained.is_empty() {
            return 0;
        }

        let mut flushed = 0;
        for (key, record) in drained {
            match remote.save_user(&record).await {
                Ok(()) => {
                    debug!(address = %record.wallet_address, "flushed pending record");
                    flushed += 1;
                }
                Err(e) => {
                    warn!(address = %record.wallet_address, error = %e, "pending flush failed, re-queueing");
                    self.pending
                        .lock()
                        .expect("pending lock poisoned")
                        .entry(key)
                        .or_insert(record);
                }
            }
        }
        flushed
    }

    async fn propagate(&self, record: UserRecord) {
        let Some(remote) = &self.remote else {
            return;
        };
        if let Err(e) = remote.save_user(&record).await {
            warn!(address = %record.wallet_address, error = %e, "remote write failed, queueing");
            self.queue(record);
        }
    }

    fn queue(&self, record: UserRecord) {
        self.pending
            .lock()
            .expect("pending lock poisoned")
            .insert(record.wallet_address.canonical(), record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::remote::MemoryRemoteStore;
    use tempfile::TempDir;

    fn repo_with_memory_remote() -> (UserRepository, Arc<MemoryRemoteStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let local = LocalCache::open(&dir.path().join("cache.redb")).unwrap();
        let remote = Arc::new(MemoryRemoteStore::new());
        let repo = UserRepository::new(local, Some(remote.clone()));
        (repo, remote, dir)
    }

    #[tokio::test]
    async fn save_writes_both_tiers() {
        let (repo, remote, _dir) = repo_with_memory_remote();
        let record = UserRecord::new("0xAbc".into()).with_score(710);

        assert!(repo.save(record.clone()).await);
        assert_eq!(remote.record(&"0xabc".into()).unwrap().credit_score, 710);
        assert_eq!(
            repo.local().get_user(&"0xabc".into()).unwrap().unwrap(),
            record
        );
        assert_eq!(repo.pending_len(), 0);
    }

    #[tokio::test]
    async fn save_clamps_out_of_range_score() {
        let (repo, remote, _dir) = repo_with_memory_remote();
        let mut record = UserRecord::new("0xabc".into());
        record.credit_score = 950;

        assert!(repo.save(record).await);
        assert_eq!(remote.record(&"0xabc".into()).unwrap().credit_score, 900);
    }

    #[tokio::test]
    async fn remote_read_mirrors_into_local_cache() {
        let (repo, remote, _dir) = repo_with_memory_remote();
        remote
            .save_user(&UserRecord::new("0xabc".into()).with_score(810))
            .await
            .unwrap();

        let record = repo.get(&"0xabc".into()).await.unwrap();
        assert_eq!(record.credit_score, 810);

        // Remote goes dark; the mirrored copy still serves reads.
        remote.set_online(false);
        let record = repo.get(&"0xabc".into()).await.unwrap();
        assert_eq!(record.credit_score, 810);
    }

    #[tokio::test]
    async fn offline_save_queues_and_flush_delivers_once() {
        let (repo, remote, _dir) = repo_with_memory_remote();
        remote.set_online(false);

        assert!(repo.save(UserRecord::new("0xabc".into()).with_score(700)).await);
        assert_eq!(repo.pending_len(), 1);
        assert_eq!(remote.user_count(), 0);

        // Still offline: the flush fails and re-queues.
        assert_eq!(repo.flush_pending().await, 0);
        assert_eq!(repo.pending_len(), 1);

        remote.set_online(true);
        assert_eq!(repo.flush_pending().await, 1);
        assert_eq!(repo.pending_len(), 0);
        assert_eq!(remote.record(&"0xabc".into()).unwrap().credit_score, 700);

        // Nothing left to flush.
        assert_eq!(repo.flush_pending().await, 0);
    }

    #[tokio::test]
    async fn queue_keeps_latest_write_per_address() {
        let (repo, remote, _dir) = repo_with_memory_remote();
        remote.set_online(false);

        repo.save(UserRecord::new("0xabc".into()).with_score(650)).await;
        repo.save(UserRecord::new("0xABC".into()).with_score(720)).await;
        assert_eq!(repo.pending_len(), 1);

        remote.set_online(true);
        assert_eq!(repo.flush_pending().await, 1);
        assert_eq!(remote.record(&"0xabc".into()).unwrap().credit_score, 720);
    }

    #[tokio::test]
    async fn update_score_creates_missing_remote_document() {
        let (repo, remote, _dir) = repo_with_memory_remote();

        assert!(repo.update_score(&"0xnew".into(), 555).await);
        let record = remote.record(&"0xnew".into()).unwrap();
        assert_eq!(record.credit_score, 555);
        assert_eq!(
            repo.local().get_user(&"0xnew".into()).unwrap().unwrap().credit_score,
            555
        );
    }

    #[tokio::test]
    async fn update_score_clamps() {
        let (repo, remote, _dir) = repo_with_memory_remote();
        repo.save(UserRecord::new("0xabc".into())).await;

        assert!(repo.update_score(&"0xabc".into(), 950).await);
        assert_eq!(remote.record(&"0xabc".into()).unwrap().credit_score, 900);
    }

    #[tokio::test]
    async fn update_score_queues_when_remote_unreachable() {
        let (repo, remote, _dir) = repo_with_memory_remote();
        remote.set_online(false);

        assert!(repo.update_score(&"0xabc".into(), 480).await);
        assert_eq!(repo.pending_len(), 1);

        remote.set_online(true);
        assert_eq!(repo.flush_pending().await, 1);
        assert_eq!(remote.record(&"0xabc".into()).unwrap().credit_score, 480);
    }

    #[tokio::test]
    async fn never_seen_address_reads_as_absent() {
        let (repo, _remote, _dir) = repo_with_memory_remote();
        repo.save(UserRecord::new("0xaaa".into()).with_score(800)).await;

        // Another wallet's write must not bleed into a fresh address.
        assert!(repo.get(&"0xbbb".into()).await.is_none());
        let record = repo.ensure_user(&"0xbbb".into()).await;
        assert_eq!(record.credit_score, crate::score::DEFAULT_SCORE);
    }

    #[tokio::test]
    async fn saving_twice_leaves_one_record_per_tier() {
        let (repo, remote, _dir) = repo_with_memory_remote();
        let record = UserRecord::new("0xabc".into()).with_score(730);

        assert!(repo.save(record.clone()).await);
        assert!(repo.save(record.clone()).await);

        assert_eq!(remote.user_count(), 1);
        assert_eq!(remote.record(&"0xabc".into()).unwrap(), record);
        assert_eq!(
            repo.local().get_user(&"0xabc".into()).unwrap().unwrap(),
            record
        );
        assert_eq!(repo.pending_len(), 0);
    }

    #[tokio::test]
    async fn ensure_user_creates_with_default_score_once() {
        let (repo, remote, _dir) = repo_with_memory_remote();

        let record = repo.ensure_user(&"0xabc".into()).await;
        assert_eq!(record.credit_score, crate::score::DEFAULT_SCORE);
        assert_eq!(remote.user_count(), 1);

        // Second call returns the stored record without another create.
        repo.update_score(&"0xabc".into(), 700).await;
        let record = repo.ensure_user(&"0xABC".into()).await;
        assert_eq!(record.credit_score, 700);
        assert_eq!(remote.user_count(), 1);
    }

    #[tokio::test]
    async fn works_without_a_remote_tier() {
        let dir = TempDir::new().unwrap();
        let local = LocalCache::open(&dir.path().join("cache.redb")).unwrap();
        let repo = UserRepository::new(local, None);

        assert!(!repo.remote_enabled());
        assert!(repo.save(UserRecord::new("0xabc".into()).with_score(666)).await);
        assert_eq!(repo.get(&"0xabc".into()).await.unwrap().credit_score, 666);
        assert_eq!(repo.flush_pending().await, 0);
        assert_eq!(repo.pending_len(), 0);
    }
}
