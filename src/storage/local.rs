// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded local cache backed by redb (pure Rust, ACID).
//!
//! The local tier is the always-available side of the dual-write contract:
//! every repository write lands here first, and reads fall back here when
//! the remote store is unreachable or has no record.
//!
//! ## Table Layout
//!
//! - `users`: lowercase wallet address → serialized `UserRecord` (JSON bytes)
//! - `meta`: legacy scalar keys (`worldscore_score` → last written score)
//!
//! The legacy scalar key predates per-address records. It is a write-only
//! mirror kept for pre-Firestore tooling that still reads it; it never
//! feeds reads, since a shared cache cannot attribute a global scalar to
//! any particular address.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::models::{UserRecord, WalletAddress};

/// Primary table: lowercase wallet address → serialized UserRecord.
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Legacy scalar keys kept for pre-Firestore clients.
const META: TableDefinition<&str, &str> = TableDefinition::new("meta");

/// Legacy key holding the most recently written score.
const LEGACY_SCORE_KEY: &str = "worldscore_score";

#[derive(Debug, thiserror::Error)]
pub enum LocalCacheError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type LocalCacheResult<T> = Result<T, LocalCacheError>;

/// Embedded user-record cache.
pub struct LocalCache {
    db: Database,
}

impl LocalCache {
    /// Open (or create) the cache database at the given path.
    pub fn open(path: &Path) -> LocalCacheResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(META)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert or replace the cached record for a wallet address.
    ///
    /// Also mirrors the score into the legacy scalar key.
    pub fn put_user(&self, record: &UserRecord) -> LocalCacheResult<()> {
        let key = record.wallet_address.canonical();
        let json = serde_json::to_vec(record)?;
        let score = record.credit_score.to_string();

        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            users.insert(key.as_str(), json.as_slice())?;

            let mut meta = write_txn.open_table(META)?;
            meta.insert(LEGACY_SCORE_KEY, score.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up the cached record for a wallet address.
    ///
    /// Only the per-address blob counts: the legacy scalar is never
    /// consulted, so an address nobody has written stays `None`.
    pub fn get_user(&self, address: &WalletAddress) -> LocalCacheResult<Option<UserRecord>> {
        let key = address.canonical();
        let read_txn = self.db.begin_read()?;

        let users = read_txn.open_table(USERS)?;
        match users.get(key.as_str())? {
            Some(value) => {
                let record: UserRecord = serde_json::from_slice(value.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// The legacy scalar score, if any write has happened yet.
    pub fn legacy_score(&self) -> LocalCacheResult<Option<i64>> {
        let read_txn = self.db.begin_read()?;
        let meta = read_txn.open_table(META)?;
        Ok(meta
            .get(LEGACY_SCORE_KEY)?
            .and_then(|v| v.value().parse().ok()))
    }

    /// Verify the cache is readable and writable.
    pub fn health_check(&self) -> LocalCacheResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut meta = write_txn.open_table(META)?;
            meta.insert(".health_check", "ok")?;
            meta.remove(".health_check")?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
