// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Two-tier user record storage.
//!
//! - [`local`] — embedded redb cache, always available, the durability floor.
//! - [`remote`] — Firestore REST document store behind the [`RemoteStore`]
//!   trait, optional and environment-configured.
//! - [`repository`] — the dual-write [`UserRepository`] coordinating both
//!   tiers with an offline pending queue.

pub mod local;
pub mod remote;
pub mod repository;

pub use local::{LocalCache, LocalCacheError};
pub use remote::{FirestoreStore, MemoryRemoteStore, RemoteStore, StoreError};
pub use repository::UserRepository;
