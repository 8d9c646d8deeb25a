// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! WorldScore - Decentralized Credit Score Service
//!
//! This crate provides wallet-native credit scoring: Sign-In with Ethereum
//! (EIP-4361) authentication and a dual-write user record store backed by a
//! remote document database with an always-available local cache.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - SIWE verification, nonce ledger, session cookies
//! - `score` - Pure credit score formula
//! - `session` - Wallet session state machine for embedded callers
//! - `storage` - Two-tier user record storage (redb cache + Firestore)
//! - `retry` - Background flusher for queued remote writes

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod score;
pub mod session;
pub mod state;
pub mod storage;
