// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::NonceStore;
use crate::config::AppConfig;
use crate::storage::UserRepository;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<UserRepository>,
    pub nonces: Arc<NonceStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(repo: UserRepository, config: AppConfig) -> Self {
        Self {
            repo: Arc::new(repo),
            nonces: Arc::new(NonceStore::new()),
            config: Arc::new(config),
        }
    }
}
