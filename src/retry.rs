// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Pending-Write Flusher
//!
//! Background task that replays queued user-record writes against the remote
//! store once it becomes reachable again. The repository parks records that
//! failed a remote write; nothing else retries them, so this loop is what
//! turns "offline" into "eventually synced".
//!
//! ## Strategy
//!
//! Every `flush_interval` (default 30 s) the flusher:
//! 1. Skips the sweep when nothing is pending.
//! 2. Pings the remote store; an unreachable store ends the sweep early
//!    without burning a write attempt per record.
//! 3. Calls `flush_pending`, which drains the queue and re-queues records
//!    that fail again.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::storage::{RemoteStore, UserRepository};

/// Default interval between flush sweeps.
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Background task draining the repository's pending-write queue.
pub struct RetryFlusher {
    repo: Arc<UserRepository>,
    flush_interval: Duration,
    /// Whether the remote store answered the previous ping. Transitions are
    /// logged so outages show up once, not every sweep.
    was_online: bool,
}

impl RetryFlusher {
    pub fn new(repo: Arc<UserRepository>) -> Self {
        Self {
            repo,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            was_online: true,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Run the flush loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(flusher.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        if !self.repo.remote_enabled() {
            info!("Pending-write flusher idle: no remote store configured");
            return;
        }
        info!(
            interval_secs = self.flush_interval.as_secs(),
            "Pending-write flusher starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Pending-write flusher shutting down");
                return;
            }

            self.flush_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.flush_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Pending-write flusher shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep: probe connectivity, then drain the queue.
    async fn flush_step(&mut self) {
        let pending = self.repo.pending_len();
        if pending == 0 {
            return;
        }

        let online = match self.repo.remote() {
            Some(remote) => remote.ping().await.is_ok(),
            None => false,
        };
        if online != self.was_online {
            if online {
                info!(pending, "Remote store reachable again, flushing queue");
            } else {
                warn!(pending, "Remote store unreachable, holding queued writes");
            }
            self.was_online = online;
        }
        if !online {
            return;
        }

        let flushed = self.repo.flush_pending().await;
        let remaining = self.repo.pending_len();
        if flushed > 0 {
            info!(flushed, remaining, "Flushed pending writes");
        }
        if remaining > 0 {
            warn!(remaining, "Some pending writes failed again");
        }
    }
}
