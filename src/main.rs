// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::info;

use worldscore::api::router;
use worldscore::config::AppConfig;
use worldscore::retry::RetryFlusher;
use worldscore::state::AppState;
use worldscore::storage::{FirestoreStore, LocalCache, RemoteStore, UserRepository};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AppConfig::from_env();
    let retry_interval = Duration::from_secs(config.retry_interval_secs);

    let local = LocalCache::open(&config.data_dir.join("worldscore.redb"))
        .expect("Failed to open local cache database");

    let remote: Option<Arc<dyn RemoteStore>> = match FirestoreStore::from_env() {
        Some(store) => {
            info!("Firestore remote store configured");
            Some(Arc::new(store))
        }
        None => {
            info!("No Firestore configuration, running local-cache-only");
            None
        }
    };

    let state = AppState::new(UserRepository::new(local, remote), config);

    let shutdown = CancellationToken::new();
    tokio::spawn(
        RetryFlusher::new(state.repo.clone())
            .with_interval(retry_interval)
            .run(shutdown.clone()),
    );

    let app = router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    info!("WorldScore server listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            shutdown.cancel();
        })
        .await
        .expect("HTTP server failed");
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if env::var("LOG_FORMAT").is_ok_and(|v| v == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}
