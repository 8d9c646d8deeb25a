// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. Absence of the
//! remote-store variables disables the Firestore tier and the service runs
//! local-cache-only; nothing here aborts startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory for the embedded local cache | `/data` |
//! | `FIRESTORE_PROJECT_ID` | Firebase project id | Unset → remote tier disabled |
//! | `FIRESTORE_API_KEY` | Firebase web API key | Unset → remote tier disabled |
//! | `FIRESTORE_BASE_URL` | Firestore REST base URL | `https://firestore.googleapis.com/v1` |
//! | `SECURE_COOKIES` | Add the `Secure` attribute to session cookies | `false` |
//! | `STRICT_NONCE` | Consume nonces server-side on first verification attempt | `true` |
//! | `STRICT_VERIFICATION` | Block session establishment on signature failure | `false` |
//! | `RETRY_INTERVAL_SECS` | Remote-store connectivity probe interval | `30` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;

/// Environment variable name for the local cache directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default local cache directory.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the embedded local cache database.
    pub data_dir: PathBuf,
    /// Mark the auth cookies `Secure` so browsers only send them over
    /// HTTPS. Off by default for plain-HTTP local development.
    pub secure_cookies: bool,
    /// Consume nonces server-side on the first verification attempt,
    /// closing the replay window left by cookie expiry alone.
    pub strict_nonce: bool,
    /// Treat a failed signature check as fatal to session establishment.
    ///
    /// The default favors availability over strict auth: a failed check is
    /// logged but the session proceeds when the payload carries an address.
    /// This toggle makes the hardened behavior an explicit opt-in.
    pub strict_verification: bool,
    /// Seconds between remote-store connectivity probes.
    pub retry_interval_secs: u64,
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            data_dir: env::var(DATA_DIR_ENV)
                .unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string())
                .into(),
            secure_cookies: env_flag("SECURE_COOKIES", false),
            strict_nonce: env_flag("STRICT_NONCE", true),
            strict_verification: env_flag("STRICT_VERIFICATION", false),
            retry_interval_secs: env::var("RETRY_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.into(),
            secure_cookies: false,
            strict_nonce: true,
            strict_verification: false,
            retry_interval_secs: 30,
        }
    }
}

/// Parse a boolean environment flag, falling back to `default` when unset
/// or unrecognized.
fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
