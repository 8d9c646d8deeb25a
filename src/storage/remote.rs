// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote store tier: Firestore REST backend behind a trait seam.
//!
//! The [`RemoteStore`] trait is the injection point for the dual-write
//! repository — production wires in [`FirestoreStore`], tests substitute
//! [`MemoryRemoteStore`] without touching call sites.
//!
//! Configuration is environment-driven and optional: when the project id or
//! API key is absent the remote tier is disabled and the service runs
//! local-cache-only (never a startup failure).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::models::{UserRecord, WalletAddress};

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Collection holding one document per wallet address.
const USERS_COLLECTION: &str = "users";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Network failure, misconfiguration, or an unexpected upstream status.
    /// Always recovered by the repository; never surfaced to the end user.
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// The document does not exist (update preconditions included).
    #[error("not found: {0}")]
    NotFound(String),

    /// The upstream response could not be decoded into a record.
    #[error("remote store response was invalid: {0}")]
    InvalidResponse(String),
}

/// Asynchronous document store holding the `users` collection.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the record for an address. `Ok(None)` when absent.
    async fn get_user(&self, address: &WalletAddress) -> Result<Option<UserRecord>, StoreError>;

    /// Create or merge-write a record. Fields not present in the write are
    /// preserved upstream.
    async fn save_user(&self, record: &UserRecord) -> Result<(), StoreError>;

    /// Update only the score (and timestamp) of an existing record.
    ///
    /// Fails with [`StoreError::NotFound`] when no document exists — the
    /// repository falls back to a full create in that case.
    async fn update_score(
        &self,
        address: &WalletAddress,
        credit_score: i64,
    ) -> Result<(), StoreError>;

    /// Cheap connectivity probe used by the retry flusher.
    async fn ping(&self) -> Result<(), StoreError>;
}

// =============================================================================
// Firestore REST backend
// =============================================================================

/// Firestore REST client for the `users` collection.
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    base_url: String,
    project_id: String,
    api_key: String,
    http: Client,
}

impl FirestoreStore {
    /// Whether the environment carries enough configuration for the remote
    /// tier to operate.
    pub fn is_configured() -> bool {
        env_present("FIRESTORE_PROJECT_ID") && env_present("FIRESTORE_API_KEY")
    }

    /// Build a client from the environment. `None` when unconfigured.
    pub fn from_env() -> Option<Self> {
        let project_id = std::env::var("FIRESTORE_PROJECT_ID").ok()?;
        let api_key = std::env::var("FIRESTORE_API_KEY").ok()?;
        if project_id.is_empty() || api_key.is_empty() {
            return None;
        }
        let base_url = std::env::var("FIRESTORE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .ok()?;

        Some(Self {
            base_url,
            project_id,
            api_key,
            http,
        })
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            self.base_url, self.project_id, USERS_COLLECTION
        )
    }

    fn document_url(&self, address: &WalletAddress) -> String {
        format!("{}/{}", self.collection_url(), address.canonical())
    }
}

fn env_present(name: &str) -> bool {
    std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false)
}

#[async_trait]
impl RemoteStore for FirestoreStore {
    async fn get_user(&self, address: &WalletAddress) -> Result<Option<UserRecord>, StoreError> {
        let response = self
            .http
            .get(self.document_url(address))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StoreError::Unavailable(format!(
                "GET document returned {}",
                response.status()
            )));
        }

        let document: Value = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        decode_document(&document).map(Some)
    }

    async fn save_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        // PATCH with an explicit updateMask creates the document if missing
        // and merges into it otherwise.
        let response = self
            .http
            .patch(self.document_url(&record.wallet_address))
            .query(&[
                ("key", self.api_key.as_str()),
                ("updateMask.fieldPaths", "walletAddress"),
                ("updateMask.fieldPaths", "creditScore"),
                ("updateMask.fieldPaths", "updatedAt"),
                ("updateMask.fieldPaths", "orbVerified"),
                ("updateMask.fieldPaths", "metamaskConnected"),
            ])
            .json(&encode_document(record))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Unavailable(format!(
                "PATCH document returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn update_score(
        &self,
        address: &WalletAddress,
        credit_score: i64,
    ) -> Result<(), StoreError> {
        // currentDocument.exists makes this a pure update: a missing
        // document surfaces as NotFound instead of being created with only
        // two fields.
        let body = json!({
            "fields": {
                "creditScore": { "integerValue": credit_score.to_string() },
                "updatedAt": { "timestampValue": Utc::now().to_rfc3339() },
            }
        });

        let response = self
            .http
            .patch(self.document_url(address))
            .query(&[
                ("key", self.api_key.as_str()),
                ("updateMask.fieldPaths", "creditScore"),
                ("updateMask.fieldPaths", "updatedAt"),
                ("currentDocument.exists", "true"),
            ])
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(format!(
                "user document {address}"
            ))),
            s => Err(StoreError::Unavailable(format!(
                "PATCH score returned {s}"
            ))),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let response = self
            .http
            .get(self.collection_url())
            .query(&[("key", self.api_key.as_str()), ("pageSize", "1")])
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "collection probe returned {}",
                response.status()
            )))
        }
    }
}

// =============================================================================
// Firestore document encoding
// =============================================================================

/// Encode a record into the Firestore typed-value document shape.
fn encode_document(record: &UserRecord) -> Value {
    json!({
        "fields": {
            "walletAddress": { "stringValue": record.wallet_address.0 },
            "creditScore": { "integerValue": record.credit_score.to_string() },
            "updatedAt": { "timestampValue": record.updated_at.to_rfc3339() },
            "orbVerified": { "booleanValue": record.orb_verified },
            "metamaskConnected": { "booleanValue": record.metamask_connected },
        }
    })
}

/// Decode a Firestore document into a record.
fn decode_document(document: &Value) -> Result<UserRecord, StoreError> {
    let fields = document
        .get("fields")
        .ok_or_else(|| StoreError::InvalidResponse("document has no fields".to_string()))?;

    let wallet_address = string_field(fields, "walletAddress")?;
    let credit_score = fields
        .pointer("/creditScore/integerValue")
        .and_then(Value::as_str)
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| StoreError::InvalidResponse("missing creditScore".to_string()))?;
    let updated_at = fields
        .pointer("/updatedAt/timestampValue")
        .and_then(Value::as_str)
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Ok(UserRecord {
        wallet_address: wallet_address.into(),
        credit_score,
        updated_at,
        orb_verified: bool_field(fields, "orbVerified"),
        metamask_connected: bool_field(fields, "metamaskConnected"),
    })
}

fn string_field(fields: &Value, name: &str) -> Result<String, StoreError> {
    fields
        .pointer(&format!("/{name}/stringValue"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::InvalidResponse(format!("missing {name}")))
}

fn bool_field(fields: &Value, name: &str) -> bool {
    fields
        .pointer(&format!("/{name}/booleanValue"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

// =============================================================================
// In-memory backend (tests and local development)
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory [`RemoteStore`] with a switchable connectivity flag.
///
/// Offline mode makes every call fail with [`StoreError::Unavailable`],
/// which is how tests exercise the queue-and-flush path of the repository.
#[derive(Default)]
pub struct MemoryRemoteStore {
    users: Mutex<HashMap<String, UserRecord>>,
    offline: AtomicBool,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated connectivity.
    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    /// Direct snapshot of a stored record (test inspection).
    pub fn record(&self, address: &WalletAddress) -> Option<UserRecord> {
        self.users
            .lock()
            .expect("memory store lock poisoned")
            .get(&address.canonical())
            .cloned()
    }

    /// Number of stored documents (test inspection).
    pub fn user_count(&self) -> usize {
        self.users.lock().expect("memory store lock poisoned").len()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("simulated offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get_user(&self, address: &WalletAddress) -> Result<Option<UserRecord>, StoreError> {
        self.check_online()?;
        Ok(self.record(address))
    }

    async fn save_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.check_online()?;
        self.users
            .lock()
            .expect("memory store lock poisoned")
            .insert(record.wallet_address.canonical(), record.clone());
        Ok(())
    }

    async fn update_score(
        &self,
        address: &WalletAddress,
        credit_score: i64,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        let mut users = self.users.lock().expect("memory store lock poisoned");
        match users.get_mut(&address.canonical()) {
            Some(record) => {
                record.credit_score = credit_score;
                record.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("user document {address}"))),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let record = UserRecord::new("0xAbCd".into()).with_score(712);
        let document = encode_document(&record);

        let decoded = decode_document(&document).unwrap();
        assert_eq!(decoded.wallet_address, record.wallet_address);
        assert_eq!(decoded.credit_score, 712);
        assert!(!decoded.orb_verified);
    }

    #[test]
    fn decode_rejects_document_without_fields() {
        let err = decode_document(&json!({ "name": "projects/x" })).unwrap_err();
        assert!(matches!(err, StoreError::InvalidResponse(_)));
    }

    #[test]
    fn decode_tolerates_missing_optional_flags() {
        let document = json!({
            "fields": {
                "walletAddress": { "stringValue": "0xabc" },
                "creditScore": { "integerValue": "640" },
            }
        });
        let record = decode_document(&document).unwrap();
        assert_eq!(record.credit_score, 640);
        assert!(!record.orb_verified);
        assert!(!record.metamask_connected);
    }

    #[tokio::test]
    async fn memory_store_save_and_get() {
        let store = MemoryRemoteStore::new();
        let record = UserRecord::new("0xabc".into());
        store.save_user(&record).await.unwrap();

        let loaded = store.get_user(&"0xABC".into()).await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn memory_store_update_score_requires_document() {
        let store = MemoryRemoteStore::new();
        let err = store.update_score(&"0xghost".into(), 700).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        store.save_user(&UserRecord::new("0xghost".into())).await.unwrap();
        store.update_score(&"0xghost".into(), 700).await.unwrap();
        assert_eq!(store.record(&"0xghost".into()).unwrap().credit_score, 700);
    }

    #[tokio::test]
    async fn memory_store_offline_fails_everything() {
        let store = MemoryRemoteStore::new();
        store.set_online(false);

        assert!(store.ping().await.is_err());
        assert!(store.get_user(&"0xabc".into()).await.is_err());
        assert!(store.save_user(&UserRecord::new("0xabc".into())).await.is_err());

        store.set_online(true);
        assert!(store.ping().await.is_ok());
    }

    #[test]
    fn firestore_urls_use_canonical_address() {
        let store = FirestoreStore {
            base_url: "https://firestore.example/v1".to_string(),
            project_id: "worldscore-test".to_string(),
            api_key: "k".to_string(),
            http: Client::new(),
        };
        assert_eq!(
            store.document_url(&"0xAbCd".into()),
            "https://firestore.example/v1/projects/worldscore-test/databases/(default)/documents/users/0xabcd"
        );
    }
}
