// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet session state machine.
//!
//! Drives a full sign-in against a [`WalletCapability`] implementation:
//! mint a nonce, ask the wallet to sign the SIWE message, verify the
//! signature, and land the session in `Connected` with a guaranteed score
//! record. The controller is what embedded callers (kiosk runners, backfill
//! jobs) use instead of the HTTP handshake; both paths share the same
//! verifier and nonce ledger.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::auth::siwe::{self, SiweFailure, WalletAuthPayload};
use crate::auth::NonceStore;
use crate::config::AppConfig;
use crate::models::WalletAddress;
use crate::storage::UserRepository;

/// Statement embedded in every sign-in message.
pub const SIGN_IN_STATEMENT: &str =
    "Sign in to WorldScore - a decentralized credit score app";

const SIGN_IN_DOMAIN: &str = "worldscore.app";

/// Session lifetime requested from the wallet: 7 days.
const SESSION_DAYS: i64 = 7;

/// What the controller asks a wallet to sign.
#[derive(Debug, Clone)]
pub struct SiweRequest {
    pub message: String,
    pub nonce: String,
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("no wallet is installed")]
    NotInstalled,
    #[error("the user rejected the signature request")]
    UserRejected,
    #[error("wallet failure: {0}")]
    Other(String),
}

/// A wallet that can report its address and sign SIWE messages.
#[async_trait]
pub trait WalletCapability: Send + Sync {
    fn is_installed(&self) -> bool;

    fn address(&self) -> WalletAddress;

    /// Address of a session the wallet already holds, if any. Wallets that
    /// cannot report this return `None` and go through the full handshake.
    fn connected_address(&self) -> Option<WalletAddress> {
        None
    }

    async fn wallet_auth(&self, request: &SiweRequest) -> Result<WalletAuthPayload, WalletError>;
}

/// Where the state machine currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Authenticating,
    Verifying,
    Connected(WalletAddress),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("sign-in rejected: {0}")]
    Rejected(#[from] SiweFailure),
}

pub struct SessionController {
    wallet: Arc<dyn WalletCapability>,
    repo: Arc<UserRepository>,
    nonces: Arc<NonceStore>,
    config: Arc<AppConfig>,
    phase: Mutex<SessionPhase>,
}

impl SessionController {
    pub fn new(
        wallet: Arc<dyn WalletCapability>,
        repo: Arc<UserRepository>,
        nonces: Arc<NonceStore>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            wallet,
            repo,
            nonces,
            config,
            phase: Mutex::new(SessionPhase::Disconnected),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase.lock().expect("session phase lock poisoned").clone()
    }

    fn set_phase(&self, phase: SessionPhase) {
        *self.phase.lock().expect("session phase lock poisoned") = phase;
    }

    /// Run the sign-in flow to completion.
    ///
    /// Connecting while already connected is a no-op returning the current
    /// address. Any failure resets the machine to `Disconnected`.
    pub async fn connect(&self) -> Result<WalletAddress, SessionError> {
        if let SessionPhase::Connected(address) = self.phase() {
            return Ok(address);
        }
        if !self.wallet.is_installed() {
            return Err(WalletError::NotInstalled.into());
        }

        // A wallet with a live session skips the handshake; the record is
        // still ensured so a first-time address gets its default score.
        if let Some(address) = self.wallet.connected_address() {
            self.repo.ensure_user(&address).await;
            self.set_phase(SessionPhase::Connected(address.clone()));
            info!(address = %address, "session resumed from connected wallet");
            return Ok(address);
        }

        match self.run_handshake().await {
            Ok(address) => {
                self.set_phase(SessionPhase::Connected(address.clone()));
                info!(address = %address, "session connected");
                Ok(address)
            }
            Err(e) => {
                self.set_phase(SessionPhase::Disconnected);
                Err(e)
            }
        }
    }

    pub fn disconnect(&self) {
        self.set_phase(SessionPhase::Disconnected);
    }

    pub fn connected_address(&self) -> Option<WalletAddress> {
        match self.phase() {
            SessionPhase::Connected(address) => Some(address),
            _ => None,
        }
    }

    async fn run_handshake(&self) -> Result<WalletAddress, SessionError> {
        self.set_phase(SessionPhase::Connecting);
        let nonce = self.nonces.issue();

        self.set_phase(SessionPhase::Authenticating);
        let now = Utc::now();
        let message = siwe::format_message(
            SIGN_IN_DOMAIN,
            &self.wallet.address().0,
            SIGN_IN_STATEMENT,
            &nonce,
            now,
            now + Duration::days(SESSION_DAYS),
        );
        let request = SiweRequest {
            message,
            nonce: nonce.clone(),
        };
        let payload = self.wallet.wallet_auth(&request).await?;

        self.set_phase(SessionPhase::Verifying);
        if self.config.strict_nonce && !self.nonces.consume(&nonce) {
            return Err(SiweFailure::InvalidNonce.into());
        }
        match siwe::validate(&payload, Utc::now()) {
            Ok(parsed) if parsed.nonce == nonce => {}
            Ok(_) => return Err(SiweFailure::InvalidNonce.into()),
            Err(failure) if self.config.strict_verification => {
                return Err(failure.into());
            }
            Err(failure) => {
                // Lenient mode tolerates a failed verification so a flaky
                // wallet does not lock the user out of their own record.
                warn!(%failure, "signature verification failed, continuing");
            }
        }

        let address = WalletAddress(payload.address);
        self.repo.ensure_user(&address).await;
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::siwe::{address_of, eip191_digest};
    use crate::storage::{LocalCache, MemoryRemoteStore};
    use alloy::hex;
    use k256::ecdsa::SigningKey;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    struct MockWallet {
        key: SigningKey,
        installed: bool,
        preconnected: bool,
        corrupt_signature: AtomicBool,
        reject: AtomicBool,
    }

    impl MockWallet {
        fn new() -> Self {
            Self {
                key: SigningKey::from_bytes(&[11u8; 32].into()).unwrap(),
                installed: true,
                preconnected: false,
                corrupt_signature: AtomicBool::new(false),
                reject: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl WalletCapability for MockWallet {
        fn is_installed(&self) -> bool {
            self.installed
        }

        fn address(&self) -> WalletAddress {
            WalletAddress(address_of(self.key.verifying_key()))
        }

        fn connected_address(&self) -> Option<WalletAddress> {
            self.preconnected.then(|| self.address())
        }

        async fn wallet_auth(
            &self,
            request: &SiweRequest,
        ) -> Result<WalletAuthPayload, WalletError> {
            if self.reject.load(Ordering::SeqCst) {
                return Err(WalletError::UserRejected);
            }
            let digest = eip191_digest(&request.message);
            let (signature, recovery_id) = self
                .key
                .sign_prehash_recoverable(&digest)
                .map_err(|e| WalletError::Other(e.to_string()))?;
            let mut bytes = signature.to_bytes().to_vec();
            bytes.push(recovery_id.to_byte() + 27);
            if self.corrupt_signature.load(Ordering::SeqCst) {
                bytes[10] ^= 0xff;
            }
            Ok(WalletAuthPayload {
                status: "success".to_string(),
                message: request.message.clone(),
                signature: format!("0x{}", hex::encode(bytes)),
                address: self.address().0,
            })
        }
    }

    fn controller_with(wallet: MockWallet, config: AppConfig) -> (SessionController, TempDir) {
        let dir = TempDir::new().unwrap();
        let local = LocalCache::open(&dir.path().join("cache.redb")).unwrap();
        let repo = Arc::new(UserRepository::new(
            local,
            Some(Arc::new(MemoryRemoteStore::new())),
        ));
        let controller = SessionController::new(
            Arc::new(wallet),
            repo,
            Arc::new(NonceStore::new()),
            Arc::new(config),
        );
        (controller, dir)
    }

    #[tokio::test]
    async fn connect_reaches_connected_with_a_record() {
        let (controller, _dir) = controller_with(MockWallet::new(), AppConfig::default());
        assert_eq!(controller.phase(), SessionPhase::Disconnected);

        let address = controller.connect().await.unwrap();
        assert_eq!(controller.phase(), SessionPhase::Connected(address.clone()));
        assert!(controller.connected_address().is_some());
    }

    #[tokio::test]
    async fn connect_is_idempotent_while_connected() {
        let (controller, _dir) = controller_with(MockWallet::new(), AppConfig::default());
        let first = controller.connect().await.unwrap();
        // No second nonce, no second handshake.
        let second = controller.connect().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_wallet_fails_fast() {
        let mut wallet = MockWallet::new();
        wallet.installed = false;
        let (controller, _dir) = controller_with(wallet, AppConfig::default());

        let err = controller.connect().await.unwrap_err();
        assert!(matches!(err, SessionError::Wallet(WalletError::NotInstalled)));
        assert_eq!(controller.phase(), SessionPhase::Disconnected);
    }

    #[tokio::test]
    async fn user_rejection_resets_to_disconnected() {
        let wallet = MockWallet::new();
        wallet.reject.store(true, Ordering::SeqCst);
        let (controller, _dir) = controller_with(wallet, AppConfig::default());

        assert!(controller.connect().await.is_err());
        assert_eq!(controller.phase(), SessionPhase::Disconnected);
    }

    #[tokio::test]
    async fn lenient_mode_connects_despite_bad_signature() {
        let wallet = MockWallet::new();
        wallet.corrupt_signature.store(true, Ordering::SeqCst);
        let (controller, _dir) = controller_with(wallet, AppConfig::default());

        // strict_verification defaults off.
        assert!(controller.connect().await.is_ok());
    }

    #[tokio::test]
    async fn strict_mode_rejects_bad_signature() {
        let wallet = MockWallet::new();
        wallet.corrupt_signature.store(true, Ordering::SeqCst);
        let config = AppConfig {
            strict_verification: true,
            ..AppConfig::default()
        };
        let (controller, _dir) = controller_with(wallet, config);

        let err = controller.connect().await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(_)));
        assert_eq!(controller.phase(), SessionPhase::Disconnected);
    }

    #[tokio::test]
    async fn preconnected_wallet_skips_the_handshake() {
        let mut wallet = MockWallet::new();
        // Rejection would abort a handshake; a preconnected wallet never
        // reaches the signing step.
        wallet.reject.store(true, Ordering::SeqCst);
        wallet.preconnected = true;
        let expected = wallet.address();
        let (controller, _dir) = controller_with(wallet, AppConfig::default());

        let address = controller.connect().await.unwrap();
        assert_eq!(address, expected);
        assert_eq!(controller.phase(), SessionPhase::Connected(address));
    }

    #[tokio::test]
    async fn disconnect_allows_a_fresh_handshake() {
        let (controller, _dir) = controller_with(MockWallet::new(), AppConfig::default());
        controller.connect().await.unwrap();

        controller.disconnect();
        assert_eq!(controller.phase(), SessionPhase::Disconnected);
        assert!(controller.connect().await.is_ok());
    }
}
