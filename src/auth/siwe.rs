// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-In with Ethereum (EIP-4361) message handling.
//!
//! The verifier is deliberately narrow: it parses the handful of fields this
//! service needs (address, nonce, expiration), hashes the message with the
//! EIP-191 personal-sign prefix, and recovers the signer address from the
//! 65-byte recoverable secp256k1 signature. A sign-in is valid only when the
//! recovered address matches the address embedded in the message, which in
//! turn must match the address the wallet claims.

use alloy::hex;
use alloy::primitives::keccak256;
use chrono::{DateTime, Utc};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Signed authentication payload returned by a wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletAuthPayload {
    /// Wallet-reported outcome, `"success"` or `"error"`.
    pub status: String,
    /// The full EIP-4361 message that was signed.
    pub message: String,
    /// 65-byte recoverable signature, 0x-prefixed hex.
    pub signature: String,
    /// The address the wallet claims to have signed with.
    pub address: String,
}

/// Why a sign-in attempt was rejected. Reported inside the verification
/// envelope, never as an HTTP error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SiweFailure {
    #[error("Invalid nonce")]
    InvalidNonce,
    #[error("Wallet reported an error")]
    WalletError,
    #[error("Malformed SIWE message")]
    Malformed,
    #[error("Message expired")]
    Expired,
    #[error("Address mismatch")]
    AddressMismatch,
    #[error("Invalid signature")]
    InvalidSignature,
}

/// Fields extracted from an EIP-4361 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSiweMessage {
    pub address: String,
    pub nonce: String,
    pub expiration_time: Option<DateTime<Utc>>,
}

/// Parse the fields this service verifies out of an EIP-4361 message.
///
/// Layout per EIP-4361: domain line, address line, optional statement, then
/// `Key: value` fields. Unknown fields are ignored.
pub fn parse_message(message: &str) -> Result<ParsedSiweMessage, SiweFailure> {
    let mut lines = message.lines();

    let domain_line = lines.next().ok_or(SiweFailure::Malformed)?;
    if !domain_line.ends_with("wants you to sign in with your Ethereum account:") {
        return Err(SiweFailure::Malformed);
    }

    let address = lines.next().ok_or(SiweFailure::Malformed)?.trim().to_string();
    if !is_hex_address(&address) {
        return Err(SiweFailure::Malformed);
    }

    let mut nonce = None;
    let mut expiration_time = None;
    for line in lines {
        if let Some(value) = line.strip_prefix("Nonce: ") {
            nonce = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Expiration Time: ") {
            expiration_time = DateTime::parse_from_rfc3339(value.trim())
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(|_| SiweFailure::Malformed)?;
        }
    }

    Ok(ParsedSiweMessage {
        address,
        nonce: nonce.ok_or(SiweFailure::Malformed)?,
        expiration_time,
    })
}

/// Full payload validation, minus the nonce-ledger check the endpoint does.
///
/// Checks, in order: wallet-reported status, message shape, expiration,
/// claimed-address consistency, and signature recovery.
pub fn validate(
    payload: &WalletAuthPayload,
    now: DateTime<Utc>,
) -> Result<ParsedSiweMessage, SiweFailure> {
    if payload.status != "success" {
        return Err(SiweFailure::WalletError);
    }

    let parsed = parse_message(&payload.message)?;

    if let Some(expiration) = parsed.expiration_time {
        if now > expiration {
            return Err(SiweFailure::Expired);
        }
    }

    if !parsed.address.eq_ignore_ascii_case(&payload.address) {
        return Err(SiweFailure::AddressMismatch);
    }

    let recovered = recover_address(&payload.message, &payload.signature)?;
    if !recovered.eq_ignore_ascii_case(&parsed.address) {
        return Err(SiweFailure::InvalidSignature);
    }

    Ok(parsed)
}

/// Recover the signer address from a personal-sign signature over `message`.
pub fn recover_address(message: &str, signature: &str) -> Result<String, SiweFailure> {
    let raw = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(raw).map_err(|_| SiweFailure::InvalidSignature)?;
    if bytes.len() != 65 {
        return Err(SiweFailure::InvalidSignature);
    }

    // Wallets emit v as 27/28; the recovery id is 0/1.
    let v = bytes[64];
    let v = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::try_from(v).map_err(|_| SiweFailure::InvalidSignature)?;
    let signature =
        Signature::from_slice(&bytes[..64]).map_err(|_| SiweFailure::InvalidSignature)?;

    let digest = eip191_digest(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|_| SiweFailure::InvalidSignature)?;
    Ok(address_of(&key))
}

/// EIP-191 personal-sign digest: keccak256 over the prefixed message.
pub fn eip191_digest(message: &str) -> [u8; 32] {
    let prefixed = format!("\x19Ethereum Signed Message:\n{}{}", message.len(), message);
    keccak256(prefixed.as_bytes()).into()
}

/// Ethereum address of a public key: last 20 bytes of the keccak256 of the
/// uncompressed point (without the 0x04 tag).
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Render an EIP-4361 message for signing.
pub fn format_message(
    domain: &str,
    address: &str,
    statement: &str,
    nonce: &str,
    issued_at: DateTime<Utc>,
    expiration_time: DateTime<Utc>,
) -> String {
    format!(
        "{domain} wants you to sign in with your Ethereum account:\n\
         {address}\n\
         \n\
         {statement}\n\
         \n\
         URI: https://{domain}\n\
         Version: 1\n\
         Chain ID: 1\n\
         Nonce: {nonce}\n\
         Issued At: {issued_at}\n\
         Expiration Time: {expiration_time}",
        issued_at = issued_at.to_rfc3339(),
        expiration_time = expiration_time.to_rfc3339(),
    )
}

fn is_hex_address(value: &str) -> bool {
    value.len() == 42
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}
