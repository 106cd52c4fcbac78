// src/trust/mod.rs

//! Index and binary trust decisions
//!
//! Every repository index travels with an Ed25519 signature envelope. The
//! verifier checks the signature over the exact index bytes, derives the
//! signer fingerprint, and compares it against the fingerprint pinned for
//! the repository. A pinned repository whose index arrives under a new key
//! fails hard with [`TrustError::FingerprintChanged`], no matter how valid
//! the new signature is. An unpinned repository never ingests silently:
//! the caller gets [`IndexTrust::UnpinnedFirstUse`] and must pin the
//! observed fingerprint explicitly before the pipeline proceeds.

pub mod signing;

use crate::db::models::Apk;
use crate::error::{Error, Result, TrustError};
use crate::hash::{self, Hash};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Signature algorithm accepted in envelopes
pub const ENVELOPE_ALGORITHM: &str = "ed25519";

/// Signature data published next to (or inside) an index document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureEnvelope {
    /// Signature algorithm (currently only "ed25519")
    pub algorithm: String,
    /// Base64-encoded signature bytes
    pub signature: String,
    /// Base64-encoded public key
    pub public_key: String,
    /// Optional key identifier (name chosen by the repository operator)
    #[serde(default)]
    pub key_id: Option<String>,
    /// Timestamp when signed (RFC 3339)
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl SignatureEnvelope {
    /// Parse an envelope from its JSON bytes
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let envelope: Self = serde_json::from_slice(data).map_err(|e| {
            TrustError::SignatureInvalid(format!("unreadable signature envelope: {e}"))
        })?;
        Ok(envelope)
    }

    /// Fingerprint of the key this envelope claims, without verifying
    /// anything
    pub fn claimed_fingerprint(&self) -> Result<String> {
        let key_bytes = BASE64.decode(&self.public_key).map_err(|e| {
            TrustError::SignatureInvalid(format!("invalid public key base64: {e}"))
        })?;
        Ok(fingerprint_of(&key_bytes))
    }
}

/// Embedded form of a published index
///
/// The exact signed bytes travel base64-encoded next to their envelope in
/// a single document, so no canonicalization is needed to re-verify them.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignedIndex {
    pub envelope: SignatureEnvelope,
    /// Base64 of the exact index bytes the signature covers
    pub payload: String,
}

impl SignedIndex {
    /// Wrap index bytes and their envelope into one document
    pub fn new(envelope: SignatureEnvelope, index: &[u8]) -> Self {
        Self {
            envelope,
            payload: BASE64.encode(index),
        }
    }

    /// Recover the exact index bytes the envelope signs
    pub fn decode_payload(&self) -> Result<Vec<u8>> {
        let bytes = BASE64.decode(&self.payload).map_err(|e| {
            TrustError::SignatureInvalid(format!("invalid index payload base64: {e}"))
        })?;
        Ok(bytes)
    }
}

/// Outcome of a successful index verification
///
/// `Trusted` means the signature verified under the pinned key. The
/// first-use variant means the signature verified but the repository has
/// no pinned fingerprint yet; the catalog must not change until the caller
/// pins one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexTrust {
    Trusted { fingerprint: String },
    UnpinnedFirstUse { fingerprint: String },
}

impl IndexTrust {
    /// Fingerprint of the key the index verified under
    pub fn fingerprint(&self) -> &str {
        match self {
            Self::Trusted { fingerprint } | Self::UnpinnedFirstUse { fingerprint } => fingerprint,
        }
    }
}

/// Key fingerprint: lowercase hex SHA-256 over the raw public key bytes
pub fn fingerprint_of(public_key: &[u8]) -> String {
    hash::sha256(public_key)
}

/// Normalize a user-supplied fingerprint
///
/// Accepts upper or lower case and colon or space separators, as
/// fingerprints are commonly pasted from QR scans and web pages.
pub fn normalize_fingerprint(input: &str) -> Result<String> {
    let cleaned: String = input
        .chars()
        .filter(|c| !matches!(c, ':' | ' '))
        .collect::<String>()
        .to_lowercase();

    if cleaned.len() != 64 || !cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::Config(format!(
            "'{input}' is not a valid key fingerprint (64 hex characters expected)"
        )));
    }
    Ok(cleaned)
}

/// Verify an index signature and decide trust against a pinned fingerprint
///
/// `index` must be the exact bytes the envelope signs. Order matters: the
/// signature is checked first, so a fingerprint comparison never runs on
/// unverified input.
pub fn verify_index(
    index: &[u8],
    envelope: &SignatureEnvelope,
    pinned: Option<&str>,
) -> Result<IndexTrust> {
    if envelope.algorithm != ENVELOPE_ALGORITHM {
        return Err(TrustError::SignatureInvalid(format!(
            "unsupported signature algorithm: {}",
            envelope.algorithm
        ))
        .into());
    }

    let sig_bytes = BASE64
        .decode(&envelope.signature)
        .map_err(|e| TrustError::SignatureInvalid(format!("invalid signature base64: {e}")))?;
    let signature = Signature::from_slice(&sig_bytes)
        .map_err(|e| TrustError::SignatureInvalid(format!("invalid signature: {e}")))?;

    let key_bytes = BASE64
        .decode(&envelope.public_key)
        .map_err(|e| TrustError::SignatureInvalid(format!("invalid public key base64: {e}")))?;
    let key_array: [u8; 32] = key_bytes
        .as_slice()
        .try_into()
        .map_err(|_| TrustError::SignatureInvalid("public key must be 32 bytes".to_string()))?;
    let verifying_key = VerifyingKey::from_bytes(&key_array)
        .map_err(|e| TrustError::SignatureInvalid(format!("invalid public key: {e}")))?;

    verifying_key
        .verify(index, &signature)
        .map_err(|e| TrustError::SignatureInvalid(format!("signature did not verify: {e}")))?;

    let fingerprint = fingerprint_of(&key_bytes);
    match pinned {
        Some(pinned) if pinned.eq_ignore_ascii_case(&fingerprint) => {
            Ok(IndexTrust::Trusted { fingerprint })
        }
        Some(pinned) => Err(TrustError::FingerprintChanged {
            pinned: pinned.to_lowercase(),
            observed: fingerprint,
        }
        .into()),
        None => Ok(IndexTrust::UnpinnedFirstUse { fingerprint }),
    }
}

/// Re-verify a downloaded binary against its trusted index metadata
///
/// Streams the file, so large packages never load into memory. A mismatch
/// means the bytes on disk are not what the signed index described, and
/// the binary must never reach the host installer.
pub fn verify_apk_file(path: &Path, apk: &Apk) -> Result<()> {
    let expected = Hash::from_index_entry(&apk.hash, &apk.hash_type).map_err(|e| {
        Error::MalformedIndex(format!(
            "'{}' version {} carries an unusable hash: {}",
            apk.package_name, apk.version_code, e
        ))
    })?;

    hash::verify_file(path, &expected.value, expected.algorithm).map_err(|e| {
        TrustError::HashMismatch {
            context: format!("{} version {}", apk.package_name, apk.version_code),
            expected: e.expected,
            actual: e.actual,
        }
        .into()
    })
}

/// Check that an offered binary is signed by the same certificate as the
/// installed version
///
/// Passing `None` for either side skips the check: a fresh install has no
/// installed signer, and some hosts cannot report one. A present-but-
/// different pair is the hard failure.
pub fn check_signer_continuity(
    package: &str,
    installed: Option<&str>,
    offered: Option<&str>,
) -> Result<()> {
    match (installed, offered) {
        (Some(installed), Some(offered)) if !installed.eq_ignore_ascii_case(offered) => {
            Err(TrustError::SignerChanged {
                package: package.to_string(),
                installed: installed.to_lowercase(),
                offered: offered.to_lowercase(),
            }
            .into())
        }
        _ => Ok(()),
    }
}
