// src/trust/signing.rs

//! Repository index signing
//!
//! Ed25519 key pairs for repository operators. Keys are generated locally,
//! stored as TOML key files, and used to produce the signature envelope
//! published next to an index.

use crate::error::{Error, Result};
use crate::trust::{ENVELOPE_ALGORITHM, SignatureEnvelope, fingerprint_of};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A signing key pair for repository indexes
pub struct SigningKeyPair {
    signing_key: SigningKey,
    key_id: Option<String>,
}

impl SigningKeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self {
            signing_key,
            key_id: None,
        }
    }

    /// Set a human-readable key identifier
    pub fn with_key_id(mut self, id: &str) -> Self {
        self.key_id = Some(id.to_string());
        self
    }

    /// Get the public key
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Get the public key as base64
    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.verifying_key().as_bytes())
    }

    /// Fingerprint clients will pin for this key
    pub fn fingerprint(&self) -> String {
        fingerprint_of(self.verifying_key().as_bytes())
    }

    /// Get the key ID
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Sign exact index bytes and return the envelope to publish
    pub fn sign_index(&self, index: &[u8]) -> SignatureEnvelope {
        let signature = self.signing_key.sign(index);
        let timestamp = chrono::Utc::now().to_rfc3339();

        SignatureEnvelope {
            algorithm: ENVELOPE_ALGORITHM.to_string(),
            signature: BASE64.encode(signature.to_bytes()),
            public_key: self.public_key_base64(),
            key_id: self.key_id.clone(),
            timestamp: Some(timestamp),
        }
    }

    /// Save the key pair to files (private and public)
    pub fn save_to_files(&self, private_path: &Path, public_path: &Path) -> Result<()> {
        let private_data = KeyFile {
            algorithm: ENVELOPE_ALGORITHM.to_string(),
            key: BASE64.encode(self.signing_key.to_bytes()),
            key_id: self.key_id.clone(),
        };
        let private_toml = toml::to_string_pretty(&private_data)
            .map_err(|e| Error::Config(format!("failed to encode private key: {e}")))?;
        fs::write(private_path, private_toml)?;

        // The private key must never be group or world readable
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(private_path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(private_path, perms)?;
        }

        let public_data = KeyFile {
            algorithm: ENVELOPE_ALGORITHM.to_string(),
            key: self.public_key_base64(),
            key_id: self.key_id.clone(),
        };
        let public_toml = toml::to_string_pretty(&public_data)
            .map_err(|e| Error::Config(format!("failed to encode public key: {e}")))?;
        fs::write(public_path, public_toml)?;

        Ok(())
    }

    /// Load a key pair from a private key file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let key_file = read_key_file(path)?;

        let key_bytes = BASE64.decode(&key_file.key).map_err(|e| {
            Error::Config(format!("invalid base64 in {}: {}", path.display(), e))
        })?;
        let key_array: [u8; 32] = key_bytes.try_into().map_err(|_| {
            Error::Config(format!("{} does not hold a 32 byte key", path.display()))
        })?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&key_array),
            key_id: key_file.key_id,
        })
    }
}

/// Key file format
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    algorithm: String,
    key: String,
    #[serde(default)]
    key_id: Option<String>,
}

fn read_key_file(path: &Path) -> Result<KeyFile> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let key_file: KeyFile = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    if key_file.algorithm != ENVELOPE_ALGORITHM {
        return Err(Error::Config(format!(
            "{} uses unsupported key algorithm '{}'",
            path.display(),
            key_file.algorithm
        )));
    }
    Ok(key_file)
}

/// Load a public key (base64) from a key file
pub fn load_public_key(path: &Path) -> Result<String> {
    Ok(read_key_file(path)?.key)
}
