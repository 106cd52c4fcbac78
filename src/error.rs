// src/error.rs

//! Crate-wide error types
//!
//! Errors fall into a small taxonomy: transport failures (retryable inside
//! the fetcher via mirror failover, surfaced once exhausted), trust failures
//! (never retried, never auto-resolved), format failures (abort the ingest,
//! prior state retained), and conflict/host failures surfaced to the caller.

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Error, Debug)]
pub enum Error {
    /// A single transfer failed (package download, one mirror attempt)
    #[error("transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Every mirror of a repository failed
    #[error("repository '{repo}' unreachable, all mirrors failed (last: {last})")]
    Unreachable { repo: String, last: String },

    /// Conditional fetch says the index has not changed; the ingest
    /// pipeline short-circuits on this before signature verification
    #[error("index not modified since last fetch")]
    NotModified,

    /// Trust decision failed; see [`TrustError`]
    #[error(transparent)]
    Trust(#[from] TrustError),

    /// Index document failed structural validation after its signature
    /// verified; the catalog is left at its prior state
    #[error("malformed index: {0}")]
    MalformedIndex(String),

    /// A second install/uninstall for the same package while one is in
    /// flight; rejected, never queued
    #[error("an operation for '{0}' is already in progress")]
    AlreadyInProgress(String),

    /// Propagated from the host install capability
    #[error("host installer: {0}")]
    HostInstall(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cooperative cancellation observed during the named step
    #[error("cancelled during {0}")]
    Cancelled(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Trust failures
///
/// These are security boundaries: the core never retries them and never
/// resolves them on its own. Each carries enough context for the caller to
/// present a meaningful decision to the user.
#[derive(Error, Debug)]
pub enum TrustError {
    /// The signature bytes do not verify over the index content under the
    /// key the envelope claims (or the envelope itself is unusable)
    #[error("index signature did not verify: {0}")]
    SignatureInvalid(String),

    /// The certificate digest inside a downloaded binary disagrees with
    /// what the repository index declared for it
    #[error("signer of {package} does not match index metadata: expected {expected}, got {actual}")]
    SignatureMismatch {
        package: String,
        expected: String,
        actual: String,
    },

    /// Valid signature, but from a different key than the one pinned for
    /// an already-trusted repository. The primary signal of a compromised
    /// or spoofed mirror.
    #[error("index signer fingerprint {observed} does not match pinned {pinned}")]
    FingerprintChanged { pinned: String, observed: String },

    /// Content hash of a binary (or a re-ingested version row) differs
    /// from the hash the trusted metadata recorded
    #[error("hash mismatch for {context}: expected {expected}, got {actual}")]
    HashMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// The offered binary is signed by a different certificate than the
    /// version currently installed on the device
    #[error("signer changed for {package}: installed {installed}, offered {offered}")]
    SignerChanged {
        package: String,
        installed: String,
        offered: String,
    },

    /// A privileged-component self-update signed by a different authority
    /// than the running component; no fallback exists for this case
    #[error("privileged update authority mismatch: expected {expected}, got {actual}")]
    SignatureAuthorityMismatch { expected: String, actual: String },
}

impl Error {
    /// True for errors the fetcher may respond to with mirror failover.
    /// Trust and format failures are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_errors_are_not_retryable() {
        let err = Error::Trust(TrustError::HashMismatch {
            context: "org.example".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        });
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_transport_is_retryable() {
        let err = Error::Transport {
            url: "https://mirror.example.com/index.json".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_fingerprint_changed_display() {
        let err = TrustError::FingerprintChanged {
            pinned: "aabb".to_string(),
            observed: "ccdd".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("aabb"));
        assert!(msg.contains("ccdd"));
    }
}
