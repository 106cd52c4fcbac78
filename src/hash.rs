// src/hash.rs

//! Content hashing for index and package integrity
//!
//! Repository indexes describe every package binary by a content hash plus a
//! `hash_type` discriminator. Current repositories publish SHA-256 (a few
//! newer ones SHA-512); very old indexes still carry MD5 entries, which we
//! can parse and re-verify but never use for new trust decisions.

use md5::Md5;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// SHA-256, the default for all current indexes
    #[default]
    Sha256,

    /// SHA-512, published by some newer repositories
    Sha512,

    /// MD5, legacy-only. Parsed so old index entries stay representable,
    /// but [`is_cryptographic`](Self::is_cryptographic) reports false.
    Md5,
}

impl HashAlgorithm {
    /// Get the hash output length in bytes
    #[inline]
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha512 => 64,
            Self::Md5 => 16,
        }
    }

    /// Get the hash output length as a hex string
    #[inline]
    pub const fn hex_len(&self) -> usize {
        self.output_len() * 2
    }

    /// Get the algorithm name as stored in the `hash_type` column
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Md5 => "md5",
        }
    }

    /// Check if this algorithm is acceptable for trust decisions
    #[inline]
    pub const fn is_cryptographic(&self) -> bool {
        match self {
            Self::Sha256 | Self::Sha512 => true,
            Self::Md5 => false,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            "md5" => Ok(Self::Md5),
            _ => Err(HashError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Hash computation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Unknown hash algorithm name
    UnknownAlgorithm(String),
    /// Hash string has wrong length for algorithm
    InvalidLength { expected: usize, got: usize },
    /// Hash string contains invalid hex characters
    InvalidHex(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAlgorithm(name) => write!(f, "unknown hash algorithm: {}", name),
            Self::InvalidLength { expected, got } => {
                write!(f, "invalid hash length: expected {}, got {}", expected, got)
            }
            Self::InvalidHex(s) => write!(f, "invalid hex in hash: {}", s),
        }
    }
}

impl std::error::Error for HashError {}

/// A hash value with its algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    /// The algorithm used
    pub algorithm: HashAlgorithm,
    /// The hash value as a lowercase hex string
    pub value: String,
}

impl Hash {
    /// Create a new hash value, validating length and hex content
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Result<Self, HashError> {
        let value = value.into();
        let expected_len = algorithm.hex_len();

        if value.len() != expected_len {
            return Err(HashError::InvalidLength {
                expected: expected_len,
                got: value.len(),
            });
        }

        // Validate hex characters
        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError::InvalidHex(value));
        }

        Ok(Self {
            algorithm,
            value: value.to_lowercase(),
        })
    }

    /// Create a hash without validation (internal use)
    fn new_unchecked(algorithm: HashAlgorithm, value: String) -> Self {
        Self { algorithm, value }
    }

    /// Parse an index entry's `(hash, hash_type)` column pair
    pub fn from_index_entry(hash: &str, hash_type: &str) -> Result<Self, HashError> {
        let algorithm = hash_type.parse()?;
        Self::new(algorithm, hash)
    }

    /// Get the hash value as a hex string
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Hasher that can compute hashes using any supported algorithm
pub struct Hasher {
    algorithm: HashAlgorithm,
    state: HasherState,
}

enum HasherState {
    Sha256(Sha256),
    Sha512(Sha512),
    Md5(Md5),
}

impl Hasher {
    /// Create a new hasher with the specified algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => HasherState::Sha512(Sha512::new()),
            HashAlgorithm::Md5 => HasherState::Md5(Md5::new()),
        };
        Self { algorithm, state }
    }

    /// Update the hasher with more data
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Sha256(hasher) => hasher.update(data),
            HasherState::Sha512(hasher) => hasher.update(data),
            HasherState::Md5(hasher) => hasher.update(data),
        }
    }

    /// Finalize and return the hash
    pub fn finalize(self) -> Hash {
        let value = match self.state {
            HasherState::Sha256(hasher) => format!("{:x}", hasher.finalize()),
            HasherState::Sha512(hasher) => format!("{:x}", hasher.finalize()),
            HasherState::Md5(hasher) => format!("{:x}", hasher.finalize()),
        };
        Hash::new_unchecked(self.algorithm, value)
    }

    /// Get the algorithm being used
    #[inline]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

/// Compute hash of a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> Hash {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Compute hash of data from a reader
pub fn hash_reader<R: Read>(algorithm: HashAlgorithm, reader: &mut R) -> io::Result<Hash> {
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// Compute SHA-256 hash (convenience function)
#[inline]
pub fn sha256(data: &[u8]) -> String {
    hash_bytes(HashAlgorithm::Sha256, data).value
}

// =============================================================================
// Verification functions
// =============================================================================

/// Verification result error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyError {
    pub expected: String,
    pub actual: String,
    pub algorithm: HashAlgorithm,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} mismatch: expected {}, got {}",
            self.algorithm, self.expected, self.actual
        )
    }
}

impl std::error::Error for VerifyError {}

/// Verify bytes match an expected hash
///
/// # Example
/// ```
/// use kiosk::hash::{verify_bytes, HashAlgorithm};
///
/// let data = b"hello world";
/// let hash = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
/// assert!(verify_bytes(data, hash, HashAlgorithm::Sha256).is_ok());
/// ```
pub fn verify_bytes(data: &[u8], expected: &str, algorithm: HashAlgorithm) -> Result<(), VerifyError> {
    let actual = hash_bytes(algorithm, data);
    if actual.value == expected.to_lowercase() {
        Ok(())
    } else {
        Err(VerifyError {
            expected: expected.to_string(),
            actual: actual.value,
            algorithm,
        })
    }
}

/// Verify a file matches an expected hash
///
/// Streams the file content to avoid loading it entirely into memory.
pub fn verify_file(
    path: &std::path::Path,
    expected: &str,
    algorithm: HashAlgorithm,
) -> Result<(), VerifyError> {
    let mut file = std::fs::File::open(path).map_err(|_| VerifyError {
        expected: expected.to_string(),
        actual: "<file read error>".to_string(),
        algorithm,
    })?;

    let actual = hash_reader(algorithm, &mut file).map_err(|_| VerifyError {
        expected: expected.to_string(),
        actual: "<hash read error>".to_string(),
        algorithm,
    })?;

    if actual.value == expected.to_lowercase() {
        Ok(())
    } else {
        Err(VerifyError {
            expected: expected.to_string(),
            actual: actual.value,
            algorithm,
        })
    }
}

/// Verify bytes match expected SHA-256 hash (convenience function)
#[inline]
pub fn verify_sha256(data: &[u8], expected: &str) -> Result<(), VerifyError> {
    verify_bytes(data, expected, HashAlgorithm::Sha256)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hash() {
        let data = b"Hello, World!";
        let hash = hash_bytes(HashAlgorithm::Sha256, data);

        assert_eq!(hash.algorithm, HashAlgorithm::Sha256);
        assert_eq!(
            hash.value,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
        assert_eq!(hash.value.len(), 64); // 256 bits = 32 bytes = 64 hex chars
    }

    #[test]
    fn test_md5_known_value() {
        // MD5 of the empty input, as seen in legacy index entries
        let hash = hash_bytes(HashAlgorithm::Md5, b"");
        assert_eq!(hash.value, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_sha512_length() {
        let hash = hash_bytes(HashAlgorithm::Sha512, b"Hello, World!");
        assert_eq!(hash.algorithm, HashAlgorithm::Sha512);
        assert_eq!(hash.value.len(), 128); // 512 bits = 64 bytes = 128 hex chars
    }

    #[test]
    fn test_hasher_incremental() {
        let data = b"Hello, World!";

        // Full hash
        let full_hash = hash_bytes(HashAlgorithm::Sha256, data);

        // Incremental hash
        let mut hasher = Hasher::new(HashAlgorithm::Sha256);
        hasher.update(b"Hello, ");
        hasher.update(b"World!");
        let incremental_hash = hasher.finalize();

        assert_eq!(full_hash, incremental_hash);
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert_eq!("md5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert!("whirlpool".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_hash_validation() {
        // Valid SHA-256
        let hash = Hash::new(
            HashAlgorithm::Sha256,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f",
        );
        assert!(hash.is_ok());

        // Wrong length
        let hash = Hash::new(HashAlgorithm::Sha256, "abc123");
        assert!(matches!(hash, Err(HashError::InvalidLength { .. })));

        // Invalid hex
        let hash = Hash::new(
            HashAlgorithm::Sha256,
            "gggg6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f",
        );
        assert!(matches!(hash, Err(HashError::InvalidHex(_))));
    }

    #[test]
    fn test_from_index_entry() {
        let hash = Hash::from_index_entry(
            "DFFD6021BB2BD5B0AF676290809EC3A53191DD81C7F70A4B28688A362182986F",
            "sha256",
        )
        .unwrap();
        assert_eq!(hash.algorithm, HashAlgorithm::Sha256);
        // Normalized to lowercase for comparisons
        assert!(hash.value.starts_with("dffd6021"));

        assert!(Hash::from_index_entry("00", "whirlpool").is_err());
        assert!(Hash::from_index_entry("00", "sha256").is_err());
    }

    #[test]
    fn test_hash_display() {
        let hash = hash_bytes(HashAlgorithm::Sha256, b"test");
        let display = format!("{}", hash);
        assert_eq!(display, hash.value);
    }

    #[test]
    fn test_hash_reader() {
        let data = b"Hello, World!";
        let mut cursor = std::io::Cursor::new(data);

        let hash = hash_reader(HashAlgorithm::Sha256, &mut cursor).unwrap();
        let expected = hash_bytes(HashAlgorithm::Sha256, data);

        assert_eq!(hash, expected);
    }

    #[test]
    fn test_default_algorithm() {
        let algo = HashAlgorithm::default();
        assert_eq!(algo, HashAlgorithm::Sha256);
    }

    #[test]
    fn test_verify_bytes_sha256() {
        let data = b"hello world";
        let hash = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

        assert!(verify_bytes(data, hash, HashAlgorithm::Sha256).is_ok());
        assert!(verify_sha256(data, hash).is_ok());

        // Wrong hash should fail
        let wrong = "0000000000000000000000000000000000000000000000000000000000000000";
        assert!(verify_bytes(data, wrong, HashAlgorithm::Sha256).is_err());
    }

    #[test]
    fn test_verify_case_insensitive() {
        let data = b"test";
        let hash_lower = sha256(data);
        let hash_upper = hash_lower.to_uppercase();

        // Should work with either case
        assert!(verify_sha256(data, &hash_lower).is_ok());
        assert!(verify_sha256(data, &hash_upper).is_ok());
    }

    #[test]
    fn test_verify_error_contains_actual() {
        let data = b"hello";
        let wrong_hash = "0000000000000000000000000000000000000000000000000000000000000000";

        let err = verify_sha256(data, wrong_hash).unwrap_err();
        assert_eq!(err.expected, wrong_hash);
        assert_eq!(err.actual, sha256(data));
        assert_eq!(err.algorithm, HashAlgorithm::Sha256);
    }

    #[test]
    fn test_verify_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.bin");
        std::fs::write(&path, b"package content").unwrap();

        let good = sha256(b"package content");
        assert!(verify_file(&path, &good, HashAlgorithm::Sha256).is_ok());

        let bad = sha256(b"other content");
        assert!(verify_file(&path, &bad, HashAlgorithm::Sha256).is_err());
    }

    #[test]
    fn test_md5_not_cryptographic() {
        assert!(HashAlgorithm::Sha256.is_cryptographic());
        assert!(HashAlgorithm::Sha512.is_cryptographic());
        assert!(!HashAlgorithm::Md5.is_cryptographic());
    }
}
