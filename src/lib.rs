// src/lib.rs

//! Kiosk application catalog
//!
//! Client core for installing applications from multiple independently
//! operated, signed repositories. Repositories publish signed JSON
//! indexes; kiosk verifies them, merges them into one catalog, and walks
//! verified binaries through the host installer.
//!
//! # Architecture
//!
//! - Database-first: the merged catalog lives in SQLite; each index is
//!   ingested atomically, so a repository is either fully updated or
//!   untouched
//! - Trust pipeline: an index must verify against the repository's pinned
//!   signing key fingerprint before any row of it is merged
//! - Priority merge: repository priority resolves every metadata conflict
//!   deterministically, independent of ingest order
//! - Install sessions: a binary is hash- and signer-verified and staged
//!   before the host installer sees it, with lifecycle events at every
//!   transition

pub mod catalog;
pub mod config;
pub mod db;
mod error;
pub mod hash;
pub mod index;
pub mod install;
pub mod trust;

pub use config::{Config, CorePaths};
pub use error::{Error, Result, TrustError};
pub use hash::{Hash, HashAlgorithm, Hasher};
pub use install::{CancelHandle, InstallCoordinator, InstallMode, InstallRequest};
