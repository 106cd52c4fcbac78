// src/index/mod.rs

//! Index document model and parser
//!
//! A repository publishes a single signed JSON document describing
//! everything it offers. Parsing is all-or-nothing: the document either
//! yields a complete [`RepoSnapshot`] or fails with
//! [`Error::MalformedIndex`] without touching the catalog, so a bad index
//! can never leave a repository half-ingested.

pub mod fetch;

use crate::error::{Error, Result};
use crate::hash::Hash;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

/// File name of the index document relative to a repository address
pub const INDEX_NAME: &str = "index.json";

/// File name of the detached signature next to the index
pub const INDEX_SIG_NAME: &str = "index.json.sig";

/// Raw serde model of the index document
#[derive(Debug, Deserialize)]
struct RawIndex {
    repo: RawRepoSection,
    #[serde(default)]
    apps: Vec<AppEntry>,
    /// Versions per package, keyed by package name
    #[serde(default)]
    packages: BTreeMap<String, Vec<ApkEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawRepoSection {
    name: String,
    #[serde(default)]
    description: Option<String>,
    timestamp: i64,
    version: i64,
    #[serde(default)]
    mirrors: Vec<String>,
}

/// One application's metadata as published by a repository
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEntry {
    pub package_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub tracker_url: Option<String>,
    #[serde(default)]
    pub changelog_url: Option<String>,
    #[serde(default)]
    pub suggested_version_code: Option<i64>,
    #[serde(default)]
    pub added: Option<i64>,
    #[serde(default)]
    pub last_updated: Option<i64>,
    #[serde(default)]
    pub signer: Option<String>,
}

/// One downloadable version as published by a repository
///
/// `package_name` may be omitted in the document (the `packages` map key
/// carries it); the parser stamps it in and rejects mismatches.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApkEntry {
    #[serde(default)]
    pub package_name: String,
    pub version_code: i64,
    #[serde(default)]
    pub version_name: Option<String>,
    pub apk_name: String,
    pub hash: String,
    pub hash_type: String,
    #[serde(default)]
    pub signer: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub min_sdk: Option<i64>,
    #[serde(default)]
    pub max_sdk: Option<i64>,
    #[serde(default)]
    pub nativecode: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub added: Option<i64>,
}

/// Fully parsed and validated contents of one repository's index
#[derive(Debug, Clone)]
pub struct RepoSnapshot {
    pub repo_name: String,
    pub description: Option<String>,
    /// Publication time of the index, milliseconds since the epoch
    pub timestamp: i64,
    /// Index format version
    pub version: i64,
    pub mirrors: Vec<String>,
    pub apps: Vec<AppEntry>,
    pub apks: Vec<ApkEntry>,
}

impl RepoSnapshot {
    /// Number of distinct packages in this snapshot
    pub fn package_count(&self) -> usize {
        self.apps.len()
    }
}

/// Parse verified index bytes into a [`RepoSnapshot`]
///
/// Every structural problem is reported as [`Error::MalformedIndex`]; a
/// partially valid document never yields a partial snapshot.
pub fn parse_index(data: &[u8]) -> Result<RepoSnapshot> {
    let raw: RawIndex = serde_json::from_slice(data)
        .map_err(|e| Error::MalformedIndex(format!("invalid index document: {e}")))?;

    if raw.repo.name.trim().is_empty() {
        return Err(Error::MalformedIndex("repo name is empty".to_string()));
    }
    if raw.repo.timestamp <= 0 {
        return Err(Error::MalformedIndex(format!(
            "repo timestamp {} is not positive",
            raw.repo.timestamp
        )));
    }

    let mut seen_packages = HashSet::new();
    for app in &raw.apps {
        if app.package_name.trim().is_empty() {
            return Err(Error::MalformedIndex(
                "app entry with empty package name".to_string(),
            ));
        }
        if !seen_packages.insert(app.package_name.as_str()) {
            return Err(Error::MalformedIndex(format!(
                "duplicate app entry for '{}'",
                app.package_name
            )));
        }
    }

    let mut apks = Vec::new();
    for (package_name, entries) in &raw.packages {
        if !seen_packages.contains(package_name.as_str()) {
            return Err(Error::MalformedIndex(format!(
                "package '{}' has versions but no app entry",
                package_name
            )));
        }

        let mut seen_vercodes = HashSet::new();
        for entry in entries {
            let mut apk = entry.clone();

            if apk.package_name.is_empty() {
                apk.package_name = package_name.clone();
            } else if apk.package_name != *package_name {
                return Err(Error::MalformedIndex(format!(
                    "apk entry under '{}' names package '{}'",
                    package_name, apk.package_name
                )));
            }

            if apk.version_code <= 0 {
                return Err(Error::MalformedIndex(format!(
                    "'{}' has non-positive version code {}",
                    package_name, apk.version_code
                )));
            }
            if !seen_vercodes.insert(apk.version_code) {
                return Err(Error::MalformedIndex(format!(
                    "'{}' lists version code {} twice",
                    package_name, apk.version_code
                )));
            }
            if apk.apk_name.trim().is_empty() {
                return Err(Error::MalformedIndex(format!(
                    "'{}' version {} has no file name",
                    package_name, apk.version_code
                )));
            }

            // Normalizes casing and validates length against the algorithm
            let hash = Hash::from_index_entry(&apk.hash, &apk.hash_type).map_err(|e| {
                Error::MalformedIndex(format!(
                    "'{}' version {}: {}",
                    package_name, apk.version_code, e
                ))
            })?;
            apk.hash = hash.value;
            apk.hash_type = hash.algorithm.name().to_string();

            apks.push(apk);
        }
    }

    Ok(RepoSnapshot {
        repo_name: raw.repo.name,
        description: raw.repo.description,
        timestamp: raw.repo.timestamp,
        version: raw.repo.version,
        mirrors: raw.repo.mirrors,
        apps: raw.apps,
        apks,
    })
}
