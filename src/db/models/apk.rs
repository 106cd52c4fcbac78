// src/db/models/apk.rs

//! Apk model - per-repository package versions

use crate::error::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

/// Apk represents one downloadable version of a package, as described by
/// one repository's index
///
/// Keyed by `(package_name, repository_id, version_code)` and immutable
/// once written: the row's hash addresses the binary content, so an index
/// that rewrites the hash of a version it already published is rejected at
/// ingest instead of merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Apk {
    pub package_name: String,
    pub repository_id: i64,
    pub version_code: i64,
    pub version_name: Option<String>,
    /// File name relative to the repository address
    pub apk_name: String,
    pub hash: String,
    pub hash_type: String,
    /// Digest of the signing certificate embedded in the binary
    pub signer: Option<String>,
    pub size: Option<i64>,
    pub min_sdk: Option<i64>,
    pub max_sdk: Option<i64>,
    /// JSON array of supported ABIs
    pub nativecode: Option<String>,
    /// JSON array of required device features
    pub features: Option<String>,
    pub added: Option<i64>,
}

impl Apk {
    /// Create a new Apk row skeleton
    pub fn new(
        package_name: impl Into<String>,
        repository_id: i64,
        version_code: i64,
        apk_name: impl Into<String>,
        hash: impl Into<String>,
        hash_type: impl Into<String>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            repository_id,
            version_code,
            version_name: None,
            apk_name: apk_name.into(),
            hash: hash.into(),
            hash_type: hash_type.into(),
            signer: None,
            size: None,
            min_sdk: None,
            max_sdk: None,
            nativecode: None,
            features: None,
            added: None,
        }
    }

    /// Insert this apk into the database
    pub fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO apks
             (package_name, repository_id, version_code, version_name, apk_name, hash, hash_type,
              signer, size, min_sdk, max_sdk, nativecode, features, added)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                &self.package_name,
                &self.repository_id,
                &self.version_code,
                &self.version_name,
                &self.apk_name,
                &self.hash,
                &self.hash_type,
                &self.signer,
                &self.size,
                &self.min_sdk,
                &self.max_sdk,
                &self.nativecode,
                &self.features,
                &self.added,
            ],
        )?;
        Ok(())
    }

    /// Find a specific version within one repository
    pub fn find(
        conn: &Connection,
        package_name: &str,
        repository_id: i64,
        version_code: i64,
    ) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT package_name, repository_id, version_code, version_name, apk_name, hash,
                    hash_type, signer, size, min_sdk, max_sdk, nativecode, features, added
             FROM apks WHERE package_name = ?1 AND repository_id = ?2 AND version_code = ?3",
        )?;

        let apk = stmt
            .query_row(
                params![package_name, repository_id, version_code],
                Self::from_row,
            )
            .optional()?;

        Ok(apk)
    }

    /// All versions of a package across repositories, newest first
    ///
    /// Rows with equal version codes order by their repository's priority,
    /// so the union view is stable regardless of ingestion order.
    pub fn list_by_package(conn: &Connection, package_name: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT a.package_name, a.repository_id, a.version_code, a.version_name, a.apk_name,
                    a.hash, a.hash_type, a.signer, a.size, a.min_sdk, a.max_sdk, a.nativecode,
                    a.features, a.added
             FROM apks a
             JOIN repositories r ON r.id = a.repository_id
             WHERE a.package_name = ?1
             ORDER BY a.version_code DESC, r.priority, r.id",
        )?;

        let apks = stmt
            .query_map([package_name], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(apks)
    }

    /// All versions a single repository offers for a package, newest first
    pub fn list_by_package_and_repository(
        conn: &Connection,
        package_name: &str,
        repository_id: i64,
    ) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT package_name, repository_id, version_code, version_name, apk_name, hash,
                    hash_type, signer, size, min_sdk, max_sdk, nativecode, features, added
             FROM apks WHERE package_name = ?1 AND repository_id = ?2
             ORDER BY version_code DESC",
        )?;

        let apks = stmt
            .query_map(params![package_name, repository_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(apks)
    }

    /// Map of `(package_name, version_code)` to hash for everything a
    /// repository currently publishes
    ///
    /// Used by the ingest rewrite guard before the repository's rows are
    /// replaced.
    pub fn hashes_by_repository(
        conn: &Connection,
        repository_id: i64,
    ) -> Result<HashMap<(String, i64), String>> {
        let mut stmt = conn.prepare(
            "SELECT package_name, version_code, hash FROM apks WHERE repository_id = ?1",
        )?;

        let mut map = HashMap::new();
        let rows = stmt.query_map([repository_id], |row| {
            Ok((
                (row.get::<_, String>(0)?, row.get::<_, i64>(1)?),
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (key, hash) = row?;
            map.insert(key, hash);
        }

        Ok(map)
    }

    /// Delete all apks for a repository (full replace on ingest)
    pub fn delete_by_repository(conn: &Connection, repository_id: i64) -> Result<()> {
        conn.execute("DELETE FROM apks WHERE repository_id = ?1", [repository_id])?;
        Ok(())
    }

    /// Parse the supported-ABI list from the JSON field
    pub fn parse_nativecode(&self) -> Result<Vec<String>> {
        parse_json_list(&self.nativecode, "nativecode")
    }

    /// Parse the required-feature list from the JSON field
    pub fn parse_features(&self) -> Result<Vec<String>> {
        parse_json_list(&self.features, "features")
    }

    /// Download URL for this apk relative to a repository address
    pub fn download_url(&self, repo_address: &str) -> String {
        format!("{}/{}", repo_address.trim_end_matches('/'), self.apk_name)
    }

    /// Convert a database row to an Apk
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            package_name: row.get(0)?,
            repository_id: row.get(1)?,
            version_code: row.get(2)?,
            version_name: row.get(3)?,
            apk_name: row.get(4)?,
            hash: row.get(5)?,
            hash_type: row.get(6)?,
            signer: row.get(7)?,
            size: row.get(8)?,
            min_sdk: row.get(9)?,
            max_sdk: row.get(10)?,
            nativecode: row.get(11)?,
            features: row.get(12)?,
            added: row.get(13)?,
        })
    }
}

fn parse_json_list(field: &Option<String>, name: &str) -> Result<Vec<String>> {
    match field {
        Some(json) => serde_json::from_str(json)
            .map_err(|e| Error::MalformedIndex(format!("bad {} list: {}", name, e))),
        None => Ok(Vec::new()),
    }
}
