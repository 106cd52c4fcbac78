// src/db/models/app.rs

//! App model - per-repository application metadata

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// App represents one repository's metadata for a package
///
/// Keyed by `(package_name, repository_id)`: every repository that lists a
/// package owns its own row, and all rows for a repository are replaced
/// wholesale on each successful index ingest. Which row "wins" for display
/// is decided at query time by the catalog, never stored here.
#[derive(Debug, Clone, PartialEq)]
pub struct App {
    pub package_name: String,
    pub repository_id: i64,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub web_url: Option<String>,
    pub source_url: Option<String>,
    pub tracker_url: Option<String>,
    pub changelog_url: Option<String>,
    pub suggested_version_code: Option<i64>,
    pub added: Option<i64>,
    pub last_updated: Option<i64>,
    pub signer: Option<String>,
}

impl App {
    /// Create a new App row skeleton
    pub fn new(package_name: impl Into<String>, repository_id: i64) -> Self {
        Self {
            package_name: package_name.into(),
            repository_id,
            name: None,
            summary: None,
            description: None,
            web_url: None,
            source_url: None,
            tracker_url: None,
            changelog_url: None,
            suggested_version_code: None,
            added: None,
            last_updated: None,
            signer: None,
        }
    }

    /// Insert this app into the database
    pub fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO apps
             (package_name, repository_id, name, summary, description, web_url, source_url,
              tracker_url, changelog_url, suggested_version_code, added, last_updated, signer)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                &self.package_name,
                &self.repository_id,
                &self.name,
                &self.summary,
                &self.description,
                &self.web_url,
                &self.source_url,
                &self.tracker_url,
                &self.changelog_url,
                &self.suggested_version_code,
                &self.added,
                &self.last_updated,
                &self.signer,
            ],
        )?;
        Ok(())
    }

    /// Find one repository's row for a package
    pub fn find(conn: &Connection, package_name: &str, repository_id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT package_name, repository_id, name, summary, description, web_url, source_url,
                    tracker_url, changelog_url, suggested_version_code, added, last_updated, signer
             FROM apps WHERE package_name = ?1 AND repository_id = ?2",
        )?;

        let app = stmt
            .query_row(params![package_name, repository_id], Self::from_row)
            .optional()?;

        Ok(app)
    }

    /// All rows for a package across repositories
    pub fn list_by_package(conn: &Connection, package_name: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT package_name, repository_id, name, summary, description, web_url, source_url,
                    tracker_url, changelog_url, suggested_version_code, added, last_updated, signer
             FROM apps WHERE package_name = ?1 ORDER BY repository_id",
        )?;

        let apps = stmt
            .query_map([package_name], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(apps)
    }

    /// All rows owned by a repository
    pub fn list_by_repository(conn: &Connection, repository_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT package_name, repository_id, name, summary, description, web_url, source_url,
                    tracker_url, changelog_url, suggested_version_code, added, last_updated, signer
             FROM apps WHERE repository_id = ?1 ORDER BY package_name",
        )?;

        let apps = stmt
            .query_map([repository_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(apps)
    }

    /// Search apps by pattern (package name, display name, or summary)
    pub fn search(conn: &Connection, pattern: &str) -> Result<Vec<Self>> {
        let search_pattern = format!("%{pattern}%");
        let mut stmt = conn.prepare(
            "SELECT package_name, repository_id, name, summary, description, web_url, source_url,
                    tracker_url, changelog_url, suggested_version_code, added, last_updated, signer
             FROM apps
             WHERE package_name LIKE ?1 OR name LIKE ?1 OR summary LIKE ?1
             ORDER BY package_name, repository_id",
        )?;

        let apps = stmt
            .query_map([&search_pattern], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(apps)
    }

    /// Delete all apps for a repository (full replace on ingest)
    pub fn delete_by_repository(conn: &Connection, repository_id: i64) -> Result<()> {
        conn.execute("DELETE FROM apps WHERE repository_id = ?1", [repository_id])?;
        Ok(())
    }

    /// Count distinct packages known across all repositories
    pub fn count_packages(conn: &Connection) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(DISTINCT package_name) FROM apps",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Convert a database row to an App
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            package_name: row.get(0)?,
            repository_id: row.get(1)?,
            name: row.get(2)?,
            summary: row.get(3)?,
            description: row.get(4)?,
            web_url: row.get(5)?,
            source_url: row.get(6)?,
            tracker_url: row.get(7)?,
            changelog_url: row.get(8)?,
            suggested_version_code: row.get(9)?,
            added: row.get(10)?,
            last_updated: row.get(11)?,
            signer: row.get(12)?,
        })
    }
}
