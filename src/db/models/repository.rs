// src/db/models/repository.rs

//! Repository and RepoMirror models - remote catalog sources

use crate::error::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository represents an independently operated package source
///
/// Identity is the canonical address. `fingerprint` stays NULL until the
/// user accepts the source's signing key on first use; after that it is the
/// pinned trust anchor for every future index. `priority` orders conflict
/// resolution: numerically lower values are more authoritative.
#[derive(Debug, Clone)]
pub struct Repository {
    pub id: Option<i64>,
    pub address: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub fingerprint: Option<String>,
    pub priority: i32,
    pub enabled: bool,
    pub push_enabled: bool,
    pub etag: Option<String>,
    pub index_timestamp: Option<i64>,
    pub last_updated: Option<String>,
    pub created_at: Option<String>,
}

impl Repository {
    /// Create a new Repository for an address
    ///
    /// Priority 0 means "assign on insert": the new repository is appended
    /// after all existing ones (least authoritative).
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            id: None,
            address: address.into(),
            name: None,
            description: None,
            fingerprint: None,
            priority: 0,
            enabled: true,
            push_enabled: false,
            etag: None,
            index_timestamp: None,
            last_updated: None,
            created_at: None,
        }
    }

    /// Next free priority value (monotonically increasing)
    pub fn next_priority(conn: &Connection) -> Result<i32> {
        let max: i32 = conn.query_row(
            "SELECT COALESCE(MAX(priority), 0) FROM repositories",
            [],
            |row| row.get(0),
        )?;
        Ok(max + 1)
    }

    /// Insert this repository into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        if self.priority == 0 {
            self.priority = Self::next_priority(conn)?;
        }

        conn.execute(
            "INSERT INTO repositories
             (address, name, description, fingerprint, priority, enabled, push_enabled, etag, index_timestamp, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &self.address,
                &self.name,
                &self.description,
                &self.fingerprint,
                &self.priority,
                self.enabled as i32,
                self.push_enabled as i32,
                &self.etag,
                &self.index_timestamp,
                &self.last_updated,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a repository by ID
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, address, name, description, fingerprint, priority, enabled, push_enabled,
                    etag, index_timestamp, last_updated, created_at
             FROM repositories WHERE id = ?1",
        )?;

        let repo = stmt.query_row([id], Self::from_row).optional()?;

        Ok(repo)
    }

    /// Find a repository by its canonical address
    pub fn find_by_address(conn: &Connection, address: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, address, name, description, fingerprint, priority, enabled, push_enabled,
                    etag, index_timestamp, last_updated, created_at
             FROM repositories WHERE address = ?1",
        )?;

        let repo = stmt.query_row([address], Self::from_row).optional()?;

        Ok(repo)
    }

    /// List all repositories, most authoritative first
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, address, name, description, fingerprint, priority, enabled, push_enabled,
                    etag, index_timestamp, last_updated, created_at
             FROM repositories ORDER BY priority, id",
        )?;

        let repos = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(repos)
    }

    /// List enabled repositories, most authoritative first
    pub fn list_enabled(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, address, name, description, fingerprint, priority, enabled, push_enabled,
                    etag, index_timestamp, last_updated, created_at
             FROM repositories WHERE enabled = 1 ORDER BY priority, id",
        )?;

        let repos = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(repos)
    }

    /// Update repository metadata
    pub fn update(&self, conn: &Connection) -> Result<()> {
        let id = self.require_id()?;

        conn.execute(
            "UPDATE repositories SET address = ?1, name = ?2, description = ?3, fingerprint = ?4,
             priority = ?5, enabled = ?6, push_enabled = ?7, etag = ?8, index_timestamp = ?9,
             last_updated = ?10 WHERE id = ?11",
            params![
                &self.address,
                &self.name,
                &self.description,
                &self.fingerprint,
                &self.priority,
                self.enabled as i32,
                self.push_enabled as i32,
                &self.etag,
                &self.index_timestamp,
                &self.last_updated,
                id,
            ],
        )?;

        Ok(())
    }

    /// Pin a trust fingerprint for this repository
    pub fn set_fingerprint(&mut self, conn: &Connection, fingerprint: &str) -> Result<()> {
        let id = self.require_id()?;
        conn.execute(
            "UPDATE repositories SET fingerprint = ?1 WHERE id = ?2",
            params![fingerprint, id],
        )?;
        self.fingerprint = Some(fingerprint.to_string());
        Ok(())
    }

    /// Delete a repository by ID
    ///
    /// Cascade removes all apps, apks, and mirrors owned by it.
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM repositories WHERE id = ?1", [id])?;
        Ok(())
    }

    pub(crate) fn require_id(&self) -> Result<i64> {
        self.id
            .ok_or_else(|| Error::NotFound("repository has no id yet".to_string()))
    }

    /// Convert a database row to a Repository
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            address: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            fingerprint: row.get(4)?,
            priority: row.get(5)?,
            enabled: row.get::<_, i32>(6)? != 0,
            push_enabled: row.get::<_, i32>(7)? != 0,
            etag: row.get(8)?,
            index_timestamp: row.get(9)?,
            last_updated: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

/// RepoMirror represents an alternative download location for a repository
///
/// Official mirrors arrive with each index and are replaced wholesale on
/// ingest; user-added mirrors survive. Rolling success/error counters order
/// mirror attempts.
#[derive(Debug, Clone)]
pub struct RepoMirror {
    pub id: Option<i64>,
    pub repository_id: i64,
    pub url: String,
    pub user_added: bool,
    pub success_count: i64,
    pub error_count: i64,
    pub last_used: Option<String>,
}

impl RepoMirror {
    /// Create a new mirror entry
    pub fn new(repository_id: i64, url: impl Into<String>, user_added: bool) -> Self {
        Self {
            id: None,
            repository_id,
            url: url.into(),
            user_added,
            success_count: 0,
            error_count: 0,
            last_used: None,
        }
    }

    /// Insert this mirror, keeping the existing row (and its counters) if
    /// the URL is already known for the repository
    pub fn insert(&mut self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO repo_mirrors (repository_id, url, user_added, success_count, error_count)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(repository_id, url) DO NOTHING",
            params![
                &self.repository_id,
                &self.url,
                self.user_added as i32,
                &self.success_count,
                &self.error_count,
            ],
        )?;
        Ok(())
    }

    /// List mirrors for a repository, best health score first
    pub fn find_by_repository(conn: &Connection, repository_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, repository_id, url, user_added, success_count, error_count, last_used
             FROM repo_mirrors WHERE repository_id = ?1
             ORDER BY (success_count - error_count) DESC, id",
        )?;

        let mirrors = stmt
            .query_map([repository_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(mirrors)
    }

    /// Record a successful fetch through this mirror
    pub fn record_success(conn: &Connection, repository_id: i64, url: &str) -> Result<()> {
        conn.execute(
            "UPDATE repo_mirrors SET success_count = success_count + 1,
             last_used = CURRENT_TIMESTAMP
             WHERE repository_id = ?1 AND url = ?2",
            params![repository_id, url],
        )?;
        Ok(())
    }

    /// Record a failed fetch through this mirror
    pub fn record_error(conn: &Connection, repository_id: i64, url: &str) -> Result<()> {
        conn.execute(
            "UPDATE repo_mirrors SET error_count = error_count + 1,
             last_used = CURRENT_TIMESTAMP
             WHERE repository_id = ?1 AND url = ?2",
            params![repository_id, url],
        )?;
        Ok(())
    }

    /// Drop the official mirror set for a repository (index re-ingest)
    pub fn delete_official_by_repository(conn: &Connection, repository_id: i64) -> Result<()> {
        conn.execute(
            "DELETE FROM repo_mirrors WHERE repository_id = ?1 AND user_added = 0",
            [repository_id],
        )?;
        Ok(())
    }

    /// Delete a mirror by ID
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM repo_mirrors WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Convert a database row to a RepoMirror
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            repository_id: row.get(1)?,
            url: row.get(2)?,
            user_added: row.get::<_, i32>(3)? != 0,
            success_count: row.get(4)?,
            error_count: row.get(5)?,
            last_used: row.get(6)?,
        })
    }
}
