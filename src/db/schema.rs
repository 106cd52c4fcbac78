// src/db/schema.rs

//! Database schema definitions and migrations
//!
//! This module defines the SQLite schema for all catalog tables and provides
//! a migration system to evolve the schema over time.

use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Apply all pending migrations to bring the database up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    debug!("Current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    // Apply migrations in order
    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!(
        "Schema migration complete. Now at version {}",
        SCHEMA_VERSION
    );
    Ok(())
}

/// Apply a specific migration version
fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => panic!("Unknown migration version: {}", version),
    }
}

/// Initial schema - Version 1
///
/// Creates all catalog tables:
/// - repositories: known package sources with pinned trust identity
/// - repo_mirrors: alternative download locations with health counters
/// - apps: per-repository application metadata
/// - apks: per-repository, per-version package entries
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        -- Repositories: independently operated package sources
        CREATE TABLE repositories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT NOT NULL UNIQUE,
            name TEXT,
            description TEXT,
            fingerprint TEXT,
            priority INTEGER NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            push_enabled INTEGER NOT NULL DEFAULT 0,
            etag TEXT,
            index_timestamp INTEGER,
            last_updated TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX idx_repositories_priority ON repositories(priority);
        CREATE INDEX idx_repositories_enabled ON repositories(enabled);

        -- Mirrors: alternative addresses for a repository's content
        CREATE TABLE repo_mirrors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            repository_id INTEGER NOT NULL,
            url TEXT NOT NULL,
            user_added INTEGER NOT NULL DEFAULT 0,
            success_count INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            last_used TEXT,
            UNIQUE(repository_id, url),
            FOREIGN KEY (repository_id) REFERENCES repositories(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_repo_mirrors_repository_id ON repo_mirrors(repository_id);

        -- Apps: application metadata, one row per (package, repository)
        CREATE TABLE apps (
            package_name TEXT NOT NULL,
            repository_id INTEGER NOT NULL,
            name TEXT,
            summary TEXT,
            description TEXT,
            web_url TEXT,
            source_url TEXT,
            tracker_url TEXT,
            changelog_url TEXT,
            suggested_version_code INTEGER,
            added INTEGER,
            last_updated INTEGER,
            signer TEXT,
            PRIMARY KEY (package_name, repository_id),
            FOREIGN KEY (repository_id) REFERENCES repositories(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_apps_repository_id ON apps(repository_id);
        CREATE INDEX idx_apps_name ON apps(name);

        -- Apks: package versions, immutable per (package, repository, vercode)
        CREATE TABLE apks (
            package_name TEXT NOT NULL,
            repository_id INTEGER NOT NULL,
            version_code INTEGER NOT NULL,
            version_name TEXT,
            apk_name TEXT NOT NULL,
            hash TEXT NOT NULL,
            hash_type TEXT NOT NULL,
            signer TEXT,
            size INTEGER,
            min_sdk INTEGER,
            max_sdk INTEGER,
            nativecode TEXT,
            features TEXT,
            added INTEGER,
            PRIMARY KEY (package_name, repository_id, version_code),
            FOREIGN KEY (package_name, repository_id)
                REFERENCES apps(package_name, repository_id) ON DELETE CASCADE
        );

        CREATE INDEX idx_apks_package_name ON apks(package_name);
        CREATE INDEX idx_apks_repository_id ON apks(repository_id);
        CREATE INDEX idx_apks_hash ON apks(hash);
        ",
    )?;

    debug!("Schema version 1 created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_db() -> (NamedTempFile, Connection) {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = Connection::open(temp_file.path()).unwrap();
        (temp_file, conn)
    }

    #[test]
    fn test_schema_version_tracking() {
        let (_temp, conn) = create_test_db();

        // Initial version should be 0
        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, 0);

        // Set version to 1
        set_schema_version(&conn, 1).unwrap();
        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_migrate_creates_all_tables() {
        let (_temp, conn) = create_test_db();

        // Run migration
        migrate(&conn).unwrap();

        // Verify all tables exist
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"repositories".to_string()));
        assert!(tables.contains(&"repo_mirrors".to_string()));
        assert!(tables.contains(&"apps".to_string()));
        assert!(tables.contains(&"apks".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let (_temp, conn) = create_test_db();

        // Run migration twice
        migrate(&conn).unwrap();
        let version1 = get_schema_version(&conn).unwrap();

        migrate(&conn).unwrap();
        let version2 = get_schema_version(&conn).unwrap();

        assert_eq!(version1, version2);
        assert_eq!(version1, SCHEMA_VERSION);
    }

    #[test]
    fn test_repository_address_unique() {
        let (_temp, conn) = create_test_db();
        migrate(&conn).unwrap();

        conn.execute(
            "INSERT INTO repositories (address, priority) VALUES (?1, ?2)",
            rusqlite::params!["https://repo.example.org/repo", 1],
        )
        .unwrap();

        // Same address again violates the UNIQUE constraint
        let result = conn.execute(
            "INSERT INTO repositories (address, priority) VALUES (?1, ?2)",
            rusqlite::params!["https://repo.example.org/repo", 2],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_apk_composite_key() {
        let (_temp, conn) = create_test_db();
        migrate(&conn).unwrap();

        conn.execute(
            "INSERT INTO repositories (id, address, priority) VALUES (1, 'https://a', 1)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO apps (package_name, repository_id) VALUES ('org.example', 1)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO apks (package_name, repository_id, version_code, apk_name, hash, hash_type)
             VALUES ('org.example', 1, 7, 'org.example_7.apk', 'aa', 'sha256')",
            [],
        )
        .unwrap();

        // Same (package, repo, vercode) violates the composite primary key
        let result = conn.execute(
            "INSERT INTO apks (package_name, repository_id, version_code, apk_name, hash, hash_type)
             VALUES ('org.example', 1, 7, 'org.example_7b.apk', 'bb', 'sha256')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_cascade_delete_repository() {
        let (_temp, conn) = create_test_db();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        migrate(&conn).unwrap();

        conn.execute(
            "INSERT INTO repositories (id, address, priority) VALUES (1, 'https://a', 1)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO apps (package_name, repository_id) VALUES ('org.example', 1)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO apks (package_name, repository_id, version_code, apk_name, hash, hash_type)
             VALUES ('org.example', 1, 7, 'org.example_7.apk', 'aa', 'sha256')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO repo_mirrors (repository_id, url) VALUES (1, 'https://mirror')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM repositories WHERE id = 1", [])
            .unwrap();

        let apps: i64 = conn
            .query_row("SELECT COUNT(*) FROM apps", [], |row| row.get(0))
            .unwrap();
        let apks: i64 = conn
            .query_row("SELECT COUNT(*) FROM apks", [], |row| row.get(0))
            .unwrap();
        let mirrors: i64 = conn
            .query_row("SELECT COUNT(*) FROM repo_mirrors", [], |row| row.get(0))
            .unwrap();
        assert_eq!(apps, 0);
        assert_eq!(apks, 0);
        assert_eq!(mirrors, 0);
    }
}
