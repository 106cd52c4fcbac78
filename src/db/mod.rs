// src/db/mod.rs

//! SQLite catalog store
//!
//! The merged view of all repositories lives in a single SQLite database.
//! Connections are opened in WAL mode with foreign keys enforced, so a
//! reader never observes a half-replaced repository while an ingest
//! transaction is in flight.

pub mod models;
pub mod schema;

use crate::error::Result;
use rusqlite::{Connection, Transaction};
use std::path::Path;
use tracing::debug;

/// Initialize a new catalog database, creating parent directories and
/// applying all schema migrations
pub fn init(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    configure(&conn)?;
    schema::migrate(&conn)?;

    debug!("catalog database initialized at {}", path.display());
    Ok(conn)
}

/// Open an existing catalog database, applying any pending migrations
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (tests and dry runs)
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    Ok(())
}

/// Run a closure inside a database transaction
///
/// Commits on `Ok`, rolls back on `Err`. All multi-row catalog mutations
/// go through here.
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    let result = f(&tx)?;
    tx.commit()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("catalog.db");

        let conn = init(&db_path).unwrap();
        assert!(db_path.exists());

        // Foreign keys must be enforced on every connection
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_transaction_commits() {
        let mut conn = open_in_memory().unwrap();

        transaction(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO repositories (address, priority) VALUES (?1, ?2)",
                rusqlite::params!["https://repo.example.org/repo", 1],
            )?;
            Ok(())
        })
        .unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM repositories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut conn = open_in_memory().unwrap();

        let result: Result<()> = transaction(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO repositories (address, priority) VALUES (?1, ?2)",
                rusqlite::params!["https://repo.example.org/repo", 1],
            )?;
            Err(crate::error::Error::Config("forced failure".into()))
        });
        assert!(result.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM repositories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
