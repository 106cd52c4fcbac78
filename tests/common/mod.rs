// tests/common/mod.rs

//! Shared builders for integration tests: index documents, signed
//! file:// repositories, and catalog databases.

use kiosk::db;
use kiosk::db::models::Repository;
use kiosk::hash;
use kiosk::index::{INDEX_NAME, INDEX_SIG_NAME};
use kiosk::trust::signing::SigningKeyPair;
use rusqlite::Connection;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Minimal app metadata object for an index document
pub fn app(package: &str, name: &str) -> Value {
    json!({"packageName": package, "name": name})
}

/// One published version of `package`; the hash commits to `content`
pub fn version(package: &str, version_code: i64, content: &[u8]) -> Value {
    json!({
        "versionCode": version_code,
        "versionName": format!("1.{version_code}"),
        "apkName": format!("{package}_{version_code}.apk"),
        "hash": hash::sha256(content),
        "hashType": "sha256",
        "size": content.len()
    })
}

/// Serialize a complete index document
pub fn index_doc(repo_name: &str, apps: Vec<Value>, packages: Vec<(&str, Vec<Value>)>) -> Vec<u8> {
    let mut by_package = serde_json::Map::new();
    for (package, versions) in packages {
        by_package.insert(package.to_string(), Value::Array(versions));
    }
    serde_json::to_vec(&json!({
        "repo": {"name": repo_name, "timestamp": 1_700_000_000_000i64, "version": 1},
        "apps": apps,
        "packages": by_package
    }))
    .unwrap()
}

/// Write a signed index into `dir` and return its file:// address
pub fn publish(dir: &Path, keypair: &SigningKeyPair, index: &[u8]) -> String {
    std::fs::write(dir.join(INDEX_NAME), index).unwrap();
    let envelope = keypair.sign_index(index);
    std::fs::write(
        dir.join(INDEX_SIG_NAME),
        serde_json::to_vec(&envelope).unwrap(),
    )
    .unwrap();
    file_address(dir)
}

/// file:// form of a local directory, without a trailing slash
pub fn file_address(dir: &Path) -> String {
    let address = url::Url::from_file_path(dir).unwrap().to_string();
    address.trim_end_matches('/').to_string()
}

/// Fresh catalog database under its own temp dir.
///
/// Returns (TempDir, db_path); keep the TempDir alive to prevent cleanup.
pub fn setup_db() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("catalog.db");
    db::init(&db_path).unwrap();
    (dir, db_path)
}

/// Insert a repository row with an explicit priority
pub fn add_repo(conn: &Connection, address: &str, priority: i32) -> Repository {
    let mut repo = Repository::new(address);
    repo.priority = priority;
    repo.insert(conn).unwrap();
    repo
}

/// Insert a repository already pinned to `keypair`, returning its id
pub fn add_pinned_repo(
    conn: &Connection,
    address: &str,
    priority: i32,
    keypair: &SigningKeyPair,
) -> i64 {
    let mut repo = add_repo(conn, address, priority);
    repo.set_fingerprint(conn, &keypair.fingerprint()).unwrap();
    repo.id.unwrap()
}
