// src/catalog/mod.rs

//! Multi-repository catalog
//!
//! Merges per-repository rows into one union view and resolves conflicts
//! at query time. Every repository owns its rows outright; which entry
//! "wins" for a package is recomputed from repository priority on each
//! query, so changing priorities or removing a repository never requires
//! re-ingesting anything.
//!
//! Ingest replaces a repository's rows wholesale inside one transaction.
//! Readers observe the previous snapshot or the new one, never a mix.

pub mod sync;

use crate::db;
use crate::db::models::{Apk, App, RepoMirror, Repository};
use crate::error::{Error, Result, TrustError};
use crate::index::{ApkEntry, AppEntry, RepoSnapshot};
use rusqlite::{Connection, params};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Row counts from one successful ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub apps: usize,
    pub apks: usize,
}

/// The winning metadata row for a package plus the repository it came from
#[derive(Debug, Clone)]
pub struct ResolvedApp {
    pub app: App,
    pub repository: Repository,
}

/// One package version tagged with its owning repository
#[derive(Debug, Clone)]
pub struct ApkWithRepo {
    pub apk: Apk,
    pub repository: Repository,
}

/// A version published with different content by different repositories
#[derive(Debug, Clone)]
pub struct HashConflict {
    pub package_name: String,
    pub version_code: i64,
    /// `(repository address, hash)` pairs, most authoritative repository
    /// first
    pub hashes: Vec<(String, String)>,
}

/// Replace a repository's catalog rows with a verified snapshot
///
/// Runs entirely inside one transaction. Before any row is touched, every
/// incoming version is checked against what the repository already
/// published: a changed hash for a retained `(package, version_code)` pair
/// aborts the whole ingest with [`TrustError::HashMismatch`], leaving the
/// previous snapshot in place. Index-provided mirrors replace the official
/// mirror set; user-added mirrors are kept.
///
/// `repo` must already be persisted. Its name, description, and index
/// timestamp are taken from the snapshot and written back along with
/// whatever the caller staged on the struct (etag, last update time).
pub fn ingest(
    conn: &mut Connection,
    repo: &mut Repository,
    snapshot: &RepoSnapshot,
) -> Result<IngestStats> {
    let repo_id = repo.require_id()?;

    repo.name = Some(snapshot.repo_name.clone());
    repo.description = snapshot.description.clone();
    repo.index_timestamp = Some(snapshot.timestamp);

    let address = repo.address.clone();
    let stats = db::transaction(conn, |tx| {
        let published = Apk::hashes_by_repository(tx, repo_id)?;
        for entry in &snapshot.apks {
            let key = (entry.package_name.clone(), entry.version_code);
            if let Some(previous) = published.get(&key) {
                if *previous != entry.hash {
                    return Err(TrustError::HashMismatch {
                        context: format!(
                            "{} version {} in {}",
                            entry.package_name, entry.version_code, address
                        ),
                        expected: previous.clone(),
                        actual: entry.hash.clone(),
                    }
                    .into());
                }
            }
        }

        Apk::delete_by_repository(tx, repo_id)?;
        App::delete_by_repository(tx, repo_id)?;

        for entry in &snapshot.apps {
            app_from_entry(entry, repo_id).insert(tx)?;
        }
        for entry in &snapshot.apks {
            apk_from_entry(entry, repo_id)?.insert(tx)?;
        }

        RepoMirror::delete_official_by_repository(tx, repo_id)?;
        for url in &snapshot.mirrors {
            if *url != address {
                RepoMirror::new(repo_id, url.as_str(), false).insert(tx)?;
            }
        }

        repo.update(tx)?;

        Ok(IngestStats {
            apps: snapshot.apps.len(),
            apks: snapshot.apks.len(),
        })
    })?;

    info!(
        "ingested '{}' from {}: {} apps, {} versions",
        snapshot.repo_name, repo.address, stats.apps, stats.apks
    );
    warn_cross_repository_conflicts(conn, repo_id)?;

    Ok(stats)
}

/// Resolve which repository's metadata row represents a package
///
/// The winner is the row from the enabled repository with the numerically
/// lowest priority; ties break by lowest repository id. The result depends
/// only on the rows currently stored, never on the order they arrived in.
pub fn resolve_app(conn: &Connection, package_name: &str) -> Result<Option<ResolvedApp>> {
    for repository in Repository::list_enabled(conn)? {
        let repo_id = repository.require_id()?;
        if let Some(app) = App::find(conn, package_name, repo_id)? {
            return Ok(Some(ResolvedApp { app, repository }));
        }
    }
    Ok(None)
}

/// Union of all versions enabled repositories offer for a package
///
/// Ordered by `version_code DESC`, then repository priority. The same
/// version published by several repositories appears once per repository;
/// disagreements about its content are left visible for
/// [`hash_conflicts`] to report.
pub fn apks_for_package(conn: &Connection, package_name: &str) -> Result<Vec<ApkWithRepo>> {
    let repositories: HashMap<i64, Repository> = Repository::list_enabled(conn)?
        .into_iter()
        .filter_map(|r| r.id.map(|id| (id, r)))
        .collect();

    let mut rows = Vec::new();
    for apk in Apk::list_by_package(conn, package_name)? {
        if let Some(repository) = repositories.get(&apk.repository_id) {
            rows.push(ApkWithRepo {
                apk,
                repository: repository.clone(),
            });
        }
    }
    Ok(rows)
}

/// Versions of a package that different repositories publish with
/// different content hashes
pub fn hash_conflicts(conn: &Connection, package_name: &str) -> Result<Vec<HashConflict>> {
    let mut by_version: Vec<(i64, Vec<(String, String)>)> = Vec::new();
    for row in apks_for_package(conn, package_name)? {
        let pair = (row.repository.address.clone(), row.apk.hash.clone());
        match by_version
            .iter_mut()
            .find(|(code, _)| *code == row.apk.version_code)
        {
            Some((_, hashes)) => hashes.push(pair),
            None => by_version.push((row.apk.version_code, vec![pair])),
        }
    }

    let mut conflicts = Vec::new();
    for (version_code, hashes) in by_version {
        let distinct: HashSet<&str> = hashes.iter().map(|(_, h)| h.as_str()).collect();
        if distinct.len() > 1 {
            conflicts.push(HashConflict {
                package_name: package_name.to_string(),
                version_code,
                hashes,
            });
        }
    }
    Ok(conflicts)
}

/// Pick the version to offer for a resolved package
///
/// Candidates come from the winning repository; if it describes the app
/// without offering any build, every enabled repository's versions are
/// considered instead. When the winner's metadata names a signer, builds
/// signed by anyone else are excluded (builds without signer metadata stay
/// eligible only if no attributed build matches). The winner's
/// `suggested_version_code` is preferred; otherwise the highest version
/// wins.
pub fn suggested_apk(conn: &Connection, resolved: &ResolvedApp) -> Result<Option<Apk>> {
    let repo_id = resolved.repository.require_id()?;
    let mut candidates =
        Apk::list_by_package_and_repository(conn, &resolved.app.package_name, repo_id)?;
    if candidates.is_empty() {
        candidates = apks_for_package(conn, &resolved.app.package_name)?
            .into_iter()
            .map(|row| row.apk)
            .collect();
    }

    if let Some(signer) = &resolved.app.signer {
        let attributed: Vec<Apk> = candidates
            .iter()
            .filter(|apk| {
                apk.signer
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(signer))
            })
            .cloned()
            .collect();
        candidates = if attributed.is_empty() {
            candidates
                .into_iter()
                .filter(|apk| apk.signer.is_none())
                .collect()
        } else {
            attributed
        };
    }

    if let Some(code) = resolved.app.suggested_version_code {
        if let Some(apk) = candidates.iter().find(|apk| apk.version_code == code) {
            return Ok(Some(apk.clone()));
        }
    }

    // Candidate lists come back newest first
    Ok(candidates.into_iter().next())
}

/// Remove a repository and everything it contributed
///
/// The schema cascades the delete through mirrors, apps, and apks.
/// Winners for affected packages recompute naturally on the next query.
pub fn remove_repository(conn: &mut Connection, id: i64) -> Result<()> {
    db::transaction(conn, |tx| {
        if Repository::find_by_id(tx, id)?.is_none() {
            return Err(Error::NotFound(format!("repository {id}")));
        }
        Repository::delete(tx, id)
    })?;
    info!("removed repository {}", id);
    Ok(())
}

/// Reorder conflict resolution for one repository
///
/// Takes effect on the next query; no rows are rewritten.
pub fn set_priority(conn: &Connection, id: i64, priority: i32) -> Result<()> {
    let changed = conn.execute(
        "UPDATE repositories SET priority = ?1 WHERE id = ?2",
        params![priority, id],
    )?;
    if changed == 0 {
        return Err(Error::NotFound(format!("repository {id}")));
    }
    debug!("repository {} priority set to {}", id, priority);
    Ok(())
}

/// Search package names, display names, and summaries, resolving each
/// distinct package to its winning repository
pub fn search(conn: &Connection, pattern: &str) -> Result<Vec<ResolvedApp>> {
    let mut seen = HashSet::new();
    let mut results = Vec::new();
    for app in App::search(conn, pattern)? {
        if !seen.insert(app.package_name.clone()) {
            continue;
        }
        if let Some(resolved) = resolve_app(conn, &app.package_name)? {
            results.push(resolved);
        }
    }
    Ok(results)
}

/// Everything a single repository currently lists
pub fn apps_by_repository(conn: &Connection, repository_id: i64) -> Result<Vec<App>> {
    App::list_by_repository(conn, repository_id)
}

/// Distinct packages known across all repositories
pub fn app_count(conn: &Connection) -> Result<i64> {
    App::count_packages(conn)
}

fn app_from_entry(entry: &AppEntry, repository_id: i64) -> App {
    App {
        package_name: entry.package_name.clone(),
        repository_id,
        name: entry.name.clone(),
        summary: entry.summary.clone(),
        description: entry.description.clone(),
        web_url: entry.web_url.clone(),
        source_url: entry.source_url.clone(),
        tracker_url: entry.tracker_url.clone(),
        changelog_url: entry.changelog_url.clone(),
        suggested_version_code: entry.suggested_version_code,
        added: entry.added,
        last_updated: entry.last_updated,
        signer: entry.signer.as_ref().map(|s| s.to_lowercase()),
    }
}

fn apk_from_entry(entry: &ApkEntry, repository_id: i64) -> Result<Apk> {
    let mut apk = Apk::new(
        entry.package_name.as_str(),
        repository_id,
        entry.version_code,
        entry.apk_name.as_str(),
        entry.hash.as_str(),
        entry.hash_type.as_str(),
    );
    apk.version_name = entry.version_name.clone();
    apk.signer = entry.signer.as_ref().map(|s| s.to_lowercase());
    apk.size = entry.size;
    apk.min_sdk = entry.min_sdk;
    apk.max_sdk = entry.max_sdk;
    if !entry.nativecode.is_empty() {
        apk.nativecode = Some(encode_json_list(&entry.nativecode)?);
    }
    if !entry.features.is_empty() {
        apk.features = Some(encode_json_list(&entry.features)?);
    }
    apk.added = entry.added;
    Ok(apk)
}

fn encode_json_list(values: &[String]) -> Result<String> {
    serde_json::to_string(values)
        .map_err(|e| Error::MalformedIndex(format!("unencodable string list: {e}")))
}

/// Log versions this repository shares with others under a different hash
///
/// Cross-repository disagreement is not an ingest failure: both rows stay,
/// priority decides which one serves, and the conflict stays queryable.
fn warn_cross_repository_conflicts(conn: &Connection, repository_id: i64) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT a.package_name, a.version_code, COUNT(DISTINCT a.hash)
         FROM apks a
         WHERE EXISTS (SELECT 1 FROM apks b
                       WHERE b.package_name = a.package_name
                         AND b.version_code = a.version_code
                         AND b.repository_id = ?1)
         GROUP BY a.package_name, a.version_code
         HAVING COUNT(DISTINCT a.hash) > 1",
    )?;

    let rows = stmt.query_map([repository_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;
    for row in rows {
        let (package, version_code, hashes) = row?;
        warn!(
            "{} version {} has {} distinct hashes across repositories; priority decides which serves",
            package, version_code, hashes
        );
    }
    Ok(())
}
