// src/catalog/sync.rs

//! Repository synchronization
//!
//! Drives the fetch, verify, parse, ingest pipeline for one or all
//! repositories. Every update claims a per-repository generation before
//! fetching; by the time it reaches the ingest lock, a claim that is no
//! longer the newest steps aside, so a slow fetch can never overwrite the
//! result of a later one. Fan-out across repositories runs on rayon with
//! one database connection per worker.

use crate::catalog;
use crate::db;
use crate::db::models::{RepoMirror, Repository};
use crate::error::{Error, Result};
use crate::index;
use crate::index::fetch::IndexFetcher;
use crate::trust::{self, IndexTrust};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Outcome of updating a single repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// A new index was verified and ingested
    Updated { apps: usize, apks: usize },
    /// The repository reported the stored index is still current
    Unchanged,
    /// The index verified under a key this repository has not pinned yet;
    /// nothing was ingested. The caller decides whether to trust the key.
    FirstUse { fingerprint: String },
    /// A newer update claimed this repository while we were fetching
    Superseded,
}

/// One repository's result from [`Updater::update_all`]
#[derive(Debug)]
pub struct UpdateOutcome {
    pub repository_id: i64,
    pub address: String,
    pub result: Result<UpdateStatus>,
}

/// Serializes ingests per repository and detects superseded fetches
#[derive(Default)]
struct RepoGate {
    generation: AtomicU64,
    ingest: Mutex<()>,
}

/// Fetches, verifies, and ingests repository indexes
///
/// Holds no open database connection; every update opens its own, so the
/// updater can be shared across threads.
pub struct Updater {
    db_path: PathBuf,
    fetcher: IndexFetcher,
    gates: Mutex<HashMap<i64, Arc<RepoGate>>>,
}

impl Updater {
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            db_path: db_path.into(),
            fetcher: IndexFetcher::new()?,
            gates: Mutex::new(HashMap::new()),
        })
    }

    /// Build with a preconfigured fetcher (timeouts, proxy, retries)
    pub fn with_fetcher(db_path: impl Into<PathBuf>, fetcher: IndexFetcher) -> Self {
        Self {
            db_path: db_path.into(),
            fetcher,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Run the full update pipeline for one repository
    ///
    /// The fetch happens without any lock held. Mirror health counters are
    /// recorded from the fetch outcome before verification, since they
    /// describe transport, not trust. An index signed by an unpinned key
    /// is reported as [`UpdateStatus::FirstUse`] and not ingested;
    /// pinning is an explicit caller decision.
    pub fn update_repository(&self, repository_id: i64) -> Result<UpdateStatus> {
        let gate = self.gate(repository_id);
        let generation = gate.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let conn = db::open(&self.db_path)?;
        let mut repo = Repository::find_by_id(&conn, repository_id)?
            .ok_or_else(|| Error::NotFound(format!("repository {repository_id}")))?;
        let mirrors = RepoMirror::find_by_repository(&conn, repository_id)?;
        drop(conn);

        let fetched = match self.fetcher.fetch_index(&repo, &mirrors) {
            Ok(fetched) => fetched,
            Err(Error::NotModified) => {
                let conn = db::open(&self.db_path)?;
                repo.last_updated = Some(current_timestamp());
                repo.update(&conn)?;
                debug!("{} is unchanged", repo.address);
                return Ok(UpdateStatus::Unchanged);
            }
            Err(e) => return Err(e),
        };

        let mut conn = db::open(&self.db_path)?;
        // Counter updates are no-ops for the canonical address, which has
        // no mirror row
        for url in &fetched.failed_mirrors {
            RepoMirror::record_error(&conn, repository_id, url)?;
        }
        RepoMirror::record_success(&conn, repository_id, &fetched.mirror)?;

        let trust = trust::verify_index(
            &fetched.index,
            &fetched.envelope,
            repo.fingerprint.as_deref(),
        )?;
        if let IndexTrust::UnpinnedFirstUse { fingerprint } = trust {
            info!(
                "{} is signed by unpinned key {}; awaiting explicit trust",
                repo.address, fingerprint
            );
            return Ok(UpdateStatus::FirstUse { fingerprint });
        }

        let snapshot = index::parse_index(&fetched.index)?;

        let _ingest_guard = gate.ingest.lock().unwrap_or_else(|e| e.into_inner());
        if gate.generation.load(Ordering::SeqCst) != generation {
            debug!("update of {} superseded by a newer fetch", repo.address);
            return Ok(UpdateStatus::Superseded);
        }

        repo.etag = fetched.etag;
        repo.last_updated = Some(current_timestamp());
        let stats = catalog::ingest(&mut conn, &mut repo, &snapshot)?;

        Ok(UpdateStatus::Updated {
            apps: stats.apps,
            apks: stats.apks,
        })
    }

    /// Update every enabled repository in parallel
    ///
    /// Individual failures never abort the fan-out; each repository's
    /// outcome is returned for the caller to report.
    pub fn update_all(&self) -> Result<Vec<UpdateOutcome>> {
        let conn = db::open(&self.db_path)?;
        let repositories = Repository::list_enabled(&conn)?;
        drop(conn);

        let outcomes: Vec<UpdateOutcome> = repositories
            .par_iter()
            .map(|repo| match repo.require_id() {
                Ok(id) => UpdateOutcome {
                    repository_id: id,
                    address: repo.address.clone(),
                    result: self.update_repository(id),
                },
                Err(e) => UpdateOutcome {
                    repository_id: 0,
                    address: repo.address.clone(),
                    result: Err(e),
                },
            })
            .collect();

        let failures = outcomes.iter().filter(|o| o.result.is_err()).count();
        if failures > 0 {
            warn!(
                "updated {} repositories, {} failed",
                outcomes.len() - failures,
                failures
            );
        } else {
            info!("updated {} repositories", outcomes.len());
        }
        Ok(outcomes)
    }

    fn gate(&self, repository_id: i64) -> Arc<RepoGate> {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        gates.entry(repository_id).or_default().clone()
    }
}

/// Current time as an ISO 8601 string for TEXT timestamp columns
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Parse an ISO 8601 timestamp to Unix seconds
pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
    let dt = chrono::DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| Error::Config(format!("invalid timestamp: {e}")))?;
    Ok(dt.timestamp() as u64)
}

/// Check whether a repository's stored index is older than `max_age_secs`
///
/// A repository that was never updated, or whose timestamp cannot be
/// parsed, always needs an update.
pub fn needs_update(repo: &Repository, max_age_secs: u64) -> bool {
    match &repo.last_updated {
        None => true,
        Some(last_updated) => match parse_timestamp(last_updated) {
            Ok(updated_at) => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs();
                now.saturating_sub(updated_at) > max_age_secs
            }
            Err(_) => true,
        },
    }
}
