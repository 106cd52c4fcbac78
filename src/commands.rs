// src/commands.rs
//! Command handlers for the kiosk CLI

use indicatif::{ProgressBar, ProgressStyle};
use kiosk::catalog;
use kiosk::catalog::sync::{UpdateStatus, Updater};
use kiosk::config::{Config, CorePaths};
use kiosk::db;
use kiosk::db::models::{RepoMirror, Repository};
use kiosk::index;
use kiosk::index::fetch::IndexFetcher;
use kiosk::install::events::LogNotifier;
use kiosk::install::host::{CommandHost, NullInspector};
use kiosk::install::{CancelHandle, ConsentPolicy, InstallCoordinator, InstallMode, InstallRequest};
use kiosk::trust::signing::SigningKeyPair;
use kiosk::trust::SignedIndex;
use kiosk::{trust, Error, Result};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Initialize the data directory layout and catalog database
pub fn init(paths: &CorePaths) -> Result<()> {
    paths.ensure_layout()?;
    db::init(&paths.db_path())?;
    println!("Initialized catalog at {}", paths.data_dir().display());
    Ok(())
}

/// Add a repository
pub fn repo_add(
    paths: &CorePaths,
    address: &str,
    fingerprint: Option<&str>,
    priority: i32,
    mirrors: &[String],
    disabled: bool,
) -> Result<()> {
    let conn = db::open(&paths.db_path())?;
    if Repository::find_by_address(&conn, address)?.is_some() {
        return Err(Error::Config(format!(
            "repository {address} already exists"
        )));
    }

    let mut repo = Repository::new(address);
    repo.fingerprint = fingerprint.map(trust::normalize_fingerprint).transpose()?;
    repo.priority = priority;
    repo.enabled = !disabled;
    let id = repo.insert(&conn)?;

    for url in mirrors {
        RepoMirror::new(id, url, true).insert(&conn)?;
    }

    println!("Added repository {address} (priority {})", repo.priority);
    match &repo.fingerprint {
        Some(fp) => println!("  pinned fingerprint: {fp}"),
        None => println!("  no fingerprint pinned; the first update will report the offered key"),
    }
    Ok(())
}

/// List repositories with their merge order and catalog contribution
pub fn repo_list(paths: &CorePaths) -> Result<()> {
    let conn = db::open(&paths.db_path())?;
    let repositories = Repository::list_all(&conn)?;
    if repositories.is_empty() {
        println!("No repositories configured");
        return Ok(());
    }

    for repo in repositories {
        let id = repo_id(&repo)?;
        let apps = catalog::apps_by_repository(&conn, id)?.len();
        let state = if repo.enabled { "" } else { " [disabled]" };
        println!(
            "{:>4}  {}{}",
            repo.priority,
            repo.name.as_deref().unwrap_or(&repo.address),
            state
        );
        println!("      address: {}", repo.address);
        println!(
            "      trust: {}",
            repo.fingerprint.as_deref().unwrap_or("unpinned")
        );
        println!("      apps: {apps}");
        if let Some(last_updated) = &repo.last_updated {
            println!("      last updated: {last_updated}");
        }
    }
    println!("{} distinct packages in the catalog", catalog::app_count(&conn)?);
    Ok(())
}

/// Remove a repository and everything it contributed
pub fn repo_remove(paths: &CorePaths, address: &str) -> Result<()> {
    let mut conn = db::open(&paths.db_path())?;
    let repo = require_repo(&conn, address)?;
    catalog::remove_repository(&mut conn, repo_id(&repo)?)?;
    println!("Removed repository {address}");
    Ok(())
}

/// Enable or disable a repository
pub fn repo_set_enabled(paths: &CorePaths, address: &str, enabled: bool) -> Result<()> {
    let conn = db::open(&paths.db_path())?;
    let mut repo = require_repo(&conn, address)?;
    repo.enabled = enabled;
    repo.update(&conn)?;
    println!(
        "{} repository {address}",
        if enabled { "Enabled" } else { "Disabled" }
    );
    Ok(())
}

/// Change a repository's merge priority
pub fn repo_set_priority(paths: &CorePaths, address: &str, priority: i32) -> Result<()> {
    let conn = db::open(&paths.db_path())?;
    let repo = require_repo(&conn, address)?;
    catalog::set_priority(&conn, repo_id(&repo)?, priority)?;
    println!("Set priority of {address} to {priority}");
    Ok(())
}

/// Pin a repository's signing key fingerprint
pub fn repo_trust(paths: &CorePaths, address: &str, fingerprint: &str) -> Result<()> {
    let conn = db::open(&paths.db_path())?;
    let mut repo = require_repo(&conn, address)?;
    let fingerprint = trust::normalize_fingerprint(fingerprint)?;
    repo.set_fingerprint(&conn, &fingerprint)?;
    println!("Pinned {fingerprint} for {address}");
    Ok(())
}

/// Update one repository or all enabled repositories
///
/// `force` drops the stored etag first, so the fetch cannot short-circuit
/// on a not-modified response.
pub fn update(
    paths: &CorePaths,
    config: &Config,
    address: Option<&str>,
    force: bool,
) -> Result<()> {
    let updater = Updater::with_fetcher(paths.db_path(), IndexFetcher::with_config(config)?);

    match address {
        Some(address) => {
            let conn = db::open(&paths.db_path())?;
            let mut repo = require_repo(&conn, address)?;
            if force && repo.etag.is_some() {
                repo.etag = None;
                repo.update(&conn)?;
            }
            let id = repo_id(&repo)?;
            drop(conn);
            report_update(address, &updater.update_repository(id)?);
        }
        None => {
            if force {
                let conn = db::open(&paths.db_path())?;
                for mut repo in Repository::list_enabled(&conn)? {
                    repo.etag = None;
                    repo.update(&conn)?;
                }
            }
            for outcome in updater.update_all()? {
                match &outcome.result {
                    Ok(status) => report_update(&outcome.address, status),
                    Err(e) => eprintln!("{}: {e}", outcome.address),
                }
            }
        }
    }
    Ok(())
}

fn report_update(address: &str, status: &UpdateStatus) {
    match status {
        UpdateStatus::Updated { apps, apks } => {
            println!("{address}: {apps} apps, {apks} versions");
        }
        UpdateStatus::Unchanged => println!("{address}: unchanged"),
        UpdateStatus::FirstUse { fingerprint } => {
            println!("{address}: index signed by an unpinned key");
            println!("  fingerprint: {fingerprint}");
            println!("  run 'kiosk repo trust {address} {fingerprint}' to accept it");
        }
        UpdateStatus::Superseded => {
            println!("{address}: superseded by a concurrent update");
        }
    }
}

/// Search the merged catalog
pub fn search(paths: &CorePaths, pattern: &str) -> Result<()> {
    let conn = db::open(&paths.db_path())?;
    let results = catalog::search(&conn, pattern)?;
    if results.is_empty() {
        println!("No packages match '{pattern}'");
        return Ok(());
    }

    for resolved in results {
        let app = &resolved.app;
        println!(
            "{}  {}",
            app.package_name,
            app.name.as_deref().unwrap_or("")
        );
        if let Some(summary) = &app.summary {
            println!("    {summary}");
        }
        println!("    from {}", resolved.repository.address);
    }
    Ok(())
}

/// Show merged details for one package
pub fn show(paths: &CorePaths, package: &str) -> Result<()> {
    let conn = db::open(&paths.db_path())?;
    let resolved = catalog::resolve_app(&conn, package)?
        .ok_or_else(|| Error::NotFound(format!("package {package}")))?;
    let app = &resolved.app;

    println!("Package: {}", app.package_name);
    if let Some(name) = &app.name {
        println!("Name: {name}");
    }
    if let Some(summary) = &app.summary {
        println!("Summary: {summary}");
    }
    if let Some(description) = &app.description {
        println!("Description: {description}");
    }
    if let Some(web_url) = &app.web_url {
        println!("Website: {web_url}");
    }
    if let Some(source_url) = &app.source_url {
        println!("Source: {source_url}");
    }
    println!(
        "Repository: {} (priority {})",
        resolved.repository.address, resolved.repository.priority
    );

    match catalog::suggested_apk(&conn, &resolved)? {
        Some(apk) => println!(
            "Suggested version: {} ({})",
            apk.version_name.as_deref().unwrap_or("unnamed"),
            apk.version_code
        ),
        None => println!("Suggested version: none installable"),
    }

    let conflicts = catalog::hash_conflicts(&conn, package)?;
    if !conflicts.is_empty() {
        println!("Repositories disagree on binaries for some versions:");
        for conflict in conflicts {
            println!("  version code {}:", conflict.version_code);
            for (address, hash) in &conflict.hashes {
                println!("    {address}: {hash}");
            }
        }
    }
    Ok(())
}

/// List every known version of a package, merge winner's rows first
pub fn versions(paths: &CorePaths, package: &str) -> Result<()> {
    let conn = db::open(&paths.db_path())?;
    let rows = catalog::apks_for_package(&conn, package)?;
    if rows.is_empty() {
        return Err(Error::NotFound(format!("package {package}")));
    }

    for row in rows {
        println!(
            "{:>10}  {:<16}  {}",
            row.apk.version_code,
            row.apk.version_name.as_deref().unwrap_or("-"),
            row.repository.address
        );
    }
    Ok(())
}

/// Download, verify, and install one package version
pub fn install(
    paths: &CorePaths,
    config: &Config,
    package: &str,
    version_code: Option<i64>,
    interactive: bool,
) -> Result<()> {
    let conn = db::open(&paths.db_path())?;
    let resolved = catalog::resolve_app(&conn, package)?
        .ok_or_else(|| Error::NotFound(format!("package {package}")))?;

    let apk = match version_code {
        Some(code) => catalog::apks_for_package(&conn, package)?
            .into_iter()
            .find(|row| row.apk.version_code == code)
            .map(|row| row.apk)
            .ok_or_else(|| Error::NotFound(format!("{package} version code {code}")))?,
        None => catalog::suggested_apk(&conn, &resolved)?
            .ok_or_else(|| Error::NotFound(format!("no installable version of {package}")))?,
    };

    let repo = Repository::find_by_id(&conn, apk.repository_id)?
        .ok_or_else(|| Error::NotFound(format!("repository {}", apk.repository_id)))?;
    let mirrors = RepoMirror::find_by_repository(&conn, apk.repository_id)?;
    drop(conn);

    let fetcher = IndexFetcher::with_config(config)?;
    let progress = create_progress_bar(apk.size.unwrap_or(0) as u64, &apk.apk_name);
    let fetched = fetcher.download_package(
        &apk,
        &repo,
        &mirrors,
        &paths.cache_dir(),
        Some(&progress),
    )?;

    let host = Arc::new(CommandHost::from_config(config));
    let coordinator = InstallCoordinator::new(paths.staging_dir(), host, Arc::new(NullInspector))?
        .with_notifier(Arc::new(LogNotifier))
        .with_consent(Arc::new(PromptConsent));

    let mode = if interactive || !config.install.unattended {
        InstallMode::Interactive
    } else {
        InstallMode::Unattended
    };
    let request = InstallRequest {
        download_uri: download_uri(&repo.address, &apk.apk_name),
        file: fetched.path.clone(),
        apk: apk.clone(),
        mode,
    };
    coordinator.install(&request, &CancelHandle::new())?;

    if !config.install.keep_cache {
        if let Err(e) = std::fs::remove_file(&fetched.path) {
            warn!("failed to remove cached {}: {e}", fetched.path.display());
        }
    }
    println!("Installed {} {}", package, apk.version_code);
    Ok(())
}

/// Uninstall a package through the host installer
pub fn uninstall(paths: &CorePaths, config: &Config, package: &str) -> Result<()> {
    let host = Arc::new(CommandHost::from_config(config));
    let coordinator = InstallCoordinator::new(paths.staging_dir(), host, Arc::new(NullInspector))?
        .with_notifier(Arc::new(LogNotifier));
    coordinator.uninstall(package)?;
    println!("Uninstalled {package}");
    Ok(())
}

/// Generate a repository signing keypair under the keys directory
pub fn key_gen(paths: &CorePaths, name: &str) -> Result<()> {
    paths.ensure_layout()?;
    let pair = SigningKeyPair::generate().with_key_id(name);
    let private_path = paths.keys_dir().join(format!("{name}.key"));
    let public_path = paths.keys_dir().join(format!("{name}.pub"));
    pair.save_to_files(&private_path, &public_path)?;

    println!("Generated signing key '{name}'");
    println!("  fingerprint: {}", pair.fingerprint());
    println!("  private key: {}", private_path.display());
    println!("  public key:  {}", public_path.display());
    Ok(())
}

/// Sign an index document for publishing
pub fn sign_index(index_path: &Path, key_path: &Path, embed: bool) -> Result<()> {
    let index = std::fs::read(index_path)?;
    // refuse to sign a document clients would reject
    index::parse_index(&index)?;

    let pair = SigningKeyPair::load_from_file(key_path)?;
    let envelope = pair.sign_index(&index);

    let output = if embed {
        let signed = SignedIndex::new(envelope, &index);
        let out = sibling_path(index_path, "signed.json");
        std::fs::write(&out, encode_json(&signed)?)?;
        out
    } else {
        let out = sibling_path(index_path, "sig");
        std::fs::write(&out, encode_json(&envelope)?)?;
        out
    };

    println!("Signed {} with key {}", index_path.display(), pair.fingerprint());
    println!("  wrote {}", output.display());
    Ok(())
}

/// Asks on stdin before granting newly requested permissions
struct PromptConsent;

impl ConsentPolicy for PromptConsent {
    fn approve(&self, package: &str, new_permissions: &[String]) -> bool {
        println!("{package} requests permissions the installed version does not hold:");
        for permission in new_permissions {
            println!("  {permission}");
        }
        print!("Allow? [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

/// Create a styled progress bar for package downloads
fn create_progress_bar(size: u64, name: &str) -> ProgressBar {
    let pb = ProgressBar::new(size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    pb.set_message(name.to_string());
    pb
}

fn require_repo(conn: &rusqlite::Connection, address: &str) -> Result<Repository> {
    Repository::find_by_address(conn, address)?
        .ok_or_else(|| Error::NotFound(format!("repository {address}")))
}

fn repo_id(repo: &Repository) -> Result<i64> {
    repo.id
        .ok_or_else(|| Error::NotFound(format!("repository {} has no id", repo.address)))
}

fn download_uri(address: &str, apk_name: &str) -> String {
    format!("{}/{}", address.trim_end_matches('/'), apk_name)
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value)
        .map_err(|e| Error::Config(format!("failed to encode signature output: {e}")))
}

/// `index.json` -> `index.json.<suffix>` in the same directory
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index.json".to_string());
    name.push('.');
    name.push_str(suffix);
    path.with_file_name(name)
}
