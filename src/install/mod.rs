// src/install/mod.rs

//! Install and uninstall session coordination
//!
//! A session moves a verified binary from the download cache through a
//! private staging area into the hands of the host installer:
//!
//! 1. verify: hash against the catalog row, binary signer against index
//!    metadata
//! 2. stage: copy under a unique name into the staging area and sync
//! 3. install: unattended when the host and trust state allow it,
//!    interactive otherwise
//!
//! One session per package at a time; a second request for a package
//! already in flight is rejected without emitting events. An unattended
//! handoff falls back to the interactive flow when the host refuses, when
//! the signer lineage changed, or when the binary requests permissions the
//! installed version does not hold. A privileged component updating itself
//! gets no fallback: the update installs under the pinned authority signer
//! or not at all.

pub mod events;
pub mod host;

use crate::db::models::Apk;
use crate::error::{Error, Result, TrustError};
use crate::trust;
use fs2::FileExt;
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use self::events::{EventKind, LifecycleEvent, Notifier, SilentNotifier};
use self::host::{HostInstaller, PackageInspector};

/// Attempts to take the staging directory lock before giving up
const STAGING_LOCK_RETRIES: u32 = 5;

/// Delay between staging lock attempts in milliseconds
const STAGING_LOCK_DELAY_MS: u64 = 200;

/// Why a session stopped before completing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    /// Binary content does not match the catalog hash
    HashMismatch,
    /// Binary signer does not match the index metadata
    SignatureMismatch,
    /// Offered signer breaks the installed version's lineage
    SignerChanged,
    /// Privileged component update signed by the wrong authority
    SignatureAuthorityMismatch,
    /// User declined newly requested permissions
    ConsentDeclined,
    Cancelled,
    /// Host installer reported an error
    HostFailure,
}

impl InterruptReason {
    /// Map a session error onto the reason reported in events
    pub fn classify(error: &Error) -> Self {
        match error {
            Error::Trust(TrustError::HashMismatch { .. }) => InterruptReason::HashMismatch,
            Error::Trust(TrustError::SignatureMismatch { .. }) => {
                InterruptReason::SignatureMismatch
            }
            Error::Trust(TrustError::SignerChanged { .. }) => InterruptReason::SignerChanged,
            Error::Trust(TrustError::SignatureAuthorityMismatch { .. }) => {
                InterruptReason::SignatureAuthorityMismatch
            }
            Error::Cancelled(_) => InterruptReason::Cancelled,
            _ => InterruptReason::HostFailure,
        }
    }
}

impl std::fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InterruptReason::HashMismatch => "hash mismatch",
            InterruptReason::SignatureMismatch => "signature mismatch",
            InterruptReason::SignerChanged => "signer changed",
            InterruptReason::SignatureAuthorityMismatch => "signature authority mismatch",
            InterruptReason::ConsentDeclined => "consent declined",
            InterruptReason::Cancelled => "cancelled",
            InterruptReason::HostFailure => "host failure",
        };
        write!(f, "{s}")
    }
}

/// Whether a session may skip user interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    Unattended,
    Interactive,
}

/// A fully resolved install request
///
/// The binary must already be on local disk; downloading is the fetch
/// layer's job.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Stable identity of the request, the URI the binary came from
    pub download_uri: String,
    /// Local copy of the binary, usually in the download cache
    pub file: PathBuf,
    /// Catalog row this binary claims to be
    pub apk: Apk,
    pub mode: InstallMode,
}

/// Cooperative cancellation flag for a running session
///
/// Cancellation is honored at step boundaries; a handoff already made to
/// the host installer is not recalled.
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, step: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled(format!("install cancelled before {step}")));
        }
        Ok(())
    }
}

/// Decides whether newly requested permissions are acceptable
pub trait ConsentPolicy: Send + Sync {
    fn approve(&self, package: &str, new_permissions: &[String]) -> bool;
}

/// Approves every permission request
pub struct AcceptAll;

impl ConsentPolicy for AcceptAll {
    fn approve(&self, _package: &str, _new_permissions: &[String]) -> bool {
        true
    }
}

/// Declines every permission request
pub struct DenyAll;

impl ConsentPolicy for DenyAll {
    fn approve(&self, _package: &str, _new_permissions: &[String]) -> bool {
        false
    }
}

/// Session failure paired with the reason reported in events
struct InstallFailure {
    reason: InterruptReason,
    error: Error,
}

impl InstallFailure {
    fn declined(package: &str) -> Self {
        Self {
            reason: InterruptReason::ConsentDeclined,
            error: Error::Cancelled(format!("new permissions for {package} declined")),
        }
    }
}

impl From<Error> for InstallFailure {
    fn from(error: Error) -> Self {
        Self {
            reason: InterruptReason::classify(&error),
            error,
        }
    }
}

/// Staged copy of a binary, removed when the session ends
struct StagedFile {
    path: PathBuf,
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!("failed to remove staged file {}: {e}", self.path.display());
            }
        }
    }
}

/// Marks a package in flight; the slot frees when the guard drops
struct InFlightGuard<'a> {
    coordinator: &'a InstallCoordinator,
    package: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .coordinator
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.package);
    }
}

/// Runs install and uninstall sessions against one host installer
///
/// Holds an exclusive lock on the staging directory for its lifetime, so
/// two coordinators never share a staging area.
pub struct InstallCoordinator {
    staging_dir: PathBuf,
    host: Arc<dyn HostInstaller>,
    inspector: Arc<dyn PackageInspector>,
    notifier: Arc<dyn Notifier>,
    consent: Arc<dyn ConsentPolicy>,
    in_flight: Mutex<HashSet<String>>,
    _staging_lock: File,
}

impl std::fmt::Debug for InstallCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallCoordinator")
            .field("staging_dir", &self.staging_dir)
            .finish_non_exhaustive()
    }
}

impl InstallCoordinator {
    /// Create a coordinator over the given staging directory
    ///
    /// Fails if another process holds the staging lock after a few retries.
    pub fn new(
        staging_dir: impl Into<PathBuf>,
        host: Arc<dyn HostInstaller>,
        inspector: Arc<dyn PackageInspector>,
    ) -> Result<Self> {
        let staging_dir = staging_dir.into();
        fs::create_dir_all(&staging_dir)?;

        let lock = File::create(staging_dir.join(".lock"))?;
        let mut attempt = 0;
        loop {
            match lock.try_lock_exclusive() {
                Ok(()) => break,
                Err(_) if attempt < STAGING_LOCK_RETRIES => {
                    attempt += 1;
                    thread::sleep(Duration::from_millis(STAGING_LOCK_DELAY_MS));
                }
                Err(_) => {
                    return Err(Error::Config(format!(
                        "staging directory {} is locked by another process",
                        staging_dir.display()
                    )));
                }
            }
        }

        Ok(Self {
            staging_dir,
            host,
            inspector,
            notifier: Arc::new(SilentNotifier),
            consent: Arc::new(AcceptAll),
            in_flight: Mutex::new(HashSet::new()),
            _staging_lock: lock,
        })
    }

    /// Replace the event sink
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replace the permission consent policy
    pub fn with_consent(mut self, consent: Arc<dyn ConsentPolicy>) -> Self {
        self.consent = consent;
        self
    }

    /// Run an install session to completion
    pub fn install(&self, request: &InstallRequest, cancel: &CancelHandle) -> Result<()> {
        let package = request.apk.package_name.clone();
        let _guard = self.claim(&package)?;

        info!(
            "installing {} {} from {}",
            package, request.apk.version_code, request.download_uri
        );
        self.emit(request, EventKind::InstallStarted, None);

        match self.run_install(request, cancel) {
            Ok(()) => {
                self.emit(request, EventKind::InstallComplete, None);
                Ok(())
            }
            Err(failure) => {
                warn!("install of {} interrupted: {}", package, failure.error);
                self.emit(
                    request,
                    EventKind::InstallInterrupted {
                        reason: failure.reason,
                    },
                    Some(failure.error.to_string()),
                );
                Err(failure.error)
            }
        }
    }

    /// Run an uninstall session
    pub fn uninstall(&self, package: &str) -> Result<()> {
        let _guard = self.claim(package)?;

        info!("uninstalling {package}");
        self.notify_uninstall(package, EventKind::UninstallStarted, None);

        match self.host.uninstall(package) {
            Ok(()) => {
                self.notify_uninstall(package, EventKind::UninstallComplete, None);
                Ok(())
            }
            Err(e) => {
                warn!("uninstall of {package} interrupted: {e}");
                self.notify_uninstall(
                    package,
                    EventKind::UninstallInterrupted {
                        reason: InterruptReason::HostFailure,
                    },
                    Some(e.to_string()),
                );
                Err(e)
            }
        }
    }

    /// Run an install session on a worker thread
    ///
    /// Returns the cancellation handle and the session's join handle.
    pub fn spawn(
        self: &Arc<Self>,
        request: InstallRequest,
    ) -> (CancelHandle, thread::JoinHandle<Result<()>>) {
        let cancel = CancelHandle::new();
        let coordinator = Arc::clone(self);
        let handle = {
            let cancel = cancel.clone();
            thread::spawn(move || coordinator.install(&request, &cancel))
        };
        (cancel, handle)
    }

    fn run_install(
        &self,
        request: &InstallRequest,
        cancel: &CancelHandle,
    ) -> std::result::Result<(), InstallFailure> {
        let apk = &request.apk;
        let package = &apk.package_name;

        cancel.check("verification")?;
        trust::verify_apk_file(&request.file, apk)?;

        // The signer baked into the binary must agree with what the index
        // advertised for this version.
        let binary_signer = self.inspector.signer_digest(&request.file)?;
        if let (Some(actual), Some(expected)) = (binary_signer.as_deref(), apk.signer.as_deref()) {
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(Error::Trust(TrustError::SignatureMismatch {
                    package: package.clone(),
                    expected: expected.to_ascii_lowercase(),
                    actual: actual.to_ascii_lowercase(),
                })
                .into());
            }
        }

        // A privileged component replacing itself accepts only its pinned
        // authority signer. An unreadable signer counts as a mismatch.
        if self.host.privileged_extension_package().as_deref() == Some(package.as_str()) {
            let authority = self.host.privileged_extension_signer();
            let authorized = match (authority.as_deref(), binary_signer.as_deref()) {
                (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
                _ => false,
            };
            if !authorized {
                return Err(Error::Trust(TrustError::SignatureAuthorityMismatch {
                    expected: authority
                        .as_deref()
                        .map(|s| s.to_ascii_lowercase())
                        .unwrap_or_else(|| "unknown".to_string()),
                    actual: binary_signer
                        .as_deref()
                        .map(|s| s.to_ascii_lowercase())
                        .unwrap_or_else(|| "unknown".to_string()),
                })
                .into());
            }
        }

        // A broken signer lineage does not stop the session, it only rules
        // out the unattended path; the interactive flow shows the user what
        // the host knows before replacing anything.
        let offered = binary_signer.as_deref().or(apk.signer.as_deref());
        let installed = self.host.installed_signer(package);
        let mut continuity_ok = true;
        if let Err(e) = trust::check_signer_continuity(package, installed.as_deref(), offered) {
            warn!("{e}; unattended install disqualified");
            continuity_ok = false;
        }

        cancel.check("staging")?;
        let base = apk
            .apk_name
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("package.apk");
        let staged = StagedFile {
            path: self
                .staging_dir
                .join(format!("{}-{}", Uuid::new_v4(), base)),
        };
        fs::copy(&request.file, &staged.path).map_err(Error::from)?;
        File::open(&staged.path)
            .and_then(|f| f.sync_all())
            .map_err(Error::from)?;
        self.emit(request, EventKind::InstallStaged, None);

        let new_permissions: Vec<String> = if self.host.requires_permission_consent() {
            let held = self.host.installed_permissions(package).unwrap_or_default();
            self.inspector
                .declared_permissions(&staged.path)?
                .into_iter()
                .filter(|p| !held.contains(p))
                .collect()
        } else {
            Vec::new()
        };

        let mut use_unattended = request.mode == InstallMode::Unattended
            && self.host.kind().supports_unattended()
            && continuity_ok
            && new_permissions.is_empty();

        if use_unattended {
            // The installed signer may have changed while we staged; check
            // once more right before the silent handoff.
            let current = self.host.installed_signer(package);
            if let Err(e) = trust::check_signer_continuity(package, current.as_deref(), offered) {
                warn!("{e}; falling back to interactive install");
                use_unattended = false;
            }
        }

        if use_unattended {
            cancel.check("host handoff")?;
            self.emit(request, EventKind::Installing, None);
            match self.host.install_unattended(&staged.path, package) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("unattended install of {package} failed: {e}; retrying interactively");
                }
            }
        }

        cancel.check("user interaction")?;
        if !new_permissions.is_empty() {
            self.emit(
                request,
                EventKind::InstallUserInteraction {
                    new_permissions: new_permissions.clone(),
                },
                None,
            );
            if !self.consent.approve(package, &new_permissions) {
                return Err(InstallFailure::declined(package));
            }
        }
        if !use_unattended {
            self.emit(request, EventKind::Installing, None);
        }
        self.host.install_interactive(&staged.path, package)?;
        Ok(())
    }

    fn claim(&self, package: &str) -> Result<InFlightGuard<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(package.to_string()) {
            return Err(Error::AlreadyInProgress(package.to_string()));
        }
        Ok(InFlightGuard {
            coordinator: self,
            package: package.to_string(),
        })
    }

    fn emit(&self, request: &InstallRequest, kind: EventKind, error: Option<String>) {
        self.notifier.notify(&LifecycleEvent {
            request_id: request.download_uri.clone(),
            package_name: request.apk.package_name.clone(),
            kind,
            apk: Some(request.apk.clone()),
            error,
        });
    }

    fn notify_uninstall(&self, package: &str, kind: EventKind, error: Option<String>) {
        self.notifier.notify(&LifecycleEvent {
            request_id: package.to_string(),
            package_name: package.to_string(),
            kind,
            apk: None,
            error,
        });
    }
}
