// src/install/host.rs

//! Host installer capability
//!
//! The coordinator never talks to a platform package manager directly; it
//! drives these traits. [`CommandHost`] adapts any external installer
//! command line, which is enough for the common cases; richer hosts (a
//! privileged system component, a test double) implement the traits
//! themselves.

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// What kind of install flow the host provides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallerKind {
    /// Can only hand packages to an interactive confirmation flow
    Interactive,
    /// May install without user interaction
    Unattended,
    /// Privileged system component installing on the caller's behalf
    PrivilegedExtension,
}

impl InstallerKind {
    /// Whether the unattended install path exists at all for this host
    pub fn supports_unattended(self) -> bool {
        matches!(
            self,
            InstallerKind::Unattended | InstallerKind::PrivilegedExtension
        )
    }
}

/// Host package manager operations consumed by the install coordinator
pub trait HostInstaller: Send + Sync {
    fn kind(&self) -> InstallerKind;

    /// Install without user interaction
    ///
    /// Only called for requests the coordinator judged unattended-eligible.
    fn install_unattended(&self, path: &Path, package: &str) -> Result<()>;

    /// Hand the package to the host's interactive install flow
    fn install_interactive(&self, path: &Path, package: &str) -> Result<()>;

    fn uninstall(&self, package: &str) -> Result<()>;

    /// Certificate digest of the currently installed version, if any
    fn installed_signer(&self, package: &str) -> Option<String>;

    /// Permissions the installed version already holds, when the host can
    /// enumerate them
    fn installed_permissions(&self, package: &str) -> Option<Vec<String>>;

    /// Whether newly requested permissions must be surfaced for consent
    /// before an interactive install
    fn requires_permission_consent(&self) -> bool {
        false
    }

    /// Package name of the privileged component itself, when this host is
    /// backed by one
    fn privileged_extension_package(&self) -> Option<String> {
        None
    }

    /// Signer every self-update of the privileged component must carry
    fn privileged_extension_signer(&self) -> Option<String> {
        None
    }
}

/// Reads metadata out of a package binary before it reaches the host
pub trait PackageInspector: Send + Sync {
    /// Certificate digest embedded in the binary, when extractable
    fn signer_digest(&self, path: &Path) -> Result<Option<String>>;

    /// Permissions the binary declares
    fn declared_permissions(&self, path: &Path) -> Result<Vec<String>>;
}

/// Inspector for hosts that cannot open the package format
///
/// Reports nothing, which disables signer cross-checks and permission
/// diffing while keeping hash verification fully effective.
pub struct NullInspector;

impl PackageInspector for NullInspector {
    fn signer_digest(&self, _path: &Path) -> Result<Option<String>> {
        Ok(None)
    }

    fn declared_permissions(&self, _path: &Path) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Host installer backed by configurable external commands
///
/// Occurrences of `{file}` and `{package}` in the configured argument
/// vectors are substituted before the command runs.
pub struct CommandHost {
    kind: InstallerKind,
    install_command: Vec<String>,
    uninstall_command: Vec<String>,
}

impl CommandHost {
    pub fn new(
        kind: InstallerKind,
        install_command: Vec<String>,
        uninstall_command: Vec<String>,
    ) -> Self {
        Self {
            kind,
            install_command,
            uninstall_command,
        }
    }

    /// Build from the `[install]` configuration section
    pub fn from_config(config: &Config) -> Self {
        let kind = if config.install.unattended {
            InstallerKind::Unattended
        } else {
            InstallerKind::Interactive
        };
        Self::new(
            kind,
            config.install.install_command.clone(),
            config.install.uninstall_command.clone(),
        )
    }

    fn run(&self, template: &[String], file: Option<&Path>, package: &str) -> Result<()> {
        if template.is_empty() {
            return Err(Error::HostInstall(
                "no host command configured".to_string(),
            ));
        }

        let rendered: Vec<String> = template
            .iter()
            .map(|arg| {
                let arg = arg.replace("{package}", package);
                match file {
                    Some(path) => arg.replace("{file}", &path.to_string_lossy()),
                    None => arg,
                }
            })
            .collect();

        debug!("running host command: {}", rendered.join(" "));
        let output = Command::new(&rendered[0])
            .args(&rendered[1..])
            .output()
            .map_err(|e| Error::HostInstall(format!("failed to run {}: {e}", rendered[0])))?;

        if !output.status.success() {
            return Err(Error::HostInstall(format!(
                "{} exited with {}: {}",
                rendered[0],
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl HostInstaller for CommandHost {
    fn kind(&self) -> InstallerKind {
        self.kind
    }

    fn install_unattended(&self, path: &Path, package: &str) -> Result<()> {
        self.run(&self.install_command, Some(path), package)
    }

    fn install_interactive(&self, path: &Path, package: &str) -> Result<()> {
        self.run(&self.install_command, Some(path), package)
    }

    fn uninstall(&self, package: &str) -> Result<()> {
        self.run(&self.uninstall_command, None, package)
    }

    fn installed_signer(&self, _package: &str) -> Option<String> {
        None
    }

    fn installed_permissions(&self, _package: &str) -> Option<Vec<String>> {
        None
    }
}
