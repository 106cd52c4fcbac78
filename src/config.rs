// src/config.rs
//! Configuration file parsing and path layout
//!
//! Supports TOML configuration files with the following sections:
//! - [paths] - Data directory override
//! - [network] - Timeouts, retry counts, proxy
//! - [install] - Session mode defaults, cache retention
//!
//! All state lives under a single data directory, laid out as:
//!
//! ```text
//! <data_dir>/
//!   catalog.db      merged catalog database
//!   cache/          downloaded package binaries
//!   staging/        in-flight install sessions
//!   keys/           locally generated signing keys
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "KIOSK_DATA_DIR";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Path settings
    #[serde(default)]
    pub paths: PathsSection,

    /// Network settings
    #[serde(default)]
    pub network: NetworkSection,

    /// Install settings
    #[serde(default)]
    pub install: InstallSection,
}

/// Path configuration section
#[derive(Debug, Default, Deserialize)]
pub struct PathsSection {
    /// Data directory holding the database, cache, and staging area
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Network configuration section
#[derive(Debug, Deserialize)]
pub struct NetworkSection {
    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Download retries per mirror
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Optional HTTP(S) proxy URL
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            proxy: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

/// Install configuration section
#[derive(Debug, Deserialize)]
pub struct InstallSection {
    /// Prefer unattended sessions when the host backend supports them
    #[serde(default = "default_true")]
    pub unattended: bool,

    /// Keep verified downloads in the cache after a completed install
    #[serde(default)]
    pub keep_cache: bool,

    /// Host install command; `{file}` and `{package}` are substituted
    #[serde(default)]
    pub install_command: Vec<String>,

    /// Host uninstall command; `{package}` is substituted
    #[serde(default)]
    pub uninstall_command: Vec<String>,
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            unattended: true,
            keep_cache: false,
            install_command: Vec::new(),
            uninstall_command: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults if absent
    pub fn load_default() -> Result<Self> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.timeout_secs == 0 {
            return Err(Error::Config("network.timeout_secs must be non-zero".into()));
        }
        if let Some(proxy) = &self.network.proxy {
            url::Url::parse(proxy)
                .map_err(|e| Error::Config(format!("invalid network.proxy: {}", e)))?;
        }
        Ok(())
    }

    /// HTTP timeout as a [`Duration`]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout_secs)
    }

    /// Resolve the path layout this configuration describes
    pub fn paths(&self) -> CorePaths {
        match &self.paths.data_dir {
            Some(dir) => CorePaths::at(dir.clone()),
            None => CorePaths::resolve(),
        }
    }
}

/// Default config file location
pub fn default_config_path() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir).join("config.toml");
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kiosk")
        .join("config.toml")
}

/// Resolved filesystem layout for all local state
#[derive(Debug, Clone)]
pub struct CorePaths {
    data_dir: PathBuf,
}

impl CorePaths {
    /// Use an explicit data directory
    pub fn at(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Resolve the data directory from the environment
    ///
    /// `KIOSK_DATA_DIR` wins if set; otherwise the platform data directory
    /// (e.g. `~/.local/share/kiosk`).
    pub fn resolve() -> Self {
        let data_dir = std::env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_local_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("kiosk")
            });
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path to the catalog database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("catalog.db")
    }

    /// Directory for downloaded package binaries
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Directory for in-flight install sessions
    pub fn staging_dir(&self) -> PathBuf {
        self.data_dir.join("staging")
    }

    /// Directory for locally generated signing keys
    pub fn keys_dir(&self) -> PathBuf {
        self.data_dir.join("keys")
    }

    /// Create the directory layout if missing
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [
            self.data_dir.clone(),
            self.cache_dir(),
            self.staging_dir(),
            self.keys_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}
