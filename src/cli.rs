// src/cli.rs
//! CLI definitions for the kiosk catalog client
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kiosk")]
#[command(version)]
#[command(about = "Trusted multi-repository application catalog", long_about = None)]
pub struct Cli {
    /// Data directory (default: $KIOSK_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file (default: <config dir>/kiosk/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the data directory and catalog database
    Init,

    /// Manage repositories
    #[command(subcommand)]
    Repo(RepoCommands),

    /// Fetch and ingest repository indexes
    Update {
        /// Repository address (updates all enabled if not specified)
        address: Option<String>,

        /// Update even if the index was refreshed recently
        #[arg(short, long)]
        force: bool,
    },

    /// Search the merged catalog
    Search {
        /// Pattern matched against package names and summaries
        pattern: String,
    },

    /// Show merged details for a package
    Show {
        /// Package name
        package: String,
    },

    /// List every version of a package across repositories
    Versions {
        /// Package name
        package: String,
    },

    /// Download, verify, and install a package
    Install {
        /// Package name
        package: String,

        /// Version code to install (default: the suggested version)
        #[arg(short = 'c', long)]
        version_code: Option<i64>,

        /// Use the interactive install flow even if unattended is available
        #[arg(short, long)]
        interactive: bool,
    },

    /// Uninstall a package through the host installer
    Uninstall {
        /// Package name
        package: String,
    },

    /// Generate a repository signing keypair
    #[command(name = "key-gen")]
    KeyGen {
        /// Key name, used for the output file names under the keys dir
        name: String,
    },

    /// Sign an index document for publishing
    #[command(name = "sign-index")]
    SignIndex {
        /// Path to the index JSON document
        index: PathBuf,

        /// Path to the private signing key file
        key: PathBuf,

        /// Write one self-contained signed document instead of a
        /// detached .sig file
        #[arg(long)]
        embed: bool,
    },
}

#[derive(Subcommand)]
pub enum RepoCommands {
    /// Add a repository
    Add {
        /// Canonical repository address (URL of the index directory)
        address: String,

        /// Pinned signing key fingerprint; without it the key offered on
        /// first update must be trusted explicitly
        #[arg(long)]
        fingerprint: Option<String>,

        /// Merge priority; numerically lower is more authoritative.
        /// 0 appends after all existing repositories.
        #[arg(short, long, default_value = "0")]
        priority: i32,

        /// Additional mirror URL (repeatable)
        #[arg(long = "mirror")]
        mirrors: Vec<String>,

        /// Add the repository in disabled state
        #[arg(long)]
        disabled: bool,
    },

    /// List repositories, most authoritative first
    List,

    /// Remove a repository and everything it contributed to the catalog
    Remove {
        /// Repository address
        address: String,
    },

    /// Enable a repository
    Enable {
        /// Repository address
        address: String,
    },

    /// Disable a repository without deleting its data
    Disable {
        /// Repository address
        address: String,
    },

    /// Change a repository's merge priority
    #[command(name = "set-priority")]
    SetPriority {
        /// Repository address
        address: String,

        /// New priority; numerically lower is more authoritative
        priority: i32,
    },

    /// Pin a repository's signing key fingerprint
    Trust {
        /// Repository address
        address: String,

        /// Fingerprint to pin, as reported by `kiosk update`
        fingerprint: String,
    },
}
