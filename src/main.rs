// src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, RepoCommands};
use kiosk::config::{Config, CorePaths};
use kiosk::Result;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    let paths = match &cli.data_dir {
        Some(dir) => CorePaths::at(dir.clone()),
        None => config.paths(),
    };

    match cli.command {
        Commands::Init => commands::init(&paths),
        Commands::Repo(repo) => match repo {
            RepoCommands::Add {
                address,
                fingerprint,
                priority,
                mirrors,
                disabled,
            } => commands::repo_add(
                &paths,
                &address,
                fingerprint.as_deref(),
                priority,
                &mirrors,
                disabled,
            ),
            RepoCommands::List => commands::repo_list(&paths),
            RepoCommands::Remove { address } => commands::repo_remove(&paths, &address),
            RepoCommands::Enable { address } => commands::repo_set_enabled(&paths, &address, true),
            RepoCommands::Disable { address } => {
                commands::repo_set_enabled(&paths, &address, false)
            }
            RepoCommands::SetPriority { address, priority } => {
                commands::repo_set_priority(&paths, &address, priority)
            }
            RepoCommands::Trust {
                address,
                fingerprint,
            } => commands::repo_trust(&paths, &address, &fingerprint),
        },
        Commands::Update { address, force } => {
            commands::update(&paths, &config, address.as_deref(), force)
        }
        Commands::Search { pattern } => commands::search(&paths, &pattern),
        Commands::Show { package } => commands::show(&paths, &package),
        Commands::Versions { package } => commands::versions(&paths, &package),
        Commands::Install {
            package,
            version_code,
            interactive,
        } => commands::install(&paths, &config, &package, version_code, interactive),
        Commands::Uninstall { package } => commands::uninstall(&paths, &config, &package),
        Commands::KeyGen { name } => commands::key_gen(&paths, &name),
        Commands::SignIndex { index, key, embed } => commands::sign_index(&index, &key, embed),
    }
}
