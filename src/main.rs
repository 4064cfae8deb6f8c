// SPDX-License-Identifier: AGPL-3.0-or-later
//! Roster: user-account lifecycle administration for managed hosts

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use roster::{
    account::{import_users, HostDirectory, Lifecycle, OperationResult, Outcome, UpdateRequest},
    Config,
};

/// Roster: host account administration
///
/// Creates, updates, and deletes operating-system user accounts on the
/// local host, with bulk provisioning from CSV and role-based privilege
/// elevation via a configurable group.
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "roster.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Dry run mode (no host mutations)
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a user account
    Create {
        /// Username for the new account
        #[arg(short, long)]
        username: String,

        /// Role: admin, user, or standard
        #[arg(short, long)]
        role: String,

        /// Plaintext password (encoded before it reaches the account store)
        #[arg(short, long)]
        password: String,
    },

    /// Delete a user account
    Delete {
        /// Username of the account to delete
        #[arg(short, long)]
        username: String,
    },

    /// Update a user account
    Update {
        /// Current username
        #[arg(short, long)]
        username: String,

        /// New username (applied after all other changes)
        #[arg(short = 'n', long)]
        new_username: Option<String>,

        /// New password
        #[arg(short, long)]
        password: Option<String>,

        /// New role: admin, user, or standard
        #[arg(short, long)]
        role: Option<String>,
    },

    /// Create users in bulk from a CSV file
    Import {
        /// CSV file with header columns: username, role, password
        #[arg(short, long)]
        file: PathBuf,

        /// Emit the batch report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config,

    /// Initialize a new roster configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.debug)
        .init();

    match cli.command {
        Commands::Version => {
            println!("Roster v{}", env!("CARGO_PKG_VERSION"));
            println!("Host account lifecycle administration");
            Ok(())
        }

        Commands::Init { force } => init_config(&cli.config, force),

        Commands::Config => show_config(&cli.config),

        Commands::Create {
            username,
            role,
            password,
        } => {
            let mut lifecycle = build_lifecycle(&cli.config, cli.dry_run)?;
            let result = lifecycle.create_user(&username, &role, &password);
            finish(&result)
        }

        Commands::Delete { username } => {
            let mut lifecycle = build_lifecycle(&cli.config, cli.dry_run)?;
            let result = lifecycle.delete_user(&username);
            finish(&result)
        }

        Commands::Update {
            username,
            new_username,
            password,
            role,
        } => {
            let request = UpdateRequest {
                new_username,
                password,
                role,
            };
            let mut lifecycle = build_lifecycle(&cli.config, cli.dry_run)?;
            let result = lifecycle.update_user(&username, &request);
            finish(&result)
        }

        Commands::Import { file, json } => {
            let mut lifecycle = build_lifecycle(&cli.config, cli.dry_run)?;
            let report = import_users(&mut lifecycle, &file)
                .with_context(|| format!("Failed to import from {}", file.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Batch import completed");
                println!();
                println!("Results:");
                println!("  Records processed: {}", report.total());
                println!("  Succeeded: {}", report.succeeded);
                println!("  Skipped: {}", report.skipped);
                println!("  Partially succeeded: {}", report.partial);
                println!("  Failed: {}", report.failed);

                for result in report.results.iter().filter(|r| !r.outcome.is_success()) {
                    println!();
                    println!("  [{}] {}", result.outcome, result.message);
                }
            }

            if report.has_failures() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Load the configuration, falling back to defaults when no file exists
fn load_config(config_path: &PathBuf) -> anyhow::Result<Config> {
    if config_path.exists() {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))
    } else {
        Ok(Config::default())
    }
}

/// Build the lifecycle orchestrator over the host account store
fn build_lifecycle(
    config_path: &PathBuf,
    dry_run: bool,
) -> anyhow::Result<Lifecycle<HostDirectory>> {
    let config = load_config(config_path)?;
    let directory = HostDirectory::from_config(&config.directory, dry_run);
    Ok(Lifecycle::new(directory, config.privilege_group)
        .with_purge_home(config.directory.purge_home_on_delete))
}

/// Print an operation result and derive the process exit status from it
fn finish(result: &OperationResult) -> anyhow::Result<()> {
    println!("{}: {}", result.outcome, result.message);
    match &result.outcome {
        Outcome::Succeeded | Outcome::Skipped { .. } => Ok(()),
        Outcome::PartiallySucceeded { .. } | Outcome::Failed { .. } => std::process::exit(1),
    }
}

/// Initialize a new configuration file
fn init_config(config_path: &PathBuf, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let default_config = r#"# SPDX-License-Identifier: AGPL-3.0-or-later
# Roster Configuration

name = "roster"
version = "1.0"
privilege_group = "sudo"

[directory]
create_home = true
shell = "/bin/bash"
purge_home_on_delete = true

[logging]
level = "info"
format = "text"
# file = "/var/log/roster.log"
"#;

    std::fs::write(config_path, default_config)?;
    println!("Created configuration file: {}", config_path.display());
    Ok(())
}

/// Show the current configuration
fn show_config(config_path: &PathBuf) -> anyhow::Result<()> {
    if !config_path.exists() {
        let config = Config::default();
        println!("No configuration file found. Using defaults:");
        println!();
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
