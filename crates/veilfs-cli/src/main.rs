#![deny(unsafe_code)]

mod commands;
mod config;
mod exit_code;
mod output;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use veilfs_core::{Storage, StorageError};

use crate::commands::{cat, ls, mkdir, mv, rm, tree, types, write};
use crate::config::{Config, SettingsError};

/// Command-line interface for veilfs encrypted storage
#[derive(Parser)]
#[command(name = "veilfs")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Show alice's tree (key from the environment)
    VEILFS_KEY=\"$SECRET\" veilfs --identity alice tree

    # Store a file from stdin
    echo hello | veilfs --identity alice --key \"$SECRET\" write docs/readme.md

    # Read it back
    veilfs --identity alice cat docs/readme.md

    # Defaults (storage dir, identity, salt) come from ~/.config/veilfs/config.toml
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Shared storage directory
    #[arg(long, env = "VEILFS_STORAGE_DIR", global = true, value_name = "DIR")]
    storage_dir: Option<PathBuf>,

    /// Principal whose tree to open
    #[arg(long, env = "VEILFS_IDENTITY", global = true)]
    identity: Option<String>,

    /// Secret the cipher key is derived from (prefer VEILFS_KEY)
    #[arg(long, env = "VEILFS_KEY", hide_env_values = true, global = true)]
    key: Option<String>,

    /// Salt for root labels and key derivation
    #[arg(long, env = "HASH_SALT", hide_env_values = true, global = true)]
    salt: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the decrypted tree
    Tree(tree::Args),

    /// List directory contents
    Ls(ls::Args),

    /// Read and output file contents
    Cat(cat::Args),

    /// Write stdin to a file
    Write(write::Args),

    /// Create a directory (and missing parents)
    Mkdir(mkdir::Args),

    /// Remove a file or directory
    Rm(rm::Args),

    /// Rename a file or directory within its parent
    Mv(mv::Args),

    /// Show the node type bit table
    Types(types::Args),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            let code = categorize_error(&e);

            let args: Vec<String> = std::env::args().collect();
            let is_quiet = args.iter().any(|a| a == "-q" || a == "--quiet");

            if !is_quiet {
                eprintln!("Error: {e:#}");
            }

            ExitCode::from(code)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if !cli.quiet {
        setup_tracing(cli.verbose);
    }

    // Needs no tree
    if let Commands::Types(args) = &cli.command {
        return types::execute(args);
    }

    let config = Config::load()?;
    let storage = open_storage(&cli, &config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let command = cli.command;
    runtime.block_on(async move {
        match command {
            Commands::Tree(args) => tree::execute(&storage, &args).await,
            Commands::Ls(args) => ls::execute(&storage, &args).await,
            Commands::Cat(args) => cat::execute(&storage, &args).await,
            Commands::Write(args) => write::execute(&storage, &args).await,
            Commands::Mkdir(args) => mkdir::execute(&storage, &args).await,
            Commands::Rm(args) => rm::execute(&storage, &args).await,
            Commands::Mv(args) => mv::execute(&storage, &args).await,
            Commands::Types(args) => types::execute(&args),
        }
    })
}

/// Open the tree for the identity and key given on the command line.
fn open_storage(cli: &Cli, config: &Config) -> Result<Storage> {
    let identity = config.identity(cli.identity.as_deref())?;
    let key = cli.key.as_deref().ok_or(SettingsError::MissingKey)?;
    let storage_config = config.storage_config(cli.storage_dir.as_deref(), cli.salt.as_deref());

    tracing::debug!(
        identity = %identity,
        storage_dir = %storage_config.base_dir.display(),
        "Opening storage"
    );
    Ok(Storage::new(&storage_config, &identity, key))
}

/// Set up tracing/logging based on verbosity level
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Categorize an error into an exit code using typed error downcasting
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(storage_err) = cause.downcast_ref::<StorageError>() {
            return match storage_err {
                StorageError::NotFound { .. } => exit_code::NOT_FOUND,
                StorageError::Collision { .. } => exit_code::COLLISION,
                StorageError::Decrypt { .. } => exit_code::DECRYPT_FAILED,
                StorageError::InvalidPath { .. }
                | StorageError::NotAFile { .. }
                | StorageError::NotADirectory { .. } => exit_code::USAGE_ERROR,
                StorageError::Io { source, .. } => match source.kind() {
                    io::ErrorKind::PermissionDenied => exit_code::PERMISSION_DENIED,
                    io::ErrorKind::NotFound => exit_code::NOT_FOUND,
                    _ => exit_code::GENERAL_ERROR,
                },
            };
        }

        if cause.downcast_ref::<SettingsError>().is_some() {
            return exit_code::USAGE_ERROR;
        }

        if let Some(io_err) = cause.downcast_ref::<io::Error>()
            && io_err.kind() == io::ErrorKind::PermissionDenied
        {
            return exit_code::PERMISSION_DENIED;
        }
    }

    exit_code::GENERAL_ERROR
}
