//! skillctl - CLI client for skilld
//!
//! Resolves, validates and installs skills through the daemon.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod client;
mod install;
mod render;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use client::{Client, ClientError, Fetched};
use skill_core::MERGE_ALL;

/// CLI client for the skilld resolver daemon.
#[derive(Parser)]
#[command(name = "skillctl")]
#[command(about = "Resolve and install skills from GitHub repositories via skilld")]
#[command(version)]
struct Cli {
    /// Daemon address (default: http://127.0.0.1:7710)
    #[arg(long, global = true, env = "SKILLD_ADDR")]
    addr: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Which skill of a repository to fetch.
#[derive(Args)]
struct Selection {
    /// Repository reference (github.com/owner/repo or owner/repo)
    reference: String,

    /// Path of one skill inside the repository
    #[arg(long, conflicts_with = "all")]
    skill: Option<String>,

    /// Merge every skill under skills/ into one bundle
    #[arg(long)]
    all: bool,
}

impl Selection {
    fn skill_path(&self) -> Option<String> {
        if self.all {
            Some(MERGE_ALL.to_string())
        } else {
            self.skill.clone()
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a repository to a skill listing or bundle
    Resolve {
        #[command(flatten)]
        selection: Selection,

        /// Print the raw bundle instead of a summary
        #[arg(long)]
        raw: bool,
    },

    /// Resolve a skill and write its files to a directory
    Install {
        #[command(flatten)]
        selection: Selection,

        /// Destination directory
        #[arg(long)]
        dest: PathBuf,
    },

    /// Check that a repository has a valid root SKILL.md
    Validate {
        /// Repository reference (github.com/owner/repo or owner/repo)
        reference: String,
    },

    /// Check that the daemon is up
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let addr = cli
        .addr
        .unwrap_or_else(|| "http://127.0.0.1:7710".to_string());
    let client = Client::new(&addr);

    // Wait for daemon to be ready with exponential backoff.
    if let Err(e) = client.wait_for_ready().await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Resolve { selection, raw } => run_resolve(&client, &selection, raw).await,
        Command::Install { selection, dest } => run_install(&client, &selection, &dest).await,
        Command::Validate { reference } => run_validate(&client, &reference).await,
        Command::Health => {
            println!("skilld is healthy at {}", client.addr());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run_resolve(client: &Client, selection: &Selection, raw: bool) -> Result<(), ClientError> {
    match client
        .resolve(&selection.reference, selection.skill_path())
        .await?
    {
        Fetched::Listing(listing) => render::print_listing(&listing),
        Fetched::Bundle(bundle) if raw => print!("{}", bundle.content),
        Fetched::Bundle(bundle) => render::print_bundle_summary(&bundle),
        Fetched::Validated(v) => render::print_validation(&v),
    }
    Ok(())
}

async fn run_install(
    client: &Client,
    selection: &Selection,
    dest: &std::path::Path,
) -> Result<(), ClientError> {
    match client
        .resolve(&selection.reference, selection.skill_path())
        .await?
    {
        Fetched::Bundle(bundle) => {
            let written = install::install_bundle(&bundle.content, &bundle.digest, dest)?;
            render::print_installed(&written);
            Ok(())
        }
        Fetched::Listing(listing) => {
            render::print_listing(&listing);
            Err(ClientError::InvalidResponse(
                "repository has multiple skills; pass --skill <path> or --all".to_string(),
            ))
        }
        Fetched::Validated(_) => Err(ClientError::InvalidResponse(
            "expected a bundle, got a validation result".to_string(),
        )),
    }
}

async fn run_validate(client: &Client, reference: &str) -> Result<(), ClientError> {
    match client.validate(reference).await {
        Ok(result) => {
            render::print_validation(&result);
            Ok(())
        }
        Err(ClientError::ValidationFailed { message, missing }) => {
            println!("Validation failed: {message}");
            for field in &missing {
                println!("  missing: {field}");
            }
            Err(ClientError::ValidationFailed { message, missing })
        }
        Err(e) => Err(e),
    }
}
