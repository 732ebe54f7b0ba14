use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use addon_sign::config::Channel;

mod cmd;

#[derive(Parser)]
#[command(name = "addon-sign")]
#[command(version, about = "Submit browser add-ons for remote signing")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory containing sign.toml (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload an artifact, wait for signing, and download the signed files
    Sign(SignArgs),
    /// View, validate or create sign.toml
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(clap::Args, Clone, Debug)]
pub struct SignArgs {
    /// Packaged add-on to upload (.xpi or .zip)
    #[arg(long)]
    pub artifact: PathBuf,

    /// Add-on identifier (guid)
    #[arg(long)]
    pub id: String,

    /// Version being submitted
    #[arg(long = "version")]
    pub addon_version: String,

    /// Release channel: listed, unlisted
    #[arg(long)]
    pub channel: Option<Channel>,

    /// Give up waiting for signing after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Where signed files are written
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    #[arg(long)]
    pub api_url: Option<String>,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub api_secret: Option<String>,

    #[arg(long)]
    pub api_proxy: Option<String>,

    /// Print the result as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Check that credentials and settings resolve
    Validate,
    /// Write a default sign.toml
    Init,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("addon_sign=debug")
        } else {
            EnvFilter::new("addon_sign=info")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    dotenvy::from_path(project_dir.join(".env")).ok();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Sign(args) => {
            let success = cmd::cmd_sign(&project_dir, args).await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
