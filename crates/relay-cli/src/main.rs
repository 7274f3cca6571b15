//! Relay CLI - Command-line interface
//!
//! Usage:
//!   relay media <url>
//!   relay identity --cnic <cnic> | --mobile <mobile>
//!   relay extract <file>
//!
//! Every command prints a JSON envelope on stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use relay_api::{AppError, ResultAssembler};
use relay_chain::{identity_providers, media_providers, ProviderChain, ReqwestFetcher};
use relay_core::{AppConfig, Query};
use relay_extractor::IdentityExtractor;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Multi-provider media resolution and identity lookup")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a short-video link to a direct media URL
    Media {
        /// Link to the video
        url: String,
    },
    /// Look up SIM ownership by CNIC or mobile number
    Identity {
        /// 13-digit CNIC, dashes allowed
        #[arg(long)]
        cnic: Option<String>,
        /// Mobile number, 03XXXXXXXXX or +92 form
        #[arg(long)]
        mobile: Option<String>,
    },
    /// Run the identity extraction pass over a saved page
    Extract {
        /// Path to an HTML or text file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("relay={0},relay_chain={0}", config.logging.level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let ok = match cli.command {
        Commands::Media { url } => run_media(&config, &url).await?,
        Commands::Identity { cnic, mobile } => {
            run_identity(&config, cnic.as_deref(), mobile.as_deref()).await?
        }
        Commands::Extract { file } => run_extract(&config, &file)?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn build_chain(config: &AppConfig) -> anyhow::Result<ProviderChain> {
    let fetcher = ReqwestFetcher::from_config(&config.http)?;
    Ok(ProviderChain::new(Arc::new(fetcher))
        .with_inter_attempt_delay(Duration::from_millis(config.http.inter_attempt_delay_ms)))
}

async fn run_media(config: &AppConfig, url: &str) -> anyhow::Result<bool> {
    let started = Instant::now();
    let query = match Query::media(url, &config.media.platform_markers) {
        Ok(query) => query,
        Err(e) => return print_error(AppError::from(e)),
    };

    let providers = media_providers(&config.media)?;
    let outcome = build_chain(config)?.resolve(&query, &providers).await;
    match outcome.into_result() {
        Ok(success) => print_json(&ResultAssembler::success(&query, success, started.elapsed())),
        Err(e) => print_error(AppError::from(e)),
    }
}

async fn run_identity(
    config: &AppConfig,
    cnic: Option<&str>,
    mobile: Option<&str>,
) -> anyhow::Result<bool> {
    let started = Instant::now();
    let query = match Query::identity(cnic, mobile) {
        Ok(query) => query,
        Err(e) => return print_error(AppError::from(e)),
    };

    let providers = identity_providers(&config.identity)?;
    let outcome = build_chain(config)?.resolve(&query, &providers).await;
    match outcome.into_result() {
        Ok(success) => print_json(&ResultAssembler::success(&query, success, started.elapsed())),
        Err(e) => print_error(AppError::from(e)),
    }
}

fn run_extract(config: &AppConfig, file: &Path) -> anyhow::Result<bool> {
    let markup = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let extractor = IdentityExtractor::from_config(&config.identity)?;
    let report = extractor.extract(&markup);
    tracing::info!("Extracted {} record(s) from {}", report.record_count, file.display());

    print_json(&ResultAssembler::data(report))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<bool> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(true)
}

fn print_error(err: AppError) -> anyhow::Result<bool> {
    print_json(&err.into_envelope())?;
    Ok(false)
}
