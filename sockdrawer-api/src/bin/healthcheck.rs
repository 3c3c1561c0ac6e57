//! sockdrawer-healthcheck - probe a running sockdrawer-api
//!
//! Sends one guess request and exits 0 if the answer is a successful
//! JSON-RPC 2.0 response, 1 otherwise. Suitable as a container health check.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sockdrawer_api::probe::{probe, DEFAULT_PROBE_IDS};

/// Command-line arguments for sockdrawer-healthcheck
#[derive(Parser, Debug)]
#[command(name = "sockdrawer-healthcheck")]
#[command(about = "Health probe for the Sockdrawer guess service")]
#[command(version)]
struct Args {
    /// Base URL of the service to probe
    #[arg(long, default_value = "http://127.0.0.1:5000", env = "SOCKDRAWER_HEALTH_CHECK_HOST")]
    url: String,

    /// Comma-separated accounts to ask about
    #[arg(long, default_value = DEFAULT_PROBE_IDS)]
    ids: String,

    /// Overall request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

async fn run(args: &Args) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let verdicts = probe(&client, &args.url, &args.ids)
        .await
        .with_context(|| format!("Health check against {} failed", args.url))?;

    println!("ok: {} verdict(s)", verdicts.len());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
