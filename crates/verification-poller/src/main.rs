use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use verification_poller::{HttpVerificationSource, PollerConfig, VerificationPoller};

/// Watch a company profile until the platform accepts it.
///
/// Each line read from stdin counts as a focus event and triggers an immediate
/// refetch.
#[derive(Debug, Parser)]
#[command(name = "verification-watch")]
struct Args {
    /// Base URL of the backend REST API.
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:4000")]
    base_url: String,

    /// Session token of the company administrator.
    #[arg(long, env = "SESSION_TOKEN")]
    token: String,

    #[arg(long, env = "COMPANY_PROFILE_ID")]
    company_id: String,

    #[arg(long, env = "VERIFICATION_POLL_INTERVAL_SECS", default_value_t = 10)]
    interval_secs: u64,

    #[arg(long, env = "BACKEND_TIMEOUT_SECS", default_value_t = 15)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "verification_poller=info,verification_watch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let source = HttpVerificationSource::new(
        &args.base_url,
        args.token,
        Duration::from_secs(args.timeout_secs),
    )
    .context("Failed to build HTTP client")?;
    let poller = VerificationPoller::new(
        Arc::new(source),
        PollerConfig {
            interval: Duration::from_secs(args.interval_secs.max(1)),
        },
    );

    let (focus_tx, focus_rx) = mpsc::channel(8);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            if focus_tx.send(()).await.is_err() {
                break;
            }
        }
    });

    let handle = poller.spawn(args.company_id.clone(), focus_rx);
    let mut status = handle.subscribe();

    while status.changed().await.is_ok() {
        let Some(verification) = status.borrow_and_update().clone() else {
            continue;
        };
        match verification.rejection_reason.as_deref() {
            Some(reason) => tracing::info!(
                "Company {} is {} ({})",
                verification.id,
                verification.verification_status.as_str(),
                reason
            ),
            None => tracing::info!(
                "Company {} is {}",
                verification.id,
                verification.verification_status.as_str()
            ),
        }
        if verification.verification_status.is_resolved() {
            break;
        }
    }

    Ok(())
}
