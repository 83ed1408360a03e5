//! Pay an X user through Snack Money.
//!
//! # Usage
//!
//! ```bash
//! # Sign with a local key on Base
//! snack402 --receiver jack --amount 0.01 private-key
//!
//! # First run creates a custodial account and prints its address
//! snack402 --receiver jack custodial
//!
//! # Configure logging level
//! RUST_LOG=debug snack402 --receiver jack smart-wallet
//! ```
//!
//! Settings are read from flags, then the environment, then a `.env` file.
//! See [`snack402_cli::config`] for the full list.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use snack402_cli::Cli;
use snack402_cli::commands;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        tracing::error!("Payment failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;
    tracing::info!(
        receiver = %config.payment.request.receiver,
        amount = %config.payment.request.amount,
        "Loaded configuration"
    );
    commands::run(config).await?;
    Ok(())
}
