//! # quote
//!
//! Prints the multi-carrier quote for a JSON request file.
//!
//! ```text
//! quote <request.json> [shipmate.toml]
//!
//!   request.json ──► ShippingService::quote ──► JSON on stdout
//!   logs go to stderr (RUST_LOG, default "shipmate=info,quote=info")
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shipmate_service::{QuoteRequest, ShipmateConfig, ShippingService};

/// Library crates plus this binary's own target.
const DEFAULT_LOG_FILTER: &str = "shipmate=info,quote=info";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(request_path) = args.next().map(PathBuf::from) else {
        bail!("usage: quote <request.json> [shipmate.toml]");
    };
    let config_path = args.next().map(PathBuf::from);

    let config = ShipmateConfig::load(config_path).context("loading configuration")?;
    info!(vat_bps = config.pricing.vat_bps, currency = %config.pricing.currency, "Configuration loaded");

    let body = std::fs::read_to_string(&request_path)
        .with_context(|| format!("reading {}", request_path.display()))?;
    let request: QuoteRequest =
        serde_json::from_str(&body).with_context(|| format!("parsing {}", request_path.display()))?;

    let service = ShippingService::from_config(&config).context("loading shipping data")?;
    let quote = service.quote(&request).await?;

    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

/// Initializes the tracing subscriber on stderr.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=shipmate=trace` - Show trace for shipmate crates only
/// - Default: "shipmate=info,quote=info"
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
