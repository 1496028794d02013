//! Capture one acquisition from a TDS2024B and print it as CSV.
//!
//! ```bash
//! cargo run --example acquire --features instrument_visa -- --channels 1,2 --samples 500
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tds2024b::config::DEFAULT_CONFIG_PATH;
use tds2024b::{tracing_init, Channel, ScopeConfig, Tds2024b, VisaAdapter};

#[derive(Parser, Debug)]
#[command(about = "Single-sequence capture from a Tektronix TDS2024B")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Channels to transfer, 1-4
    #[arg(long, value_delimiter = ',', default_value = "1")]
    channels: Vec<u8>,

    /// Points per channel; defaults to the configured sample count
    #[arg(long)]
    samples: Option<usize>,

    /// Override the VISA resource string from the config file
    #[arg(long)]
    resource: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ScopeConfig::load_from(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(resource) = args.resource {
        config.instrument.resource_string = resource;
    }
    config.validate()?;
    tracing_init::init_from_config(&config)?;

    let channels = args
        .channels
        .iter()
        .map(|&n| Channel::try_from(n))
        .collect::<Result<Vec<_>, _>>()?;

    let mut link = VisaAdapter::from_config(&config.instrument);
    link.connect()
        .await
        .with_context(|| format!("opening {}", config.instrument.resource_string))?;

    let mut scope = Tds2024b::with_config(link, &config);
    tracing::info!(idn = %scope.read_idn().await?, "connected");

    let capture = match args.samples {
        Some(samples) => scope.acquire(&channels, samples).await?,
        None => scope.acquire_default(&channels).await?,
    };

    capture.write_csv(std::io::stdout())?;

    scope.into_inner().disconnect();
    Ok(())
}
