//! Tracing setup for the runner.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,biome_runner=debug,biome_world=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// `json` switches the fmt layer to one JSON object per line.
pub fn init_telemetry(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    info!(json, "Telemetry initialized");
    Ok(())
}
