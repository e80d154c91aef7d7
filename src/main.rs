// src/main.rs

use anyhow::Context;
use log::{error, info};

use mandelgrid::{pipeline, HostPlatform, RunConfig};

/// Main entry point for the `mandelgrid` application.
fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting mandelgrid...");

    let config = RunConfig::from_env_or_default().context("Failed to load configuration")?;
    info!(
        "Grid {}x{} over x [{}, {}), y [{}, {}), {:?} precision, resource {}/{}",
        config.grid.nx,
        config.grid.ny,
        config.bounds.xmin,
        config.bounds.xmax,
        config.bounds.ymin,
        config.bounds.ymax,
        config.precision,
        config.resource.platform,
        config.resource.device
    );

    let platform = HostPlatform::new();
    let summary = match pipeline::run(&config, &platform) {
        Ok(summary) => summary,
        Err(e) => {
            let stage = e.stage();
            error!("Run failed during {}: {}", stage, e);
            return Err(e).with_context(|| format!("{} stage failed", stage));
        }
    };

    info!(
        "Done: {} cells on '{}' with {} worker(s), output in {:?}",
        summary.report.cells, summary.resource.device_name, summary.report.workers, config.output
    );
    Ok(())
}
