//! A complete run: select a resource, dispatch, serialize.

use log::info;

use crate::config::RunConfig;
use crate::dispatch::{DispatchEngine, DispatchReport, Dispatched};
use crate::error::Result;
use crate::grid::AxisArrays;
use crate::output;
use crate::resource::{CancelToken, ResourceDescriptor, ResourceSelector};

/// What a successful run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub resource: ResourceDescriptor,
    pub report: DispatchReport,
}

/// Runs `config` on a resource chosen from `selector` and writes the artifact.
///
/// Selection happens before anything else, so an invalid resource index
/// fails without a single kernel invocation.
pub fn run(config: &RunConfig, selector: &dyn ResourceSelector) -> Result<RunSummary> {
    run_with_cancel(config, selector, CancelToken::new())
}

pub fn run_with_cancel(
    config: &RunConfig,
    selector: &dyn ResourceSelector,
    cancel: CancelToken,
) -> Result<RunSummary> {
    config.validate()?;

    let resource = selector.select(config.resource)?;
    let descriptor = resource.descriptor().clone();
    info!("Compute platform: {}", descriptor.platform_name);
    info!("Compute device: {}", descriptor.device_name);

    let mut engine = DispatchEngine::new(config.dispatch(), resource).with_cancel_token(cancel);
    let Dispatched { results, report } = engine.run()?;

    // The artifact's axes are single precision regardless of the kernel's.
    let axes = AxisArrays::<f32>::new(&config.bounds, config.grid);
    output::write_dat(&config.output, &axes, &results)?;

    Ok(RunSummary {
        resource: descriptor,
        report,
    })
}
