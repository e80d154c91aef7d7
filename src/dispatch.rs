//! Parallel dispatch of the escape-time kernel over a grid.
//!
//! The engine owns one compute resource for the duration of a run and drives
//! it through allocate → launch → read-back. The precision policy is resolved
//! exactly once, when the kernel is bound: the hot loop only ever sees a
//! `(column, row) -> count` closure over pre-built axes of the right type.
//!
//! A [`ResultBuffer`] is published only after every cell has been read back
//! and checked against the unwritten sentinel. Any failure before that point
//! discards the partial results.
//!
//! Kernel and transfer latencies are only measured on resources that
//! advertise [`Capabilities::PROFILING`].

use log::{debug, info};
use std::time::{Duration, Instant};

use crate::buffer::{ResultBuffer, UNWRITTEN};
use crate::config::{DispatchConfig, PrecisionPolicy};
use crate::error::{ResourceDispatchError, Result};
use crate::grid::AxisArrays;
use crate::kernel::{escape_time_f32, escape_time_f64};
use crate::resource::{
    Capabilities, CancelToken, CellKernel, ComputeResource, ResourceDescriptor,
};

/// Timing and shape of a completed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub cells: usize,
    pub workers: usize,
    /// `None` unless the resource supports profiling.
    pub kernel_time: Option<Duration>,
    /// `None` unless the resource supports profiling.
    pub transfer_time: Option<Duration>,
}

/// Output of [`DispatchEngine::run`].
#[derive(Debug)]
pub struct Dispatched {
    pub results: ResultBuffer,
    pub report: DispatchReport,
}

/// Runs the kernel for every cell of a grid on one compute resource.
pub struct DispatchEngine {
    config: DispatchConfig,
    resource: Box<dyn ComputeResource>,
    cancel: CancelToken,
}

impl DispatchEngine {
    pub fn new(config: DispatchConfig, resource: Box<dyn ComputeResource>) -> Self {
        Self {
            config,
            resource,
            cancel: CancelToken::new(),
        }
    }

    /// Uses `token` to abandon the run between dispatch and collection.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        self.resource.descriptor()
    }

    /// Computes the full grid. Deterministic for a given config.
    pub fn run(&mut self) -> Result<Dispatched> {
        // Fields are public; a hand-built config may not have been validated.
        self.config.validate()?;
        let DispatchConfig {
            bounds,
            grid,
            precision,
            max_iterations,
        } = self.config;

        let descriptor = self.resource.descriptor();
        if !descriptor.supports(precision) {
            return Err(ResourceDispatchError::UnsupportedPrecision {
                device: descriptor.device_name.clone(),
                precision,
            }
            .into());
        }
        let profiling = descriptor.capabilities.contains(Capabilities::PROFILING);

        // validate() caps the bound at i32::MAX, so the casts below are lossless.
        let kernel: Box<CellKernel<'static>> = match precision {
            PrecisionPolicy::Single => {
                info!("Using single precision calculations");
                let axes = AxisArrays::<f32>::new(&bounds, grid);
                Box::new(move |column: usize, row: usize| {
                    escape_time_f32(axes.x()[column], axes.y()[row], max_iterations) as i32
                })
            }
            PrecisionPolicy::Double => {
                info!("Using double precision calculations");
                let axes = AxisArrays::<f64>::new(&bounds, grid);
                Box::new(move |column: usize, row: usize| {
                    escape_time_f64(axes.x()[column], axes.y()[row], max_iterations) as i32
                })
            }
        };

        let cells = grid.cells();
        let mut device_buffer = self.resource.allocate(cells)?;

        info!(
            "Executing the kernel over {}x{} cells (M = {})...",
            grid.nx, grid.ny, max_iterations
        );
        let start = profiling.then(Instant::now);
        let workers = self
            .resource
            .launch(kernel.as_ref(), grid, &mut device_buffer, &self.cancel)?;
        let kernel_time = start.map(|s| s.elapsed());

        if self.cancel.is_cancelled() {
            info!("Run cancelled; discarding device buffer");
            return Err(ResourceDispatchError::Cancelled.into());
        }

        let start = profiling.then(Instant::now);
        let host_cells = self.resource.read_back(device_buffer, cells)?;
        let transfer_time = start.map(|s| s.elapsed());

        let missing = host_cells.iter().filter(|&&c| c == UNWRITTEN).count();
        if missing > 0 {
            return Err(ResourceDispatchError::IncompleteResult { missing }.into());
        }

        if let (Some(kernel_time), Some(transfer_time)) = (kernel_time, transfer_time) {
            info!("Time to complete calculation: {:.3} ms", millis(kernel_time));
            info!(
                "Time to complete copy from device to host: {:.3} ms",
                millis(transfer_time)
            );
        }
        debug!("{} cells computed by {} worker(s)", cells, workers);

        Ok(Dispatched {
            results: ResultBuffer::from_cells(grid, host_cells),
            report: DispatchReport {
                cells,
                workers,
                kernel_time,
                transfer_time,
            },
        })
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1e3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoundingBox, GridSpec, ResourceIndex, MAX_ITERATION_LIMIT};
    use crate::error::{ConfigError, Error};
    use crate::kernel::MAX_ITERATIONS;
    use crate::resource::{HostPlatform, ResourceSelector};
    use test_log::test;

    fn config(precision: PrecisionPolicy, nx: usize, ny: usize) -> DispatchConfig {
        DispatchConfig {
            bounds: BoundingBox::new(-2.0, 1.0, -1.5, 1.5).unwrap(),
            grid: GridSpec::new(nx, ny).unwrap(),
            precision,
            max_iterations: MAX_ITERATIONS,
        }
    }

    fn engine(config: DispatchConfig, threads: usize) -> DispatchEngine {
        let resource = HostPlatform::with_threads(threads)
            .select(ResourceIndex::default())
            .unwrap();
        DispatchEngine::new(config, resource)
    }

    #[test]
    fn three_by_three_double_precision() {
        let Dispatched { results, report } =
            engine(config(PrecisionPolicy::Double, 3, 3), 2).run().unwrap();

        assert_eq!(report.cells, 9);
        // The host devices support profiling.
        assert!(report.kernel_time.is_some());
        assert!(report.transfer_time.is_some());
        // c = -2 - 1.5i escapes on the first step.
        assert!(results.get(0, 0) < 10);
        assert_eq!(results.get(0, 0), 1);
        // c = -1 - 0.5i lies just outside the period-2 bulb.
        assert_eq!(results.get(1, 1), 5);
        // c = ±0.5i are inside the main cardioid.
        assert_eq!(results.get(2, 1), MAX_ITERATIONS as i32);
        assert_eq!(results.get(2, 2), MAX_ITERATIONS as i32);
        assert_eq!(results.as_slice(), &[1, 1, 1, 2, 5, 5, 2, 256, 256]);
    }

    #[test]
    fn single_precision_uses_the_f32_kernel() {
        let Dispatched { results, .. } =
            engine(config(PrecisionPolicy::Single, 3, 3), 1).run().unwrap();
        assert_eq!(results.as_slice(), &[1, 1, 1, 2, 5, 5, 2, 256, 256]);
    }

    #[test]
    fn every_cell_matches_the_kernel() {
        let cfg = config(PrecisionPolicy::Double, 41, 29);
        let Dispatched { results, .. } = engine(cfg, 4).run().unwrap();
        let axes = AxisArrays::<f64>::new(&cfg.bounds, cfg.grid);

        assert!(results.as_slice().iter().all(|&c| c != UNWRITTEN));
        for (column, &x) in axes.x().iter().enumerate() {
            for (row, &y) in axes.y().iter().enumerate() {
                assert_eq!(
                    results.get(column, row),
                    escape_time_f64(x, y, MAX_ITERATIONS) as i32
                );
            }
        }
    }

    #[test]
    fn repeated_runs_are_identical() {
        let cfg = config(PrecisionPolicy::Single, 64, 48);
        let first = engine(cfg, 3).run().unwrap().results;
        let second = engine(cfg, 5).run().unwrap().results;
        assert_eq!(first, second);
    }

    #[test]
    fn cancelled_run_publishes_nothing() {
        let token = CancelToken::new();
        token.cancel();
        let mut engine =
            engine(config(PrecisionPolicy::Double, 16, 16), 2).with_cancel_token(token);

        assert!(matches!(
            engine.run(),
            Err(Error::ResourceDispatch(ResourceDispatchError::Cancelled))
        ));
    }

    #[test]
    fn unvalidated_empty_grid_is_a_config_error() {
        let mut cfg = config(PrecisionPolicy::Double, 4, 4);
        cfg.grid = GridSpec { nx: 4, ny: 0 };

        assert!(matches!(
            engine(cfg, 2).run(),
            Err(Error::Config(ConfigError::EmptyGrid { nx: 4, ny: 0 }))
        ));
    }

    #[test]
    fn iteration_bound_beyond_i32_is_rejected() {
        let mut cfg = config(PrecisionPolicy::Single, 1, 1);
        cfg.max_iterations = u32::MAX;

        let err = engine(cfg, 1).run().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::IterationBoundTooLarge { max_iterations: u32::MAX, .. })
        ));
        assert_eq!(err.stage(), "configuration");
    }

    #[test]
    fn largest_iteration_bound_is_stored_losslessly() {
        // c = 2 escapes at n = 2 regardless of the bound.
        let cfg = DispatchConfig {
            bounds: BoundingBox::new(2.0, 3.0, 0.0, 1.0).unwrap(),
            grid: GridSpec::new(1, 1).unwrap(),
            precision: PrecisionPolicy::Double,
            max_iterations: MAX_ITERATION_LIMIT,
        };
        let Dispatched { results, .. } = engine(cfg, 1).run().unwrap();
        assert_eq!(results.as_slice(), &[2]);
    }
}
