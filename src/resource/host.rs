// src/resource/host.rs

//! Host CPU compute resources.
//!
//! There is a single platform, "Host CPU", with two devices:
//!
//! - device 0: a thread pool with one worker per available core
//! - device 1: a single worker thread (useful as a reference and for timing)
//!
//! Workers claim columns one at a time from a shared queue (a `Mutex` over
//! the buffer's column chunks), so a column that happens to be expensive (deep inside the set every cell runs to the
//! iteration bound) does not hold up the others. Each column is handed out
//! exactly once.

use log::{debug, trace};
use std::sync::Mutex;
use std::thread;

use super::{
    check_index, Capabilities, CancelToken, CellKernel, ComputeResource, DeviceBuffer,
    ResourceDescriptor, ResourceKind, ResourceSelector,
};
use crate::config::{GridSpec, ResourceIndex};
use crate::error::{ResourceDispatchError, ResourceSelectionError, TransferError};

const PLATFORM_NAME: &str = "Host CPU";
const THREAD_NAME_PREFIX: &str = "grid-worker";

// Kernel frames are tiny; the default 2-8MB per thread is wasted.
const STACK_SIZE: usize = 256 * 1024;

/// Selector over the host's CPU devices.
#[derive(Debug, Clone)]
pub struct HostPlatform {
    pool_threads: usize,
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HostPlatform {
    /// Sizes the pool device from `std::thread::available_parallelism()`.
    pub fn new() -> Self {
        let threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::with_threads(threads)
    }

    /// Pool device with an explicit worker count (at least 1).
    pub fn with_threads(pool_threads: usize) -> Self {
        Self {
            pool_threads: pool_threads.max(1),
        }
    }

    fn devices(&self) -> Vec<ResourceDescriptor> {
        let vendor = format!("{} ({})", std::env::consts::ARCH, std::env::consts::OS);
        let describe = |device: usize, name: String, compute_units: usize| ResourceDescriptor {
            index: ResourceIndex {
                platform: 0,
                device,
            },
            platform_name: PLATFORM_NAME.to_string(),
            device_name: name,
            vendor: vendor.clone(),
            kind: ResourceKind::Cpu,
            compute_units,
            capabilities: Capabilities::FP64 | Capabilities::PROFILING,
        };

        vec![
            describe(
                0,
                format!("thread pool ({} threads)", self.pool_threads),
                self.pool_threads,
            ),
            describe(1, "single thread".to_string(), 1),
        ]
    }
}

impl ResourceSelector for HostPlatform {
    fn enumerate(&self) -> Vec<ResourceDescriptor> {
        self.devices()
    }

    fn select(
        &self,
        index: ResourceIndex,
    ) -> Result<Box<dyn ComputeResource>, ResourceSelectionError> {
        let mut devices = self.devices();
        check_index(&[devices.len()], index)?;
        let descriptor = devices.swap_remove(index.device);
        debug!(
            "Selected {} / {}",
            descriptor.platform_name, descriptor.device_name
        );
        Ok(Box::new(HostDevice::new(descriptor)))
    }
}

/// A pool of scoped worker threads on the host.
#[derive(Debug)]
pub struct HostDevice {
    descriptor: ResourceDescriptor,
}

impl HostDevice {
    pub fn new(descriptor: ResourceDescriptor) -> Self {
        Self { descriptor }
    }

    fn threads(&self) -> usize {
        self.descriptor.compute_units.max(1)
    }
}

impl ComputeResource for HostDevice {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    fn allocate(&mut self, cells: usize) -> Result<DeviceBuffer, ResourceDispatchError> {
        DeviceBuffer::try_new(cells)
    }

    fn launch(
        &mut self,
        kernel: &CellKernel<'_>,
        grid: GridSpec,
        buffer: &mut DeviceBuffer,
        cancel: &CancelToken,
    ) -> Result<usize, ResourceDispatchError> {
        if buffer.len() != grid.cells() {
            return Err(ResourceDispatchError::BufferSizeMismatch {
                expected: grid.cells(),
                actual: buffer.len(),
            });
        }

        let workers = self.threads().min(grid.nx);
        let ny = grid.ny;
        let columns = Mutex::new(buffer.as_mut_slice().chunks_mut(ny).enumerate());

        let worker_loop = || {
            let mut done = 0usize;
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                // Hold the lock only long enough to claim a column.
                let next = match columns.lock() {
                    Ok(mut pending) => pending.next(),
                    Err(_) => None,
                };
                let Some((column, cells)) = next else {
                    break;
                };
                for (row, cell) in cells.iter_mut().enumerate() {
                    *cell = kernel(column, row);
                }
                done += 1;
            }
            done
        };

        thread::scope(|s| {
            let mut handles = Vec::with_capacity(workers);
            for worker in 0..workers {
                let handle = thread::Builder::new()
                    .name(format!("{}-{}", THREAD_NAME_PREFIX, worker))
                    .stack_size(STACK_SIZE)
                    .spawn_scoped(s, &worker_loop)
                    .map_err(|source| ResourceDispatchError::WorkerSpawn { worker, source })?;
                handles.push(handle);
            }

            // Join every worker before reporting, so no panic escapes the scope.
            let mut first_failure = None;
            for (worker, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(columns_done) => {
                        trace!("{}-{} computed {} column(s)", THREAD_NAME_PREFIX, worker, columns_done)
                    }
                    Err(_) => {
                        first_failure.get_or_insert(ResourceDispatchError::WorkerPanicked { worker });
                    }
                }
            }
            match first_failure {
                Some(err) => Err(err),
                None => Ok(workers),
            }
        })
    }

    fn read_back(
        &mut self,
        buffer: DeviceBuffer,
        expected: usize,
    ) -> Result<Vec<i32>, TransferError> {
        // Host memory is already host-addressable; only the shape is checked.
        if buffer.len() != expected {
            return Err(TransferError::LengthMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        Ok(buffer.into_cells())
    }
}
