// src/resource/mod.rs
//
// Abstracts over the compute resources a run can be bound to. Discovery is
// behind `ResourceSelector`; the dispatch engine only ever sees the
// `ComputeResource` it was handed.

pub mod host;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::buffer::UNWRITTEN;
use crate::config::{GridSpec, PrecisionPolicy, ResourceIndex};
use crate::error::{ResourceDispatchError, ResourceSelectionError, TransferError};

pub use host::{HostDevice, HostPlatform};

bitflags! {
    /// What a compute resource can do.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        /// Native 64-bit floating point.
        const FP64 = 1 << 0;
        /// Reports kernel and transfer timings.
        const PROFILING = 1 << 1;
    }
}

/// Broad class of execution target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Cpu,
    Accelerator,
}

/// Identity and capabilities of one device, as returned by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub index: ResourceIndex,
    pub platform_name: String,
    pub device_name: String,
    pub vendor: String,
    pub kind: ResourceKind,
    /// Number of independent execution units (worker threads on the host).
    pub compute_units: usize,
    pub capabilities: Capabilities,
}

impl ResourceDescriptor {
    pub fn supports(&self, precision: PrecisionPolicy) -> bool {
        match precision {
            PrecisionPolicy::Single => true,
            PrecisionPolicy::Double => self.capabilities.contains(Capabilities::FP64),
        }
    }
}

/// The per-cell work item: `(column, row) -> escape count`.
///
/// The kernel may borrow from the caller; it only has to outlive the launch.
pub type CellKernel<'a> = dyn Fn(usize, usize) -> i32 + Sync + 'a;

/// Result storage owned by a resource between `allocate` and `read_back`.
#[derive(Debug)]
pub struct DeviceBuffer {
    cells: Vec<i32>,
}

impl DeviceBuffer {
    /// Allocates `len` cells, all set to [`UNWRITTEN`].
    pub fn try_new(len: usize) -> Result<Self, ResourceDispatchError> {
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| ResourceDispatchError::AllocationFailed { cells: len })?;
        cells.resize(len, UNWRITTEN);
        Ok(Self { cells })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [i32] {
        &mut self.cells
    }

    pub fn into_cells(self) -> Vec<i32> {
        self.cells
    }
}

/// Cooperative cancellation flag shared between a caller and a run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A bound execution target.
///
/// The engine drives the stages in order: `allocate`, `launch`, `read_back`.
/// Each stage fails fast with its own error type.
pub trait ComputeResource: Send {
    fn descriptor(&self) -> &ResourceDescriptor;

    /// Reserves storage for `cells` results, pre-filled with the sentinel.
    fn allocate(&mut self, cells: usize) -> Result<DeviceBuffer, ResourceDispatchError>;

    /// Runs `kernel` once for every cell of `grid`, storing cell `(i, j)` at
    /// `grid.index(i, j)`. Blocks until every worker has finished. Returns
    /// the number of workers that took part.
    ///
    /// Workers stop picking up new columns once `cancel` fires.
    fn launch(
        &mut self,
        kernel: &CellKernel<'_>,
        grid: GridSpec,
        buffer: &mut DeviceBuffer,
        cancel: &CancelToken,
    ) -> Result<usize, ResourceDispatchError>;

    /// Moves the results into host memory.
    fn read_back(&mut self, buffer: DeviceBuffer, expected: usize)
        -> Result<Vec<i32>, TransferError>;
}

/// Capability-query interface over the available platforms and devices.
pub trait ResourceSelector {
    /// Every device of every platform, in index order.
    fn enumerate(&self) -> Vec<ResourceDescriptor>;

    /// Binds the device at `index`. Out-of-range indices fail without
    /// creating anything.
    fn select(&self, index: ResourceIndex) -> Result<Box<dyn ComputeResource>, ResourceSelectionError>;
}

/// Bounds-checks `index` against per-platform device counts.
pub fn check_index(
    devices_per_platform: &[usize],
    index: ResourceIndex,
) -> Result<(), ResourceSelectionError> {
    let available = devices_per_platform.len();
    let devices = *devices_per_platform.get(index.platform).ok_or(
        ResourceSelectionError::PlatformOutOfRange {
            index: index.platform,
            available,
        },
    )?;
    if index.device >= devices {
        return Err(ResourceSelectionError::DeviceOutOfRange {
            platform: index.platform,
            index: index.device,
            available: devices,
        });
    }
    Ok(())
}
