//! A single-platform, single-device selector whose device can be told to
//! misbehave, and which counts every kernel invocation.

use mandelgrid::config::{GridSpec, ResourceIndex};
use mandelgrid::error::{ResourceDispatchError, ResourceSelectionError, TransferError};
use mandelgrid::resource::{
    check_index, Capabilities, CancelToken, CellKernel, ComputeResource, DeviceBuffer,
    ResourceDescriptor, ResourceKind, ResourceSelector,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How the mock device should fail, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// Reports no FP64 capability.
    NoDoublePrecision,
    /// Reports no profiling capability.
    NoProfiling,
    /// Refuses to allocate.
    Allocation,
    /// Silently skips one column during launch.
    SkipColumn(usize),
    /// Drops the buffer on read-back.
    Transfer,
}

#[derive(Debug, Clone)]
pub struct MockSelector {
    fault: Fault,
    kernel_calls: Arc<AtomicUsize>,
}

impl MockSelector {
    pub fn new(fault: Fault) -> Self {
        Self {
            fault,
            kernel_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn kernel_calls(&self) -> usize {
        self.kernel_calls.load(Ordering::SeqCst)
    }

    fn descriptor(&self) -> ResourceDescriptor {
        let mut capabilities = Capabilities::FP64 | Capabilities::PROFILING;
        match self.fault {
            Fault::NoDoublePrecision => capabilities.remove(Capabilities::FP64),
            Fault::NoProfiling => capabilities.remove(Capabilities::PROFILING),
            _ => {}
        }
        ResourceDescriptor {
            index: ResourceIndex::default(),
            platform_name: "Mock Platform".to_string(),
            device_name: "mock accelerator".to_string(),
            vendor: "test".to_string(),
            kind: ResourceKind::Accelerator,
            compute_units: 1,
            capabilities,
        }
    }
}

impl ResourceSelector for MockSelector {
    fn enumerate(&self) -> Vec<ResourceDescriptor> {
        vec![self.descriptor()]
    }

    fn select(
        &self,
        index: ResourceIndex,
    ) -> Result<Box<dyn ComputeResource>, ResourceSelectionError> {
        check_index(&[1], index)?;
        Ok(Box::new(MockDevice {
            descriptor: self.descriptor(),
            fault: self.fault,
            kernel_calls: Arc::clone(&self.kernel_calls),
        }))
    }
}

struct MockDevice {
    descriptor: ResourceDescriptor,
    fault: Fault,
    kernel_calls: Arc<AtomicUsize>,
}

impl ComputeResource for MockDevice {
    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    fn allocate(&mut self, cells: usize) -> Result<DeviceBuffer, ResourceDispatchError> {
        if self.fault == Fault::Allocation {
            return Err(ResourceDispatchError::AllocationFailed { cells });
        }
        DeviceBuffer::try_new(cells)
    }

    fn launch(
        &mut self,
        kernel: &CellKernel<'_>,
        grid: GridSpec,
        buffer: &mut DeviceBuffer,
        cancel: &CancelToken,
    ) -> Result<usize, ResourceDispatchError> {
        let cells = buffer.as_mut_slice();
        for column in 0..grid.nx {
            if cancel.is_cancelled() || self.fault == Fault::SkipColumn(column) {
                continue;
            }
            for row in 0..grid.ny {
                self.kernel_calls.fetch_add(1, Ordering::SeqCst);
                cells[grid.index(column, row)] = kernel(column, row);
            }
        }
        Ok(1)
    }

    fn read_back(
        &mut self,
        buffer: DeviceBuffer,
        expected: usize,
    ) -> Result<Vec<i32>, TransferError> {
        if self.fault == Fault::Transfer {
            return Err(TransferError::BufferLost {
                reason: "mock device reset".to_string(),
            });
        }
        assert_eq!(buffer.len(), expected);
        Ok(buffer.into_cells())
    }
}
