//! mandelgrid - escape-time evaluation of the Mandelbrot set over a grid.
//!
//! A run samples a rectangle of the complex plane at `nx * ny` points, runs
//! the escape-time kernel for each point on a parallel compute resource and
//! writes the counts, together with the sample axes, to a compact binary
//! file for a separate plotting step.
//!
//! - [`config`]: run configuration (bounds, resolution, precision, device).
//! - [`grid`]: coordinate axes.
//! - [`kernel`]: the single- and double-precision escape-time kernels.
//! - [`resource`]: compute resource discovery and the host CPU backend.
//! - [`dispatch`]: fans the kernel out over a resource and collects results.
//! - [`output`]: the binary artifact format.
//! - [`pipeline`]: select → dispatch → serialize in one call.

pub mod buffer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod grid;
pub mod kernel;
pub mod output;
pub mod pipeline;
pub mod resource;

pub use buffer::ResultBuffer;
pub use config::{BoundingBox, DispatchConfig, GridSpec, PrecisionPolicy, ResourceIndex, RunConfig};
pub use dispatch::{DispatchEngine, DispatchReport, Dispatched};
pub use error::{Error, Result};
pub use grid::AxisArrays;
pub use resource::{
    CancelToken, ComputeResource, HostPlatform, ResourceDescriptor, ResourceSelector,
};
