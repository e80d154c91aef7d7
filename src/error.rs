// src/error.rs

//! Error taxonomy for a grid run.
//!
//! Every stage that touches the configuration, the compute resource or the
//! filesystem returns one of the stage errors below. They all convert into
//! [`Error`], so a run is a chain of `?` that stops at the first failure.
//! Nothing is retried and nothing is downgraded.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::PrecisionPolicy;

/// Result alias used by every fallible operation in the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any failure that aborts a run.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    ResourceSelection(#[from] ResourceSelectionError),
    #[error(transparent)]
    ResourceDispatch(#[from] ResourceDispatchError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl Error {
    /// Name of the pipeline stage the error originated in.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration",
            Error::ResourceSelection(_) => "resource selection",
            Error::ResourceDispatch(_) => "dispatch",
            Error::Transfer(_) => "transfer",
            Error::Serialization(_) => "serialization",
        }
    }
}

/// Invalid or unreadable run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid bounding box: {axis} range [{min}, {max}) is empty or not finite")]
    InvalidBounds { axis: char, min: f64, max: f64 },
    #[error("grid resolution must be positive, got {nx}x{ny}")]
    EmptyGrid { nx: usize, ny: usize },
    #[error("grid resolution {nx}x{ny} does not fit the 32-bit output header")]
    GridTooLarge { nx: usize, ny: usize },
    #[error("iteration bound {max_iterations} exceeds the 32-bit result limit ({limit})")]
    IterationBoundTooLarge { max_iterations: u32, limit: u32 },
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The requested platform or device does not exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceSelectionError {
    #[error("platform index ({index}) is out of range: {available} platform(s) available")]
    PlatformOutOfRange { index: usize, available: usize },
    #[error(
        "device index ({index}) is out of range: platform {platform} has {available} device(s)"
    )]
    DeviceOutOfRange {
        platform: usize,
        index: usize,
        available: usize,
    },
}

/// The compute resource refused the work or failed while running it.
#[derive(Error, Debug)]
pub enum ResourceDispatchError {
    #[error("device '{device}' does not support {precision:?} precision")]
    UnsupportedPrecision {
        device: String,
        precision: PrecisionPolicy,
    },
    #[error("failed to allocate a result buffer of {cells} cells")]
    AllocationFailed { cells: usize },
    #[error("buffer holds {actual} cells but the grid needs {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },
    #[error("failed to spawn worker thread {worker}")]
    WorkerSpawn {
        worker: usize,
        #[source]
        source: io::Error,
    },
    #[error("worker thread {worker} panicked during execution")]
    WorkerPanicked { worker: usize },
    #[error("run was cancelled before results were collected")]
    Cancelled,
    #[error("{missing} cell(s) were never written by the kernel")]
    IncompleteResult { missing: usize },
}

/// Results could not be moved back into host memory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("device returned {actual} cells, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("device buffer was lost before read-back: {reason}")]
    BufferLost { reason: String },
}

/// Failure writing or reading the output artifact.
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("I/O error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error on output stream")]
    Stream(#[from] io::Error),
    #[error("dimension {value} does not fit in a 32-bit header field")]
    DimensionOverflow { value: usize },
    #[error("{what} has {actual} elements, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("negative dimension in header: {nx}x{ny}")]
    NegativeDimension { nx: i32, ny: i32 },
    #[error("input ended while reading {what}")]
    Truncated { what: &'static str },
}
