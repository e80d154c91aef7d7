// src/config.rs

//! Defines the configuration structures for a grid run.
//!
//! A run is fully described by a [`RunConfig`]: the region of the complex
//! plane to sample, the output resolution, the numeric precision, which
//! compute resource to use and where to write the result. The structs can be
//! deserialized from a JSON file; any missing field falls back to the
//! defaults below, which reproduce the classic fixed-constant run (a
//! 1000x1000 window near -1.177 - 0.299i, double precision, first device of
//! the first platform, written to `out.dat`).
//!
//! The configuration is immutable once loaded. It is validated up front so
//! that no compute resource is touched with a nonsensical grid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::kernel::MAX_ITERATIONS;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV_VAR: &str = "MANDELGRID_CONFIG";

/// Largest iteration bound whose counts fit an `i32` result cell.
pub const MAX_ITERATION_LIMIT: u32 = i32::MAX as u32;

// --- Top-Level Configuration Structure ---

/// Everything a single run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Region of the complex plane being sampled.
    pub bounds: BoundingBox,
    /// Output resolution.
    pub grid: GridSpec,
    /// Numeric representation used by the kernel.
    pub precision: PrecisionPolicy,
    /// Which platform/device to bind.
    pub resource: ResourceIndex,
    /// Destination of the binary artifact.
    pub output: PathBuf,
    /// Iteration bound `M` of the escape-time kernel.
    pub max_iterations: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            bounds: BoundingBox::default(),
            grid: GridSpec::default(),
            precision: PrecisionPolicy::default(),
            resource: ResourceIndex::default(),
            output: PathBuf::from("out.dat"),
            max_iterations: MAX_ITERATIONS,
        }
    }
}

impl RunConfig {
    /// Loads a config from a JSON file and validates it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from the file named by [`CONFIG_ENV_VAR`], or returns the
    /// validated defaults if the variable is unset.
    pub fn from_env_or_default() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                log::info!("Loading configuration from {:?}", path);
                Self::load(Path::new(&path))
            }
            None => {
                log::info!("{} not set, using default configuration", CONFIG_ENV_VAR);
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dispatch().validate()
    }

    /// The subset of the configuration the dispatch engine consumes.
    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            bounds: self.bounds,
            grid: self.grid,
            precision: self.precision,
            max_iterations: self.max_iterations,
        }
    }
}

/// Immutable inputs of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchConfig {
    pub bounds: BoundingBox,
    pub grid: GridSpec,
    pub precision: PrecisionPolicy,
    pub max_iterations: u32,
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bounds.validate()?;
        self.grid.validate()?;
        if self.max_iterations > MAX_ITERATION_LIMIT {
            return Err(ConfigError::IterationBoundTooLarge {
                max_iterations: self.max_iterations,
                limit: MAX_ITERATION_LIMIT,
            });
        }
        Ok(())
    }
}

// --- Domain ---

/// Rectangle of the complex plane. `x` is the real part, `y` the imaginary.
///
/// The maxima are exclusive: the grid never samples `xmax` or `ymax`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox {
            xmin: -1.1785,
            xmax: -1.1755,
            ymin: -0.3000,
            ymax: -0.2970,
        }
    }
}

impl BoundingBox {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Self, ConfigError> {
        let bounds = BoundingBox {
            xmin,
            xmax,
            ymin,
            ymax,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range('x', self.xmin, self.xmax)?;
        check_range('y', self.ymin, self.ymax)
    }
}

fn check_range(axis: char, min: f64, max: f64) -> Result<(), ConfigError> {
    // NaN fails the comparison as well.
    if min.is_finite() && max.is_finite() && min < max {
        Ok(())
    } else {
        Err(ConfigError::InvalidBounds { axis, min, max })
    }
}

// --- Resolution ---

/// Number of columns (`nx`, along x) and rows (`ny`, along y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub nx: usize,
    pub ny: usize,
}

impl Default for GridSpec {
    fn default() -> Self {
        GridSpec { nx: 1000, ny: 1000 }
    }
}

impl GridSpec {
    pub fn new(nx: usize, ny: usize) -> Result<Self, ConfigError> {
        let grid = GridSpec { nx, ny };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (nx, ny) = (self.nx, self.ny);
        if nx == 0 || ny == 0 {
            return Err(ConfigError::EmptyGrid { nx, ny });
        }
        let header_limit = i32::MAX as usize;
        if nx > header_limit || ny > header_limit || nx.checked_mul(ny).is_none() {
            return Err(ConfigError::GridTooLarge { nx, ny });
        }
        Ok(())
    }

    /// Total number of cells.
    #[inline]
    pub fn cells(&self) -> usize {
        self.nx * self.ny
    }

    /// Flat index of cell `(column, row)` in the row-major-by-column layout.
    #[inline]
    pub fn index(&self, column: usize, row: usize) -> usize {
        column * self.ny + row
    }
}

// --- Precision ---

/// Numeric representation of one run. Never mixed inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecisionPolicy {
    /// 32-bit floats.
    Single,
    /// 64-bit floats.
    #[default]
    Double,
}

// --- Resource Index ---

/// Platform and device numbers, as printed by `resinfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceIndex {
    pub platform: usize,
    pub device: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_log::test;

    #[test]
    fn defaults_match_the_fixed_run() {
        let config = RunConfig::default();
        assert_eq!(config.grid, GridSpec { nx: 1000, ny: 1000 });
        assert_eq!(config.precision, PrecisionPolicy::Double);
        assert_eq!(config.resource, ResourceIndex { platform: 0, device: 0 });
        assert_eq!(config.output, PathBuf::from("out.dat"));
        assert_eq!(config.max_iterations, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_and_nan_bounds() {
        assert!(matches!(
            BoundingBox::new(1.0, -2.0, -1.0, 1.0),
            Err(ConfigError::InvalidBounds { axis: 'x', .. })
        ));
        assert!(matches!(
            BoundingBox::new(-2.0, 1.0, 0.5, 0.5),
            Err(ConfigError::InvalidBounds { axis: 'y', .. })
        ));
        assert!(BoundingBox::new(f64::NAN, 1.0, -1.0, 1.0).is_err());
    }

    #[test]
    fn rejects_empty_and_oversized_grids() {
        assert!(matches!(
            GridSpec::new(0, 10),
            Err(ConfigError::EmptyGrid { .. })
        ));
        assert!(matches!(
            GridSpec::new(i32::MAX as usize + 1, 1),
            Err(ConfigError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn iteration_bound_must_fit_a_result_cell() {
        let mut config = RunConfig {
            max_iterations: MAX_ITERATION_LIMIT,
            ..RunConfig::default()
        };
        assert!(config.validate().is_ok());

        config.max_iterations = MAX_ITERATION_LIMIT + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IterationBoundTooLarge { max_iterations, limit })
                if max_iterations == 1 << 31 && limit == i32::MAX as u32
        ));

        config.max_iterations = u32::MAX;
        assert!(matches!(
            config.dispatch().validate(),
            Err(ConfigError::IterationBoundTooLarge { .. })
        ));
    }

    #[test]
    fn oversized_iteration_bound_in_json_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_iterations": 4294967295 }}"#).unwrap();

        assert!(matches!(
            RunConfig::load(file.path()),
            Err(ConfigError::IterationBoundTooLarge { max_iterations: u32::MAX, .. })
        ));
    }

    #[test]
    fn cell_index_is_column_major_over_rows() {
        let grid = GridSpec::new(3, 4).unwrap();
        assert_eq!(grid.cells(), 12);
        assert_eq!(grid.index(0, 0), 0);
        assert_eq!(grid.index(0, 3), 3);
        assert_eq!(grid.index(1, 0), 4);
        assert_eq!(grid.index(2, 3), 11);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "grid": {{ "nx": 64 }}, "precision": "single", "output": "small.dat" }}"#
        )
        .unwrap();

        let config = RunConfig::load(file.path()).unwrap();
        assert_eq!(config.grid, GridSpec { nx: 64, ny: 1000 });
        assert_eq!(config.precision, PrecisionPolicy::Single);
        assert_eq!(config.output, PathBuf::from("small.dat"));
        assert_eq!(config.bounds, BoundingBox::default());
    }

    #[test]
    fn invalid_json_bounds_fail_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "bounds": {{ "xmin": 2.0, "xmax": 1.0 }} }}"#).unwrap();

        assert!(matches!(
            RunConfig::load(file.path()),
            Err(ConfigError::InvalidBounds { axis: 'x', .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        assert!(matches!(
            RunConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
