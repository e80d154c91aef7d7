//! Coordinate axes for a grid run.
//!
//! `axis[i] = min + (max - min) / n * i` for `i` in `0..n`, evaluated in the
//! axis' own scalar type. The bounds are narrowed to that type first, so a
//! single-precision axis is exactly what a `float` computation over the same
//! constants would produce.

use crate::config::{BoundingBox, GridSpec};

/// Scalar types an axis can be computed in.
pub trait AxisScalar: Copy + PartialOrd + std::fmt::Debug + Send + Sync + 'static {
    fn from_f64(value: f64) -> Self;
    fn from_index(index: usize) -> Self;
    /// `min + (max - min) / n * i`, in `Self` arithmetic.
    fn lerp_step(min: Self, max: Self, n: Self, i: Self) -> Self;
}

impl AxisScalar for f32 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn from_index(index: usize) -> Self {
        index as f32
    }

    #[inline]
    fn lerp_step(min: f32, max: f32, n: f32, i: f32) -> f32 {
        min + (max - min) / n * i
    }
}

impl AxisScalar for f64 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn from_index(index: usize) -> Self {
        index as f64
    }

    #[inline]
    fn lerp_step(min: f64, max: f64, n: f64, i: f64) -> f64 {
        min + (max - min) / n * i
    }
}

/// Real (`x`) and imaginary (`y`) coordinate of every column and row.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisArrays<T> {
    x: Vec<T>,
    y: Vec<T>,
}

impl<T: AxisScalar> AxisArrays<T> {
    pub fn new(bounds: &BoundingBox, grid: GridSpec) -> Self {
        Self {
            x: axis(bounds.xmin, bounds.xmax, grid.nx),
            y: axis(bounds.ymin, bounds.ymax, grid.ny),
        }
    }
}

impl<T> AxisArrays<T> {
    /// Column coordinates, length `nx`.
    pub fn x(&self) -> &[T] {
        &self.x
    }

    /// Row coordinates, length `ny`.
    pub fn y(&self) -> &[T] {
        &self.y
    }

    /// Reassembles axes read back from an artifact.
    pub(crate) fn from_parts(x: Vec<T>, y: Vec<T>) -> Self {
        Self { x, y }
    }
}

fn axis<T: AxisScalar>(min: f64, max: f64, n: usize) -> Vec<T> {
    let (min, max) = (T::from_f64(min), T::from_f64(max));
    let count = T::from_index(n);
    (0..n)
        .map(|i| T::lerp_step(min, max, count, T::from_index(i)))
        .collect()
}
