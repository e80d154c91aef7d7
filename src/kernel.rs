//! Escape-time kernels: z_{n+1} = z_n² + c, where c = (x, y).
//!
//! For each coordinate the kernel iterates from z_0 = 0 and reports the first
//! `n` at which |z_n| > 2. Points that stay bounded for `max_iterations`
//! steps are reported as `max_iterations` ("did not diverge").
//!
//! There is one kernel per precision. They are deliberately written out
//! twice rather than shared through a generic: near the boundary of the set
//! the two representations diverge at different steps, and each variant has
//! to be testable on its own terms.
//!
//! Both kernels are pure: no allocation, no shared state, no early exit other
//! than the escape test itself. Calling them from any number of threads at
//! once is fine.

/// Default iteration bound `M`.
pub const MAX_ITERATIONS: u32 = 256;

/// Escape radius squared. |z| > 2 is tested as |z|² > 4.
const ESCAPE_RADIUS_SQ_F32: f32 = 4.0;
const ESCAPE_RADIUS_SQ_F64: f64 = 4.0;

/// Single-precision escape time of c = x + iy.
///
/// Returns the smallest `n` in `1..=max_iterations` with |z_n| > 2, or
/// `max_iterations` if there is none.
#[inline]
pub fn escape_time_f32(x: f32, y: f32, max_iterations: u32) -> u32 {
    let mut zr = 0.0f32;
    let mut zi = 0.0f32;

    for n in 1..=max_iterations {
        // z² = (zr² - zi²) + i(2·zr·zi)
        let zr_sq = zr * zr;
        let zi_sq = zi * zi;
        let next_zi = 2.0 * zr * zi + y;
        zr = zr_sq - zi_sq + x;
        zi = next_zi;

        if zr * zr + zi * zi > ESCAPE_RADIUS_SQ_F32 {
            return n;
        }
    }

    max_iterations
}

/// Double-precision escape time of c = x + iy.
///
/// Same contract as [`escape_time_f32`], evaluated in `f64` throughout.
#[inline]
pub fn escape_time_f64(x: f64, y: f64, max_iterations: u32) -> u32 {
    let mut zr = 0.0f64;
    let mut zi = 0.0f64;

    for n in 1..=max_iterations {
        let zr_sq = zr * zr;
        let zi_sq = zi * zi;
        let next_zi = 2.0 * zr * zi + y;
        zr = zr_sq - zi_sq + x;
        zi = next_zi;

        if zr * zr + zi * zi > ESCAPE_RADIUS_SQ_F64 {
            return n;
        }
    }

    max_iterations
}
