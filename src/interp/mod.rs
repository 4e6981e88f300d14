//! Interpolation of gridded data at simulation-space points.
//!
//! Two sampling policies share one validated base: a per-axis left/right
//! piecewise-constant lookup ([`MulticonstantInterpolator`]) and an N-linear
//! hypercube blend with derivatives ([`MultilinearInterpolator`]). Both are
//! generic over [`InterpScalar`], so the same algorithms run on plain reals
//! and on dual numbers for derivative propagation.

pub mod constant;
pub mod linear;
pub mod scalar;

pub use constant::{Direction, MulticonstantInterpolator};
pub use linear::MultilinearInterpolator;
pub use scalar::{Dual, InterpScalar};

use anyhow::Result;

use crate::grid::{GridAxis, GridVec, GriddedData, MAX_GRID_DIM};

/// Finds the grid-line pair bracketing `x` on a strictly increasing axis.
///
/// Returns `(lower, upper)` such that `axis[lower] < x <= axis[upper]`, with
/// boundary clamps:
/// - `x <= axis[0]` gives `(0, 0)`;
/// - `x >= axis[n-1]` gives `(n-1, n-1)`;
/// - an exact interior hit `axis[i] == x` gives `(i, i)`.
///
/// These collapsed pairs are what interpolation weights key off at grid lines
/// and outside the grid, so the special cases are part of the contract.
pub fn neighbor_indices(axis: &[f64], x: f64) -> (usize, usize) {
    let n = axis.len();
    debug_assert!(n > 0, "neighbor search on an empty axis");
    if x <= axis[0] {
        return (0, 0);
    }
    if x >= axis[n - 1] {
        return (n - 1, n - 1);
    }
    // First element not less than x; the clamps above keep it interior.
    let upper = axis.partition_point(|v| *v < x);
    if axis[upper] == x {
        (upper, upper)
    } else {
        (upper - 1, upper)
    }
}

/// A gridded-data store validated for interpolation.
///
/// Construction enforces the contracts the sampling policies rely on: every
/// axis strictly increasing, no two grid dimensions embedding the same
/// simulation coordinate, and the dimension bound of [`MAX_GRID_DIM`]. After
/// that, sampling is infallible.
#[derive(Debug, Clone)]
pub struct InterpolationGrid {
    data: GriddedData,
}

impl InterpolationGrid {
    pub fn new(data: GriddedData) -> Result<Self> {
        anyhow::ensure!(
            data.dim() <= MAX_GRID_DIM,
            "Interpolation supports at most {MAX_GRID_DIM} grid dimensions, got {}",
            data.dim()
        );

        for i in 0..data.dim() {
            let axis = data.axis(i);
            for k in 1..axis.len() {
                anyhow::ensure!(
                    axis[k] > axis[k - 1],
                    "Axis {i} is not strictly increasing: value {} at position {k} does not \
                     exceed its predecessor {}",
                    axis[k],
                    axis[k - 1]
                );
            }
        }

        let embedding = data.embedding();
        for i in 0..embedding.len() {
            for j in (i + 1)..embedding.len() {
                anyhow::ensure!(
                    embedding[i] != embedding[j],
                    "Axis embedding contains coordinate {} twice (axes {i} and {j})",
                    embedding[i]
                );
            }
        }

        Ok(Self { data })
    }

    pub fn data(&self) -> &GriddedData {
        &self.data
    }

    pub fn dim(&self) -> usize {
        self.data.dim()
    }

    /// Maps a simulation-space sample onto grid coordinates via the axis
    /// embedding: spatial dimensions pick the matching point component, a
    /// time dimension picks `time`.
    pub(crate) fn grid_point<T: InterpScalar>(&self, time: T, point: [T; 3]) -> GridVec<T> {
        let mut pt = GridVec::new();
        for axis in self.data.embedding() {
            let coord = match axis {
                GridAxis::X => point[0],
                GridAxis::Y => point[1],
                GridAxis::Z => point[2],
                GridAxis::T => time,
            };
            pt.push(coord);
        }
        pt
    }

    /// Bracketing grid-line indices for every grid coordinate of `pt`.
    pub(crate) fn neighbors<T: InterpScalar>(
        &self,
        pt: &GridVec<T>,
    ) -> (GridVec<usize>, GridVec<usize>) {
        let mut lower = GridVec::new();
        let mut upper = GridVec::new();
        for (j, coord) in pt.iter().enumerate() {
            let (lo, hi) = neighbor_indices(self.data.axis(j), coord.value());
            lower.push(lo);
            upper.push(hi);
        }
        (lower, upper)
    }
}
