use anyhow::Result;

use crate::grid::{GridVec, GriddedData, MAX_GRID_DIM};
use crate::point::Point;

use super::scalar::InterpScalar;
use super::InterpolationGrid;

/// N-linear (hypercube) interpolation over the `2^dim` grid vertices
/// enclosing the sample point, with flat extrapolation beyond the grid.
///
/// An axis whose bracketing pair collapses (`lower == upper`: an exact grid
/// hit or a clamp outside the grid) contributes a vertex weight of `0.5` and
/// a volume factor of `1`. The two coincident vertices then each carry half
/// weight and average back to the single available value; the convention is
/// load-bearing, not cosmetic.
#[derive(Debug, Clone)]
pub struct MultilinearInterpolator {
    grid: InterpolationGrid,
}

impl MultilinearInterpolator {
    pub fn new(data: GriddedData) -> Result<Self> {
        Ok(Self {
            grid: InterpolationGrid::new(data)?,
        })
    }

    /// Samples at a time and spatial point.
    pub fn value(&self, time: f64, point: Point) -> f64 {
        self.sample(time, [point.x, point.y, point.z])
    }

    /// Generic sampling core, shared by the plain and dual-number paths.
    pub fn sample<T: InterpScalar>(&self, time: T, point: [T; 3]) -> T {
        let pt = self.grid.grid_point(time, point);
        let (lower, upper) = self.grid.neighbors(&pt);
        let data = self.grid.data();
        let dim = pt.len();

        let mut accum = T::zero();
        for corner in 0..(1usize << dim) {
            let mut weight = T::one();
            let mut indices = GridVec::new();
            for j in 0..dim {
                let use_upper = (corner >> j) & 1 == 1;
                indices.push(if use_upper { upper[j] } else { lower[j] });
                if lower[j] == upper[j] {
                    weight = weight * T::from_real(0.5);
                } else {
                    // Distance to the opposite grid line.
                    let opposite = if use_upper { lower[j] } else { upper[j] };
                    let edge = T::from_real(data.axis(j)[opposite]);
                    weight = weight * (pt[j] - edge).abs();
                }
            }
            accum = accum + T::from_real(data.value_at(&indices)) * weight;
        }

        accum / T::from_real(self.cell_volume(&lower, &upper))
    }

    /// Sample value together with the partial derivative along every grid
    /// dimension, from differentiating the vertex-weighted sum. The partial
    /// along a collapsed axis is zero (flat extrapolation, and an exact grid
    /// hit sits on a slope kink).
    pub fn sample_with_partials(&self, time: f64, point: Point) -> (f64, GridVec<f64>) {
        let pt = self.grid.grid_point(time, [point.x, point.y, point.z]);
        let (lower, upper) = self.grid.neighbors(&pt);
        let data = self.grid.data();
        let dim = pt.len();

        let mut value = 0.0;
        let mut partials: GridVec<f64> = GridVec::new();
        for _ in 0..dim {
            partials.push(0.0);
        }
        for corner in 0..(1usize << dim) {
            // Per-axis weight factors and the slope sign of each factor.
            let mut w = [1.0_f64; MAX_GRID_DIM];
            let mut slope = [0.0_f64; MAX_GRID_DIM];
            let mut indices = GridVec::new();
            for j in 0..dim {
                let use_upper = (corner >> j) & 1 == 1;
                indices.push(if use_upper { upper[j] } else { lower[j] });
                if lower[j] == upper[j] {
                    w[j] = 0.5;
                } else {
                    let opposite = if use_upper { lower[j] } else { upper[j] };
                    w[j] = (pt[j] - data.axis(j)[opposite]).abs();
                    slope[j] = if use_upper { 1.0 } else { -1.0 };
                }
            }

            let v = data.value_at(&indices);
            value += v * w[..dim].iter().product::<f64>();
            for k in 0..dim {
                if slope[k] == 0.0 {
                    continue;
                }
                let mut rest = 1.0;
                for (j, wj) in w[..dim].iter().enumerate() {
                    if j != k {
                        rest *= wj;
                    }
                }
                partials[k] += v * slope[k] * rest;
            }
        }

        let volume = self.cell_volume(&lower, &upper);
        value /= volume;
        for k in 0..dim {
            partials[k] /= volume;
        }
        (value, partials)
    }

    /// Spatial gradient, with grid-dimension partials routed back through the
    /// axis embedding. Spatial axes the grid does not cover contribute zero.
    pub fn gradient(&self, time: f64, point: Point) -> [f64; 3] {
        let (_, partials) = self.sample_with_partials(time, point);
        let mut grad = [0.0; 3];
        for (j, axis) in self.grid.data().embedding().iter().enumerate() {
            if !axis.is_time() {
                grad[axis.index()] = partials[j];
            }
        }
        grad
    }

    /// Partial derivative with respect to time; zero if no grid dimension
    /// embeds time.
    pub fn time_derivative(&self, time: f64, point: Point) -> f64 {
        let (_, partials) = self.sample_with_partials(time, point);
        for (j, axis) in self.grid.data().embedding().iter().enumerate() {
            if axis.is_time() {
                return partials[j];
            }
        }
        0.0
    }

    /// Hypercube volume of the bracketing cell; collapsed axes contribute a
    /// factor of 1 so their paired half-weight vertices average correctly.
    fn cell_volume(&self, lower: &GridVec<usize>, upper: &GridVec<usize>) -> f64 {
        let data = self.grid.data();
        let mut volume = 1.0;
        for j in 0..lower.len() {
            if lower[j] != upper[j] {
                let axis = data.axis(j);
                volume *= axis[upper[j]] - axis[lower[j]];
            }
        }
        volume
    }
}
