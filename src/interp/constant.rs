use anyhow::Result;

use crate::grid::{GridVec, GriddedData};
use crate::point::Point;

use super::scalar::InterpScalar;
use super::InterpolationGrid;

/// Which bracketing grid line a piecewise-constant axis reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Left,
    Right,
}

/// Piecewise-constant interpolation: per axis, the sample snaps to the lower
/// (`Left`) or upper (`Right`) bracketing grid line and the stored value is
/// returned without blending.
#[derive(Debug, Clone)]
pub struct MulticonstantInterpolator {
    grid: InterpolationGrid,
    directions: GridVec<Direction>,
}

impl MulticonstantInterpolator {
    /// One direction per grid dimension is required.
    pub fn new(data: GriddedData, directions: &[Direction]) -> Result<Self> {
        let grid = InterpolationGrid::new(data)?;
        anyhow::ensure!(
            directions.len() == grid.dim(),
            "Expected {} direction entries (one per grid dimension), got {}",
            grid.dim(),
            directions.len()
        );
        Ok(Self {
            grid,
            directions: GridVec::from_slice(directions),
        })
    }

    /// Samples at a time and spatial point.
    pub fn value(&self, time: f64, point: Point) -> f64 {
        self.sample(time, [point.x, point.y, point.z])
    }

    /// Generic sampling core.
    ///
    /// A piecewise-constant function is flat almost everywhere, so a dual
    /// input comes back with zero derivatives.
    pub fn sample<T: InterpScalar>(&self, time: T, point: [T; 3]) -> T {
        let pt = self.grid.grid_point(time, point);
        let (lower, upper) = self.grid.neighbors(&pt);

        let mut indices = GridVec::new();
        for j in 0..pt.len() {
            let idx = match self.directions[j] {
                Direction::Left => lower[j],
                Direction::Right => upper[j],
            };
            indices.push(idx);
        }
        T::from_real(self.grid.data().value_at(&indices))
    }
}
