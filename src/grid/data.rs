use std::path::Path;

use anyhow::{Context, Result};

use super::axis::{GridAxis, GridVec};

/// An N-dimensional rectilinear grid with one function value per grid point.
///
/// Values are stored flat, with axis 0 varying fastest:
/// `flat(i0, i1, ...) = i0 + i1*N0 + i2*N0*N1 + ...` where `Nk` is the size
/// of axis `k`. The store is immutable after construction.
///
/// Axis monotonicity and embedding uniqueness are contracts of the
/// interpolation layer, not of the store itself: the parser keeps axis values
/// in file order and accepts any embedding sequence.
#[derive(Debug, Clone)]
pub struct GriddedData {
    embedding: Vec<GridAxis>,
    axes: Vec<Vec<f64>>,
    values: Vec<f64>,
    /// Per-axis strides into `values`; `step[0] = 1`.
    step: Vec<usize>,
}

impl GriddedData {
    /// Reads and parses a grid file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read grid file {}", path.display()))?;
        Self::from_text(&content)
            .with_context(|| format!("Cannot parse grid file {}", path.display()))
    }

    /// Parses the line-oriented grid format.
    ///
    /// Lines starting with `#` and blank lines are skipped. A line exactly
    /// matching `AXIS X`, `AXIS Y`, `AXIS Z` or `AXIS T` declares a new grid
    /// dimension; the next significant line must hold that axis' values as
    /// whitespace-separated reals. A line exactly equal to `DATA` switches to
    /// value mode, after which every significant line contributes function
    /// values in file order. Unrecognized lines outside these states are
    /// ignored.
    pub fn from_text(content: &str) -> Result<Self> {
        let mut embedding: Vec<GridAxis> = Vec::new();
        let mut axes: Vec<Vec<f64>> = Vec::new();
        let mut values: Vec<f64> = Vec::new();

        // The line after an AXIS declaration defines that axis.
        let mut pending_axis = false;
        let mut reading_data = false;

        for (idx, raw) in content.lines().enumerate() {
            let lineno = idx + 1;
            if raw.starts_with('#') {
                continue;
            }
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if pending_axis {
                let axis = parse_reals(line, lineno)
                    .context("Expected axis values after AXIS declaration")?;
                axes.push(axis);
                pending_axis = false;
                continue;
            }

            if let Some(label) = line.strip_prefix("AXIS ") {
                if let Some(axis) = GridAxis::from_label(label) {
                    embedding.push(axis);
                    pending_axis = true;
                    continue;
                }
            }

            if line == "DATA" {
                reading_data = true;
                continue;
            }

            if reading_data {
                values.extend(parse_reals(line, lineno)?);
                continue;
            }

            // Anything else is tolerated; the size check below catches real damage.
        }

        if pending_axis {
            anyhow::bail!("AXIS declaration at end of input without axis values");
        }

        log::debug!(
            "parsed grid: {} axes, {} function values",
            axes.len(),
            values.len()
        );

        Self::from_parts(embedding, axes, values)
    }

    /// Builds a grid from in-memory arrays.
    ///
    /// This is the construction path for data-source-driven grids that are
    /// refreshed per setup cycle instead of parsed from a file. Validation is
    /// identical to the file path.
    pub fn from_parts(
        embedding: Vec<GridAxis>,
        axes: Vec<Vec<f64>>,
        values: Vec<f64>,
    ) -> Result<Self> {
        anyhow::ensure!(
            embedding.len() == axes.len(),
            "Axis embedding has {} entries but {} axes were supplied",
            embedding.len(),
            axes.len()
        );
        anyhow::ensure!(!axes.is_empty(), "No valid AXIS lines found");
        for (i, axis) in axes.iter().enumerate() {
            anyhow::ensure!(!axis.is_empty(), "Axis {i} has zero length");
        }

        let num_points: usize = axes.iter().map(|a| a.len()).product();
        anyhow::ensure!(
            num_points == values.len(),
            "Product of axis sizes is {num_points} but {} function values were provided",
            values.len()
        );

        let mut step = Vec::with_capacity(axes.len());
        step.push(1);
        for k in 1..axes.len() {
            step.push(step[k - 1] * axes[k - 1].len());
        }

        Ok(Self {
            embedding,
            axes,
            values,
            step,
        })
    }

    /// Number of grid dimensions.
    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    /// Values of axis `i`, in declaration order.
    pub fn axis(&self, i: usize) -> &[f64] {
        &self.axes[i]
    }

    /// Number of grid points along axis `i`.
    pub fn axis_len(&self, i: usize) -> usize {
        self.axes[i].len()
    }

    /// The simulation coordinate each grid dimension corresponds to.
    pub fn embedding(&self) -> &[GridAxis] {
        &self.embedding
    }

    /// Total number of stored function values.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Returns the function value at a multi-index.
    ///
    /// The index vector length must equal [`Self::dim`], and the linearized
    /// flat index must be in range of the stored values; either violation is
    /// an error, not a silent default.
    pub fn value(&self, indices: &[usize]) -> Result<f64> {
        anyhow::ensure!(
            indices.len() == self.dim(),
            "Expected {} grid indices, got {}",
            self.dim(),
            indices.len()
        );
        let flat: usize = indices.iter().zip(&self.step).map(|(i, s)| i * s).sum();
        anyhow::ensure!(
            flat < self.values.len(),
            "Flat index {flat} out of range: only {} function values stored",
            self.values.len()
        );
        Ok(self.values[flat])
    }

    /// Value lookup for interpolators that have already validated the grid.
    ///
    /// Indices must come from a neighbor search against this grid's axes, so
    /// the flat index is in range by construction.
    pub(crate) fn value_at(&self, indices: &GridVec<usize>) -> f64 {
        debug_assert_eq!(indices.len(), self.dim());
        let flat: usize = indices
            .iter()
            .zip(&self.step)
            .map(|(i, s)| i * s)
            .sum();
        self.values[flat]
    }
}

fn parse_reals(line: &str, lineno: usize) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .with_context(|| format!("Invalid real number '{tok}' at line {lineno}"))
        })
        .collect()
}
