use anyhow::Result;

/// Allowed deviation of a view-factor row sum from unity before the matrix
/// is rejected as inconsistent.
pub const ROW_SUM_TOLERANCE: f64 = 0.05;

/// Row-major `n x n` view-factor matrix: `get(i, j)` is the fraction of
/// diffuse radiation leaving surface `i` that directly reaches surface `j`.
#[derive(Debug, Clone)]
pub struct ViewFactorMatrix {
    n: usize,
    /// Row-major F_ij entries [i*n + j].
    f: Vec<f64>,
}

impl ViewFactorMatrix {
    /// Builds a matrix from rows, checking squareness.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        let mut f = Vec::with_capacity(n * n);
        for (i, row) in rows.iter().enumerate() {
            anyhow::ensure!(
                row.len() == n,
                "View-factor matrix is not square: row {i} has {} entries, expected {n}",
                row.len()
            );
            f.extend_from_slice(row);
        }
        Ok(Self { n, f })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.f[i * self.n + j]
    }

    /// Sum of row `i`.
    pub fn row_sum(&self, i: usize) -> f64 {
        self.f[i * self.n..(i + 1) * self.n].iter().sum()
    }

    /// Scales every entry of row `i`.
    fn scale_row(&mut self, i: usize, scale: f64) {
        for v in &mut self.f[i * self.n..(i + 1) * self.n] {
            *v *= scale;
        }
    }
}

/// Strategy supplying the view-factor matrix for a radiation network.
///
/// View factors may come from user input, from a ray-tracing study, or from
/// analytic formulas; the network only requires that the matrix match its
/// surface count.
pub trait ViewFactorSource {
    fn view_factors(&self, n_surfaces: usize) -> Result<ViewFactorMatrix>;
}

/// A fixed, user-supplied view-factor matrix.
///
/// In an enclosure every row must sum to 1. User input rarely does so
/// exactly, so rows within [`ROW_SUM_TOLERANCE`] of unity are renormalized
/// (with a warning); rows beyond it are rejected. Normalization can be
/// switched off for matrices that are consistent by construction.
pub struct ConstantViewFactors {
    rows: Vec<Vec<f64>>,
    normalize: bool,
}

impl ConstantViewFactors {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self {
            rows,
            normalize: true,
        }
    }

    /// Keeps the supplied rows untouched (only squareness is checked).
    pub fn without_normalization(rows: Vec<Vec<f64>>) -> Self {
        Self {
            rows,
            normalize: false,
        }
    }
}

impl ViewFactorSource for ConstantViewFactors {
    fn view_factors(&self, n_surfaces: usize) -> Result<ViewFactorMatrix> {
        anyhow::ensure!(
            self.rows.len() == n_surfaces,
            "View-factor matrix has {} rows but the network has {n_surfaces} surfaces",
            self.rows.len()
        );
        let mut matrix = ViewFactorMatrix::from_rows(&self.rows)?;

        if self.normalize {
            for i in 0..matrix.n() {
                let sum = matrix.row_sum(i);
                anyhow::ensure!(
                    (sum - 1.0).abs() <= ROW_SUM_TOLERANCE,
                    "View-factor row {i} sums to {sum:.6}, deviating more than {:.0}% from 1",
                    ROW_SUM_TOLERANCE * 100.0
                );
                if (sum - 1.0).abs() > 1e-12 {
                    log::warn!("normalizing view-factor row {i}: sum was {sum:.6}");
                    matrix.scale_row(i, 1.0 / sum);
                }
            }
        }

        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_rows_pass_through() {
        let source = ConstantViewFactors::new(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        let m = source.view_factors(2).unwrap();
        assert_eq!(m.get(0, 1), 1.0);
        assert_eq!(m.get(1, 0), 1.0);
        assert_eq!(m.get(0, 0), 0.0);
    }

    #[test]
    fn test_rows_within_tolerance_are_normalized() {
        let source = ConstantViewFactors::new(vec![
            vec![0.0, 0.49, 0.49],
            vec![0.51, 0.0, 0.51],
            vec![0.5, 0.5, 0.0],
        ]);
        let m = source.view_factors(3).unwrap();
        for i in 0..3 {
            assert!(
                (m.row_sum(i) - 1.0).abs() < 1e-12,
                "row {i} sum = {}",
                m.row_sum(i)
            );
        }
        // Relative proportions within a row are preserved.
        assert!((m.get(0, 1) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rows_beyond_tolerance_rejected() {
        let source = ConstantViewFactors::new(vec![vec![0.0, 0.9], vec![1.0, 0.0]]);
        let err = source.view_factors(2).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("row 0"), "unexpected error: {msg}");
    }

    #[test]
    fn test_non_square_rejected() {
        let source = ConstantViewFactors::new(vec![vec![0.0, 1.0], vec![1.0]]);
        assert!(source.view_factors(2).is_err());
    }

    #[test]
    fn test_surface_count_mismatch_rejected() {
        let source = ConstantViewFactors::new(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert!(source.view_factors(3).is_err());
    }

    #[test]
    fn test_without_normalization_keeps_rows() {
        let source = ConstantViewFactors::without_normalization(vec![
            vec![0.0, 0.7],
            vec![0.7, 0.0],
        ]);
        let m = source.view_factors(2).unwrap();
        assert_eq!(m.get(0, 1), 0.7, "rows kept as supplied");
    }
}
