use anyhow::Result;

/// Solves a dense linear system `A * x = b` using Gaussian elimination with
/// partial pivoting. `a` is row-major `n x n`; both inputs are consumed as
/// scratch space.
///
/// Radiosity systems have one row per surface, so a direct solve keeps the
/// dependency surface small and deterministic.
pub(crate) fn solve_dense(a: &mut [f64], b: &mut [f64]) -> Result<Vec<f64>> {
    let n = b.len();
    anyhow::ensure!(
        a.len() == n * n,
        "Matrix shape mismatch: {} entries for {n} rows",
        a.len()
    );
    if n == 0 {
        return Ok(vec![]);
    }

    // Forward elimination
    for col in 0..n {
        // Pivot selection
        let mut pivot_row = col;
        let mut pivot_val = a[col * n + col].abs();
        for r in (col + 1)..n {
            let v = a[r * n + col].abs();
            if v > pivot_val {
                pivot_val = v;
                pivot_row = r;
            }
        }

        anyhow::ensure!(
            pivot_val > 1e-14,
            "Singular system (pivot too small) at column {col}"
        );

        if pivot_row != col {
            for c in 0..n {
                a.swap(pivot_row * n + c, col * n + c);
            }
            b.swap(pivot_row, col);
        }

        let pivot = a[col * n + col];
        for r in (col + 1)..n {
            let factor = a[r * n + col] / pivot;
            if factor == 0.0 {
                continue;
            }
            a[r * n + col] = 0.0;
            for c in (col + 1)..n {
                a[r * n + c] -= factor * a[col * n + c];
            }
            b[r] -= factor * b[col];
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut rhs = b[i];
        for j in (i + 1)..n {
            rhs -= a[i * n + j] * x[j];
        }
        x[i] = rhs / a[i * n + i];
    }

    // Reject NaNs/Infs early rather than letting them poison the queries.
    for (i, xi) in x.iter().enumerate() {
        anyhow::ensure!(xi.is_finite(), "Non-finite solution at index {i}: {xi}");
    }

    Ok(x)
}
