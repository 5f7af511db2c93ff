//! Dense linear algebra on row-major `Vec<Vec<f64>>` matrices.

const PIVOT_EPSILON: f64 = 1e-12;

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` when the system is (numerically) singular.
pub fn solve(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    let mut m: Vec<Vec<f64>> = a
        .iter()
        .zip(b.iter())
        .map(|(row, &rhs)| {
            let mut r = row.clone();
            r.push(rhs);
            r
        })
        .collect();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))?;
        if m[pivot][col].abs() < PIVOT_EPSILON {
            return None;
        }
        m.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| m[row][k] * x[k]).sum();
        x[row] = (m[row][n] - tail) / m[row][row];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Invert a square matrix by Gauss-Jordan elimination.
pub fn invert(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut columns = Vec::with_capacity(n);
    for j in 0..n {
        let mut e = vec![0.0; n];
        e[j] = 1.0;
        columns.push(solve(a, &e)?);
    }
    Some(
        (0..n)
            .map(|i| (0..n).map(|j| columns[j][i]).collect())
            .collect(),
    )
}

/// Ordinary (optionally ridge-penalized) least squares fit.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    pub coefficients: Vec<f64>,
    /// Residual sum of squares
    pub rss: f64,
    /// `(X'X + diag(penalty))^-1`
    pub covariance: Vec<Vec<f64>>,
    pub observations: usize,
}

impl LeastSquares {
    /// Fit `y ~ X b`.
    pub fn fit(rows: &[Vec<f64>], y: &[f64]) -> Option<Self> {
        let k = rows.first().map(|r| r.len()).unwrap_or(0);
        Self::fit_penalized(rows, y, &vec![0.0; k])
    }

    /// Fit `y ~ X b` minimizing `|y - Xb|^2 + sum(penalty_j * b_j^2)`.
    pub fn fit_penalized(rows: &[Vec<f64>], y: &[f64], penalty: &[f64]) -> Option<Self> {
        let k = penalty.len();
        if rows.is_empty() || rows.len() != y.len() || rows.iter().any(|r| r.len() != k) {
            return None;
        }

        let mut xtx = vec![vec![0.0; k]; k];
        let mut xty = vec![0.0; k];
        for (row, &target) in rows.iter().zip(y.iter()) {
            for i in 0..k {
                xty[i] += row[i] * target;
                for j in i..k {
                    xtx[i][j] += row[i] * row[j];
                }
            }
        }
        for i in 0..k {
            xtx[i][i] += penalty[i];
            for j in 0..i {
                xtx[i][j] = xtx[j][i];
            }
        }

        let coefficients = solve(&xtx, &xty)?;
        let covariance = invert(&xtx)?;
        let rss = rows
            .iter()
            .zip(y.iter())
            .map(|(row, &target)| {
                let fitted: f64 = row.iter().zip(coefficients.iter()).map(|(x, b)| x * b).sum();
                (target - fitted).powi(2)
            })
            .sum();

        Some(Self {
            coefficients,
            rss,
            covariance,
            observations: rows.len(),
        })
    }

    /// Standard error of coefficient `j`, using `rss / (n - k)` as the noise variance.
    pub fn standard_error(&self, j: usize) -> Option<f64> {
        let dof = self.observations.checked_sub(self.coefficients.len())?;
        if dof == 0 {
            return None;
        }
        let s2 = self.rss / dof as f64;
        let var = s2 * self.covariance.get(j)?.get(j)?;
        if var > 0.0 && var.is_finite() {
            Some(var.sqrt())
        } else {
            None
        }
    }
}
