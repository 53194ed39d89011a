//! Linear least squares used to estimate lag coefficients

use crate::{MathError, Result};

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
pub fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "Expected a {}x{} system matrix",
            n, n
        )));
    }

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);

        if a[pivot][col].abs() < 1e-12 {
            return Err(MathError::CalculationError(
                "Singular system: coefficients cannot be estimated".to_string(),
            ));
        }

        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    Ok(x)
}

/// Ridge-regularised least squares: minimise `|X b - y|^2 + ridge * |b|^2`.
///
/// Each entry of `rows` is one observation's regressors.
pub fn least_squares(rows: &[Vec<f64>], target: &[f64], ridge: f64) -> Result<Vec<f64>> {
    if rows.is_empty() {
        return Err(MathError::InsufficientData(
            "No observations for regression".to_string(),
        ));
    }
    if rows.len() != target.len() {
        return Err(MathError::InvalidInput(format!(
            "Regressor rows ({}) don't match targets ({})",
            rows.len(),
            target.len()
        )));
    }
    if ridge < 0.0 {
        return Err(MathError::InvalidInput(
            "Ridge penalty must be non-negative".to_string(),
        ));
    }

    let k = rows[0].len();
    if k == 0 || rows.iter().any(|row| row.len() != k) {
        return Err(MathError::InvalidInput(
            "Every observation needs the same non-zero number of regressors".to_string(),
        ));
    }
    if rows.len() < k {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} observations for {} coefficients, got {}",
            k,
            k,
            rows.len()
        )));
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &y) in rows.iter().zip(target.iter()) {
        for i in 0..k {
            xty[i] += row[i] * y;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, diagonal) in xtx.iter_mut().enumerate() {
        diagonal[i] += ridge;
    }

    solve_linear_system(xtx, xty)
}
