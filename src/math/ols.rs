//! Linear least squares via SVD.
//!
//! The Levenberg–Marquardt loop solves one small damped system per trial step:
//!
//! ```text
//! minimize ‖J δ + r‖² + λ Σ_k D_kk δ_k²
//! ```
//!
//! which we stack into a single tall least-squares problem and hand to this
//! solver. SVD keeps the solve well-defined even when the Jacobian columns are
//! nearly collinear (e.g. a curve that is almost flat over the fit window, so
//! `K` and `B` trade off against each other).
//!
//! Nalgebra's `QR::solve` is intended for square systems and will panic for
//! non-square matrices, hence SVD.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-10, 1e-8] {
        if let Ok(x) = svd.solve(rhs, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_overdetermined_line() {
        // y = 2 + 3x on x = [0,1,2]
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let rhs = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let x = solve_least_squares(&a, &rhs).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-10);
        assert!((x[1] - 3.0).abs() < 1e-10);
    }
}
