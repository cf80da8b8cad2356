//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `Σ r_i(p)²` for a residual vector supplied by a
//! [`LeastSquaresProblem`]. Each iteration solves the damped Gauss–Newton
//! system
//!
//! ```text
//! (JᵀJ + λ diag(JᵀJ)) δ = -Jᵀ r
//! ```
//!
//! as a stacked least-squares problem (see [`solve_least_squares`]), accepts
//! the step when it lowers the cost, and adapts `λ` by factors of ten.
//!
//! Convergence is declared when any of these hold:
//! - the cost is exactly zero
//! - every Jacobian column is within `gtol` of orthogonal to `r`, measured as
//!   `|J_kᵀ r| / (‖J_k‖ ‖r‖)` so the test does not depend on the data scale
//! - an accepted step reduces the cost by less than `ftol` relative
//! - the step is below `xtol` relative to the parameter norm
//!
//! On success the covariance of the parameters is estimated as
//! `s² (JᵀJ)⁻¹` with `s² = cost / (n - m)` (undefined when `n <= m`).

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::math::solve_least_squares;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_MAX: f64 = 1e16;
/// Floor for damping weights, relative to the largest `JᵀJ` diagonal entry.
const DIAG_FLOOR: f64 = 1e-12;

/// A residual function with an optional analytic Jacobian.
pub trait LeastSquaresProblem {
    /// Residual vector at `params`.
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;

    /// Jacobian `∂r_i/∂p_k`. Defaults to forward differences.
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        let r0 = self.residuals(params);
        let mut jac = DMatrix::zeros(r0.len(), params.len());
        for k in 0..params.len() {
            let step = f64::EPSILON.sqrt() * params[k].abs().max(1.0);
            let mut shifted = params.clone();
            shifted[k] += step;
            let r1 = self.residuals(&shifted);
            jac.set_column(k, &((r1 - &r0) / step));
        }
        jac
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-14,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: DVector<f64>,
    pub residuals: DVector<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub iterations: usize,
    pub covariance: Option<DMatrix<f64>>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LmError {
    #[error("{samples} residuals cannot determine {params} parameters")]
    Underdetermined { samples: usize, params: usize },
    #[error("non-finite residuals at iteration {iteration}")]
    NonFinite { iteration: usize },
    #[error("damped step could not be solved at iteration {iteration}")]
    SingularStep { iteration: usize },
    #[error("no cost-reducing step found at iteration {iteration} (damping exhausted)")]
    Stalled { iteration: usize },
    #[error("did not converge within {0} iterations")]
    MaxIterations(usize),
}

pub fn minimize<P: LeastSquaresProblem>(
    problem: &P,
    initial: DVector<f64>,
    opts: &LmOptions,
) -> Result<LmReport, LmError> {
    let m = initial.len();
    let mut p = initial;
    let mut r = problem.residuals(&p);
    let n = r.len();
    if n < m {
        return Err(LmError::Underdetermined { samples: n, params: m });
    }
    if !r.iter().all(|v| v.is_finite()) {
        return Err(LmError::NonFinite { iteration: 0 });
    }

    let mut cost = r.norm_squared();
    let mut lambda = LAMBDA_INIT;

    for iteration in 1..=opts.max_iterations {
        let jac = problem.jacobian(&p);
        if cost == 0.0 || gradient_cosine(&jac, &r) <= opts.gtol {
            return Ok(finish(problem, p, r, cost, iteration - 1));
        }
        let jtj = jac.transpose() * &jac;
        let largest = (0..m).map(|k| jtj[(k, k)]).fold(0.0, f64::max);
        let floor = if largest > 0.0 { largest * DIAG_FLOOR } else { 1.0 };
        let diag: Vec<f64> = (0..m).map(|k| jtj[(k, k)].max(floor)).collect();

        loop {
            let mut a = DMatrix::zeros(n + m, m);
            a.rows_mut(0, n).copy_from(&jac);
            for k in 0..m {
                a[(n + k, k)] = (lambda * diag[k]).sqrt();
            }
            let mut rhs = DVector::zeros(n + m);
            rhs.rows_mut(0, n).copy_from(&(-&r));

            let step = solve_least_squares(&a, &rhs).ok_or(LmError::SingularStep { iteration })?;
            let small_step = step.norm() <= opts.xtol * (p.norm() + opts.xtol);

            let trial = &p + &step;
            let r_trial = problem.residuals(&trial);
            let cost_trial = if r_trial.iter().all(|v| v.is_finite()) {
                r_trial.norm_squared()
            } else {
                f64::INFINITY
            };

            if cost_trial < cost {
                let reduction = (cost - cost_trial) / cost;
                p = trial;
                r = r_trial;
                cost = cost_trial;
                lambda = (lambda * 0.1).max(LAMBDA_MIN);
                if reduction <= opts.ftol || small_step {
                    return Ok(finish(problem, p, r, cost, iteration));
                }
                break;
            }

            // Already at the minimum to working precision.
            if small_step {
                return Ok(finish(problem, p, r, cost, iteration));
            }
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                return Err(LmError::Stalled { iteration });
            }
        }
    }

    Err(LmError::MaxIterations(opts.max_iterations))
}

/// Largest `|J_kᵀ r| / (‖J_k‖ ‖r‖)` over the Jacobian columns.
fn gradient_cosine(jac: &DMatrix<f64>, r: &DVector<f64>) -> f64 {
    let r_norm = r.norm();
    if r_norm == 0.0 {
        return 0.0;
    }
    jac.column_iter()
        .map(|col| {
            let col_norm = col.norm();
            if col_norm == 0.0 { 0.0 } else { col.dot(r).abs() / (col_norm * r_norm) }
        })
        .fold(0.0, f64::max)
}

fn finish<P: LeastSquaresProblem>(
    problem: &P,
    params: DVector<f64>,
    residuals: DVector<f64>,
    cost: f64,
    iterations: usize,
) -> LmReport {
    let n = residuals.len();
    let m = params.len();
    let covariance = if n > m {
        let jac = problem.jacobian(&params);
        (jac.transpose() * &jac)
            .try_inverse()
            .map(|inv| inv * (cost / (n - m) as f64))
            .filter(|cov| cov.iter().all(|v| v.is_finite()))
    } else {
        None
    };

    LmReport {
        params,
        residuals,
        cost,
        iterations,
        covariance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y = a * exp(-b x)
    struct ExpDecay {
        x: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquaresProblem for ExpDecay {
        fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
            DVector::from_iterator(
                self.x.len(),
                self.x
                    .iter()
                    .zip(self.y.iter())
                    .map(|(&x, &y)| y - p[0] * (-p[1] * x).exp()),
            )
        }
    }

    #[test]
    fn recovers_exponential_with_numeric_jacobian() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 * 0.2).collect();
        let y: Vec<f64> = x.iter().map(|&v| 3.0 * (-0.7 * v).exp()).collect();
        let problem = ExpDecay { x, y };

        let report = minimize(&problem, DVector::from_vec(vec![1.0, 0.1]), &LmOptions::default()).unwrap();
        assert!((report.params[0] - 3.0).abs() < 1e-6, "{:?}", report.params);
        assert!((report.params[1] - 0.7).abs() < 1e-6, "{:?}", report.params);
        assert!(report.cost < 1e-12);
    }

    #[test]
    fn covariance_scales_with_residual_variance() {
        // Straight line with alternating noise; covariance must be finite and positive.
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, &v)| 2.0 * v + 1.0 + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        struct Line(Vec<f64>, Vec<f64>);
        impl LeastSquaresProblem for Line {
            fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
                DVector::from_iterator(
                    self.0.len(),
                    self.0.iter().zip(self.1.iter()).map(|(&x, &y)| y - (p[0] * x + p[1])),
                )
            }
        }

        let report = minimize(&Line(x, y), DVector::from_vec(vec![0.0, 0.0]), &LmOptions::default()).unwrap();
        let cov = report.covariance.unwrap();
        assert!(cov[(0, 0)] > 0.0 && cov[(1, 1)] > 0.0);
    }

    #[test]
    fn convergence_does_not_depend_on_data_scale() {
        // y = 3 x at 1e-9 magnitude: gradients start far below any absolute tolerance.
        struct Scale(Vec<f64>, Vec<f64>);
        impl LeastSquaresProblem for Scale {
            fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
                DVector::from_iterator(self.0.len(), self.0.iter().zip(self.1.iter()).map(|(&x, &y)| y - p[0] * x))
            }
        }
        let x: Vec<f64> = (1..=30).map(|i| 1e-9 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v).collect();

        let report = minimize(&Scale(x, y), DVector::from_vec(vec![0.1]), &LmOptions::default()).unwrap();
        assert!((report.params[0] - 3.0).abs() < 1e-8, "{:?}", report.params);
        assert!(report.iterations > 1);
    }

    #[test]
    fn gradient_cosine_is_scale_free() {
        let jac = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        let r = DVector::from_vec(vec![2.0, 4.0, 6.0]);
        assert!((gradient_cosine(&jac, &r) - 1.0).abs() < 1e-12);
        assert!((gradient_cosine(&(jac * 1e-12), &(r * 1e-9)) - 1.0).abs() < 1e-12);
        let orthogonal = DVector::from_vec(vec![2.0, -1.0, 0.0]);
        assert_eq!(gradient_cosine(&DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]), &orthogonal), 0.0);
    }

    #[test]
    fn rejects_underdetermined_problem() {
        let problem = ExpDecay {
            x: vec![1.0],
            y: vec![2.0],
        };
        let err = minimize(&problem, DVector::from_vec(vec![1.0, 1.0]), &LmOptions::default()).unwrap_err();
        assert_eq!(err, LmError::Underdetermined { samples: 1, params: 2 });
    }

    #[test]
    fn iteration_limit_is_reported() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 * 0.2).collect();
        let y: Vec<f64> = x.iter().map(|&v| 3.0 * (-0.7 * v).exp()).collect();
        let opts = LmOptions {
            max_iterations: 1,
            ..LmOptions::default()
        };
        let err = minimize(&ExpDecay { x, y }, DVector::from_vec(vec![1.0, 0.1]), &opts).unwrap_err();
        assert_eq!(err, LmError::MaxIterations(1));
    }
}
