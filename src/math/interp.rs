//! Quadratic spline interpolation.
//!
//! The interpolant is a degree-2 B-spline
//!
//! ```text
//! S(x) = Σ_j c_j B_j(x)
//! ```
//!
//! on the knot vector
//!
//! ```text
//! [x_0, x_0, x_0, m_1, ..., m_{n-3}, x_{n-1}, x_{n-1}, x_{n-1}]
//! ```
//!
//! where `m_i = (x_i + x_{i+1}) / 2`. Knots sit between the data sites, so the
//! collocation matrix `B_j(x_i)` is tridiagonal and diagonally dominant. A
//! local disturbance (one noisy sample) therefore decays geometrically with
//! distance instead of ringing along the whole curve. Quadratics lie in the
//! spline space, so linear and parabolic data are reproduced exactly.
//!
//! Evaluation outside `[x_0, x_{n-1}]` is refused rather than extrapolated.

use thiserror::Error;

/// Minimum sample count for a quadratic interpolant.
pub const MIN_POINTS: usize = 3;

const DEGREE: usize = 2;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpError {
    #[error("x and y lengths differ ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },
    #[error("need at least {MIN_POINTS} samples for quadratic interpolation, got {0}")]
    TooFewPoints(usize),
    #[error("x must be finite and strictly ascending (index {0})")]
    NotAscending(usize),
    #[error("y must be finite (index {0})")]
    NonFinite(usize),
    #[error("collocation system is singular at row {0}")]
    Singular(usize),
}

#[derive(Debug, Clone)]
pub struct QuadraticSpline {
    knots: Vec<f64>,
    coeffs: Vec<f64>,
}

impl QuadraticSpline {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, InterpError> {
        if x.len() != y.len() {
            return Err(InterpError::LengthMismatch { x: x.len(), y: y.len() });
        }
        let n = x.len();
        if n < MIN_POINTS {
            return Err(InterpError::TooFewPoints(n));
        }
        for i in 0..n {
            if !x[i].is_finite() || (i > 0 && x[i] <= x[i - 1]) {
                return Err(InterpError::NotAscending(i));
            }
            if !y[i].is_finite() {
                return Err(InterpError::NonFinite(i));
            }
        }

        let mut knots = Vec::with_capacity(n + DEGREE + 1);
        knots.extend([x[0]; DEGREE + 1]);
        knots.extend((1..n - 2).map(|i| 0.5 * (x[i] + x[i + 1])));
        knots.extend([x[n - 1]; DEGREE + 1]);

        // Row i holds B_{i-1}, B_i, B_{i+1} at x_i.
        let mut sub = vec![0.0; n];
        let mut diag = vec![0.0; n];
        let mut sup = vec![0.0; n];
        for (i, &xi) in x.iter().enumerate() {
            let span = find_span(&knots, n, xi);
            let basis = basis_functions(&knots, span, xi);
            for (r, value) in basis.into_iter().enumerate() {
                let col = span - DEGREE + r;
                if col + 1 == i {
                    sub[i] = value;
                } else if col == i {
                    diag[i] = value;
                } else if col == i + 1 {
                    sup[i] = value;
                } else if value != 0.0 {
                    return Err(InterpError::Singular(i));
                }
            }
        }

        let coeffs = solve_tridiagonal(&sub, &diag, &sup, y)?;
        Ok(Self { knots, coeffs })
    }

    /// Closed interval on which the spline may be evaluated.
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[0], self.knots[self.knots.len() - 1])
    }

    /// Evaluate at `t`; `None` outside the domain.
    pub fn eval(&self, t: f64) -> Option<f64> {
        let (lo, hi) = self.domain();
        if !(t >= lo && t <= hi) {
            return None;
        }
        let span = find_span(&self.knots, self.coeffs.len(), t);
        let basis = basis_functions(&self.knots, span, t);
        Some(
            basis
                .iter()
                .enumerate()
                .map(|(r, b)| b * self.coeffs[span - DEGREE + r])
                .sum(),
        )
    }

    /// Evaluate at every `t`; `None` if any lies outside the domain.
    pub fn eval_many(&self, ts: &[f64]) -> Option<Vec<f64>> {
        ts.iter().map(|&t| self.eval(t)).collect()
    }
}

/// Index `l` of the knot interval `[t_l, t_{l+1})` holding `t`, clamped so the
/// right end of the domain falls in the last non-empty interval.
fn find_span(knots: &[f64], n_coeffs: usize, t: f64) -> usize {
    knots
        .partition_point(|&k| k <= t)
        .saturating_sub(1)
        .clamp(DEGREE, n_coeffs - 1)
}

/// Non-zero basis values `B_{l-2}, B_{l-1}, B_l` at `t` (Cox–de Boor).
fn basis_functions(knots: &[f64], span: usize, t: f64) -> [f64; DEGREE + 1] {
    let mut n = [0.0; DEGREE + 1];
    let mut left = [0.0; DEGREE + 1];
    let mut right = [0.0; DEGREE + 1];
    n[0] = 1.0;
    for j in 1..=DEGREE {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = n[r] / (right[r + 1] + left[j - r]);
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }
    n
}

/// Thomas algorithm; `sub[0]` and `sup[n-1]` are ignored.
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Result<Vec<f64>, InterpError> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];
    for i in 0..n {
        let lower = if i > 0 { sub[i] } else { 0.0 };
        let pivot = diag[i] - if i > 0 { lower * c[i - 1] } else { 0.0 };
        if pivot.abs() <= f64::EPSILON || !pivot.is_finite() {
            return Err(InterpError::Singular(i));
        }
        c[i] = if i + 1 < n { sup[i] / pivot } else { 0.0 };
        d[i] = (rhs[i] - if i > 0 { lower * d[i - 1] } else { 0.0 }) / pivot;
    }
    for i in (0..n - 1).rev() {
        d[i] -= c[i] * d[i + 1];
    }
    Ok(d)
}
