//! Scale/offset fit of one curve against the reference.
//!
//! Given:
//! - the reference interpolant `f_ref`
//! - the candidate interpolant `f`
//! - the candidate's fit-window samples `x_i`
//!
//! we solve for the free subset of `(K, B)` minimizing
//!
//! ```text
//! Σ_i [ f_ref(x_i) - (K f(x_i) - B) ]²
//! ```
//!
//! Note the sign on `B`: the aligned curve is `K f(x) - B` everywhere
//! downstream. The residual is linear in the parameters, so the Jacobian is
//! analytic and LM converges in a handful of iterations.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::{FitOutcome, FittedViews, GoodnessMode, ParamPolicy, SolverConfig};
use crate::error::AlignError;
use crate::math::{LeastSquaresProblem, minimize};
use crate::store::Curve;

/// Error reported for a parameter whose uncertainty is undefined.
pub const UNDEFINED_ERROR: f64 = -1.0;

/// Residuals `target - (K model - B)` over the fit window.
#[derive(Debug, Clone)]
pub struct ScaleOffsetProblem {
    pub target: Vec<f64>,
    pub model: Vec<f64>,
    pub policy: ParamPolicy,
}

impl LeastSquaresProblem for ScaleOffsetProblem {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let (k, b) = self.policy.unpack(params.as_slice());
        DVector::from_iterator(
            self.target.len(),
            self.target
                .iter()
                .zip(self.model.iter())
                .map(|(&t, &m)| t - (k * m - b)),
        )
    }

    fn jacobian(&self, _params: &DVector<f64>) -> DMatrix<f64> {
        let n = self.target.len();
        match self.policy {
            ParamPolicy::FitBoth => DMatrix::from_fn(n, 2, |i, j| if j == 0 { -self.model[i] } else { 1.0 }),
            ParamPolicy::FixedK(_) => DMatrix::from_element(n, 1, 1.0),
            ParamPolicy::FixedB(_) => DMatrix::from_fn(n, 1, |i, _| -self.model[i]),
        }
    }
}

/// Apply `K f(x) - B` elementwise.
pub fn apply_scale_offset(values: &[f64], k: f64, b: f64) -> Vec<f64> {
    values.iter().map(|&v| k * v - b).collect()
}

/// `1 - SS_res / SS_tot`; zero when `SS_tot` vanishes.
pub fn goodness_of_fit(ss_res: f64, about: &[f64]) -> f64 {
    if about.is_empty() {
        return 0.0;
    }
    let mean = about.iter().sum::<f64>() / about.len() as f64;
    let ss_tot: f64 = about.iter().map(|v| (v - mean) * (v - mean)).sum();
    if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 }
}

fn ensure_trimmed(curve: &Curve) -> Result<(), AlignError> {
    if curve.trimmed.is_empty() {
        return Err(AlignError::config(format!(
            "curve '{}': discarding leaves no samples for averaging",
            curve.name
        )));
    }
    Ok(())
}

/// The reference is never fit: identity transform on its own interpolant.
pub fn fit_reference(curve: &Curve) -> Result<FitOutcome, AlignError> {
    ensure_trimmed(curve)?;
    Ok(FitOutcome {
        k: 1.0,
        k_error: 0.0,
        b: 0.0,
        b_error: 0.0,
        goodness_of_fit: 0.0,
        covariance: None,
        iterations: 0,
        fitted: FittedViews {
            qrange: curve.interpolate(&curve.qrange.x)?,
            trimmed: curve.interpolate(&curve.trimmed.x)?,
            full: curve.interpolate(&curve.x)?,
        },
    })
}

/// Fit one non-reference curve against `reference`.
pub fn fit_curve(
    curve: &Curve,
    reference: &Curve,
    policy: ParamPolicy,
    solver: &SolverConfig,
    goodness: GoodnessMode,
) -> Result<FitOutcome, AlignError> {
    ensure_trimmed(curve)?;
    let free = policy.free_count();
    if curve.qrange.len() < free {
        return Err(AlignError::shape(
            &curve.name,
            format!(
                "fit window holds {} samples; {free} free parameters need at least {free}",
                curve.qrange.len()
            ),
        ));
    }

    let x = &curve.qrange.x;
    let problem = ScaleOffsetProblem {
        target: reference.interpolate(x)?,
        model: curve.interpolate(x)?,
        policy,
    };
    let initial = policy.initial_guess();
    let (k0, b0) = policy.unpack(&initial);

    let report = minimize(&problem, DVector::from_vec(initial), &solver.lm_options()).map_err(|err| {
        AlignError::FitConvergence {
            curve: curve.name.clone(),
            k: k0,
            b: b0,
            reason: err.to_string(),
        }
    })?;
    let (k, b) = policy.unpack(report.params.as_slice());
    if !(k.is_finite() && b.is_finite()) {
        return Err(AlignError::FitConvergence {
            curve: curve.name.clone(),
            k,
            b,
            reason: "solver returned non-finite parameters".to_string(),
        });
    }

    let errors = parameter_errors(report.covariance.as_ref());
    let (k_error, b_error) = match policy {
        ParamPolicy::FitBoth => (errors[0], errors[1]),
        ParamPolicy::FixedK(_) => (0.0, errors[0]),
        ParamPolicy::FixedB(_) => (errors[0], 0.0),
    };

    let fitted_qrange = apply_scale_offset(&problem.model, k, b);
    let goodness_of_fit = match goodness {
        GoodnessMode::FittedMean => goodness_of_fit(report.cost, &fitted_qrange),
        GoodnessMode::ReferenceMean => goodness_of_fit(report.cost, &problem.target),
    };

    let fitted = FittedViews {
        qrange: fitted_qrange,
        trimmed: apply_scale_offset(&curve.interpolate(&curve.trimmed.x)?, k, b),
        full: apply_scale_offset(&curve.interpolate(&curve.x)?, k, b),
    };

    debug!(
        curve = %curve.name,
        k,
        b,
        goodness_of_fit,
        iterations = report.iterations,
        "fitted curve"
    );

    Ok(FitOutcome {
        k,
        k_error,
        b,
        b_error,
        goodness_of_fit,
        covariance: report.covariance,
        iterations: report.iterations,
        fitted,
    })
}

/// `sqrt(diag(cov))`, or [`UNDEFINED_ERROR`] when the covariance is missing or
/// its diagonal is all zero.
fn parameter_errors(covariance: Option<&DMatrix<f64>>) -> Vec<f64> {
    let Some(cov) = covariance else {
        return vec![UNDEFINED_ERROR; 2];
    };
    let diag = cov.diagonal();
    if diag.iter().all(|&v| v == 0.0) {
        return vec![UNDEFINED_ERROR; diag.len().max(2)];
    }
    diag.iter().map(|v| v.abs().sqrt()).collect()
}
