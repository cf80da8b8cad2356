//! Shared domain types.
//!
//! Input curves, per-curve views and fit outcomes, run configuration, and the
//! output artifacts (curve groups, parameter table, averaged curve). Output
//! types are serializable so they can be exported to JSON and reloaded later
//! for plotting.

use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::math::LmOptions;

/// Default output-name prefix.
pub const DEFAULT_PREFIX: &str = "iq";

/// Initial guess for every free parameter.
pub const INITIAL_GUESS: f64 = 0.1;

/// A 1D data container as handed over by a collaborator.
///
/// `x` holds either bin edges (`y.len() + 1` values) or point positions
/// (`y.len()` values).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCurve {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    #[serde(default)]
    pub e: Vec<f64>,
}

impl RawCurve {
    pub fn new(name: impl Into<String>, x: Vec<f64>, y: Vec<f64>, e: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            e,
        }
    }

    /// Point data with zero uncertainties.
    pub fn points(name: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Self {
        let e = vec![0.0; y.len()];
        Self::new(name, x, y, e)
    }
}

/// An order-preserving subset of a curve's samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurveView {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub e: Vec<f64>,
}

impl CurveView {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Keep the samples whose `(x, y)` satisfy `keep`, in order.
    pub fn filtered(x: &[f64], y: &[f64], e: &[f64], keep: impl Fn(f64, f64) -> bool) -> Self {
        let mut out = CurveView::default();
        for i in 0..x.len() {
            if keep(x[i], y[i]) {
                out.x.push(x[i]);
                out.y.push(y[i]);
                out.e.push(e[i]);
            }
        }
        out
    }

    /// Contiguous sub-range `[start, end)`; empty if `start >= end`.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        if start >= end {
            return CurveView::default();
        }
        CurveView {
            x: self.x[start..end].to_vec(),
            y: self.y[start..end].to_vec(),
            e: self.e[start..end].to_vec(),
        }
    }
}

/// Closed fit window `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QRange {
    pub min: f64,
    pub max: f64,
}

impl QRange {
    pub fn contains(&self, x: f64) -> bool {
        self.min <= x && x <= self.max
    }
}

/// Which of K and B are free for one curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamPolicy {
    FitBoth,
    FixedK(f64),
    FixedB(f64),
}

impl ParamPolicy {
    pub fn free_count(self) -> usize {
        match self {
            ParamPolicy::FitBoth => 2,
            ParamPolicy::FixedK(_) | ParamPolicy::FixedB(_) => 1,
        }
    }

    /// Initial free-parameter vector.
    pub fn initial_guess(self) -> Vec<f64> {
        vec![INITIAL_GUESS; self.free_count()]
    }

    /// Map a free-parameter vector to `(K, B)`.
    pub fn unpack(self, free: &[f64]) -> (f64, f64) {
        match self {
            ParamPolicy::FitBoth => (free[0], free[1]),
            ParamPolicy::FixedK(k) => (k, free[0]),
            ParamPolicy::FixedB(b) => (free[0], b),
        }
    }
}

/// Which mean the total sum of squares is taken about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GoodnessMode {
    /// Deviations of the fitted curve from its own mean (legacy behavior).
    #[default]
    FittedMean,
    /// Deviations of the reference values from their mean.
    ReferenceMean,
}

/// The three per-curve views that receive fitted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Qrange,
    Trimmed,
    Full,
}

impl ViewKind {
    pub const ALL: [ViewKind; 3] = [ViewKind::Qrange, ViewKind::Trimmed, ViewKind::Full];

    pub fn suffix(self) -> &'static str {
        match self {
            ViewKind::Qrange => "qrange",
            ViewKind::Trimmed => "trimmed",
            ViewKind::Full => "full",
        }
    }
}

/// Fitted y evaluated on each view's x.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FittedViews {
    pub qrange: Vec<f64>,
    pub trimmed: Vec<f64>,
    pub full: Vec<f64>,
}

impl FittedViews {
    pub fn get(&self, view: ViewKind) -> &[f64] {
        match view {
            ViewKind::Qrange => &self.qrange,
            ViewKind::Trimmed => &self.trimmed,
            ViewKind::Full => &self.full,
        }
    }
}

/// Result of fitting one curve.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub k: f64,
    pub k_error: f64,
    pub b: f64,
    pub b_error: f64,
    pub goodness_of_fit: f64,
    /// Covariance of the free parameters, when defined.
    pub covariance: Option<DMatrix<f64>>,
    pub iterations: usize,
    pub fitted: FittedViews,
}

#[derive(Debug, Clone, Default)]
pub enum FitState {
    #[default]
    NotFitted,
    Fitted(FitOutcome),
}

impl FitState {
    pub fn outcome(&self) -> Option<&FitOutcome> {
        match self {
            FitState::NotFitted => None,
            FitState::Fitted(outcome) => Some(outcome),
        }
    }
}

/// Solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let lm = LmOptions::default();
        Self {
            max_iterations: lm.max_iterations,
            ftol: lm.ftol,
            xtol: lm.xtol,
            gtol: lm.gtol,
        }
    }
}

impl SolverConfig {
    pub fn lm_options(&self) -> LmOptions {
        LmOptions {
            max_iterations: self.max_iterations,
            ftol: self.ftol,
            xtol: self.xtol,
            gtol: self.gtol,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignConfig {
    /// Reference curve name; the first ingested curve when `None`.
    pub reference: Option<String>,
    pub q_min: Option<f64>,
    pub q_max: Option<f64>,
    /// Leading positive samples dropped from each trimmed view.
    pub discard_begin: usize,
    /// Trailing positive samples dropped from each trimmed view.
    pub discard_end: usize,
    /// Fixed K values, consumed round-robin over non-reference curves.
    pub fixed_k: Vec<f64>,
    /// Fixed B values, consumed round-robin over non-reference curves.
    pub fixed_b: Vec<f64>,
    pub output_prefix: String,
    pub goodness: GoodnessMode,
    /// Fit non-reference curves in parallel.
    pub parallel: bool,
    pub solver: SolverConfig,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            reference: None,
            q_min: None,
            q_max: None,
            discard_begin: 0,
            discard_end: 0,
            fixed_k: Vec::new(),
            fixed_b: Vec::new(),
            output_prefix: DEFAULT_PREFIX.to_string(),
            goodness: GoodnessMode::default(),
            parallel: false,
            solver: SolverConfig::default(),
        }
    }
}

/// A named output curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputCurve {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// A named collection of output curves sharing one view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGroup {
    pub name: String,
    pub view: ViewKind,
    pub curves: Vec<OutputCurve>,
}

/// One row of the parameter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRow {
    #[serde(rename = "IQCurve")]
    pub iq_curve: String,
    #[serde(rename = "K")]
    pub k: f64,
    #[serde(rename = "KError")]
    pub k_error: f64,
    #[serde(rename = "B")]
    pub b: f64,
    #[serde(rename = "BError")]
    pub b_error: f64,
    #[serde(rename = "GoodnessOfFit")]
    pub goodness_of_fit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterTable {
    pub rows: Vec<ParameterRow>,
}

impl ParameterTable {
    pub const COLUMNS: [&'static str; 6] = ["IQCurve", "K", "KError", "B", "BError", "GoodnessOfFit"];

    pub fn row(&self, curve: &str) -> Option<&ParameterRow> {
        self.rows.iter().find(|r| r.iq_curve == curve)
    }
}

/// A saved alignment result (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentFile {
    pub tool: String,
    pub prefix: String,
    pub reference: String,
    pub range: QRange,
    pub goodness: GoodnessMode,
    pub table: ParameterTable,
    pub groups: Vec<CurveGroup>,
    pub averaged: OutputCurve,
}
