//! Per-curve working views.
//!
//! - `trimmed`: positive samples only, with leading/trailing points discarded;
//!   feeds the averaged curve.
//! - `qrange`: the unfiltered samples inside the fit window; feeds the solver.
//!
//! The two views filter differently on purpose: `qrange` keeps non-positive
//! samples that fall inside the window.

use crate::domain::{CurveView, QRange};

#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedViews {
    pub qrange: CurveView,
    pub trimmed: CurveView,
}

/// Positive-signal samples, in order.
pub fn positive_samples(x: &[f64], y: &[f64], e: &[f64]) -> CurveView {
    CurveView::filtered(x, y, e, |_, yi| yi > 0.0)
}

/// Drop `begin` leading and `end` trailing samples.
///
/// `end == 0` keeps the tail intact.
pub fn discard_edges(view: &CurveView, begin: usize, end: usize) -> CurveView {
    let stop = if end == 0 {
        view.len()
    } else {
        view.len().saturating_sub(end)
    };
    view.slice(begin, stop)
}

pub fn trim(
    x: &[f64],
    y: &[f64],
    e: &[f64],
    range: QRange,
    discard_begin: usize,
    discard_end: usize,
) -> TrimmedViews {
    let cleaned = positive_samples(x, y, e);
    let trimmed = discard_edges(&cleaned, discard_begin, discard_end);
    let qrange = CurveView::filtered(x, y, e, |xi, _| range.contains(xi));
    TrimmedViews { qrange, trimmed }
}
