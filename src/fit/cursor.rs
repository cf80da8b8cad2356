//! Round-robin assignment of fixed K/B values to non-reference curves.

use crate::domain::ParamPolicy;
use crate::error::AlignError;

/// Cycles through a list of fixed values, one per non-reference curve.
#[derive(Debug, Clone)]
pub struct FixedParamCursor<'a> {
    kind: FixedKind,
    values: &'a [f64],
    pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixedKind {
    None,
    K,
    B,
}

impl<'a> FixedParamCursor<'a> {
    /// Validate the fixed lists against the number of curves to fit.
    ///
    /// A list must hold a single value (applied to every curve) or exactly one
    /// value per non-reference curve. K and B cannot both be fixed.
    pub fn new(fixed_k: &'a [f64], fixed_b: &'a [f64], n_fitted: usize) -> Result<Self, AlignError> {
        let (kind, values, label) = match (fixed_k.is_empty(), fixed_b.is_empty()) {
            (true, true) => (FixedKind::None, fixed_k, ""),
            (false, true) => (FixedKind::K, fixed_k, "K"),
            (true, false) => (FixedKind::B, fixed_b, "B"),
            (false, false) => {
                return Err(AlignError::config(
                    "at most one of K and B may be fixed; the other is fitted",
                ));
            }
        };
        if kind != FixedKind::None {
            if values.len() != 1 && values.len() != n_fitted {
                return Err(AlignError::config(format!(
                    "{} fixed {label} values given for {n_fitted} non-reference curves; expected 1 or {n_fitted}",
                    values.len()
                )));
            }
            if let Some(v) = values.iter().find(|v| !v.is_finite()) {
                return Err(AlignError::config(format!("fixed {label} value {v} is not finite")));
            }
        }
        Ok(Self { kind, values, pos: 0 })
    }

    /// Policy for the next non-reference curve.
    pub fn next_policy(&mut self) -> ParamPolicy {
        let value = if self.values.is_empty() {
            0.0
        } else {
            let v = self.values[self.pos % self.values.len()];
            self.pos += 1;
            v
        };
        match self.kind {
            FixedKind::None => ParamPolicy::FitBoth,
            FixedKind::K => ParamPolicy::FixedK(value),
            FixedKind::B => ParamPolicy::FixedB(value),
        }
    }
}
