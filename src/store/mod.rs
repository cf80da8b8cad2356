//! In-memory curve store.
//!
//! Turns collaborator-supplied `RawCurve`s into `Curve` records (bin centers,
//! signal, uncertainty, quadratic interpolant) and keeps them in insertion
//! order. Order matters: the first curve is the default reference, and every
//! output (groups, table rows) follows it.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{CurveView, FitState, RawCurve};
use crate::error::AlignError;
use crate::math::QuadraticSpline;

/// One ingested curve plus its derived views and fit state.
#[derive(Debug, Clone)]
pub struct Curve {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub e: Vec<f64>,
    pub interpolant: QuadraticSpline,
    /// Samples inside the common fit window (set after the range is known).
    pub qrange: CurveView,
    /// Positive, edge-discarded samples used for averaging.
    pub trimmed: CurveView,
    pub fit: FitState,
}

impl Curve {
    pub fn from_raw(raw: RawCurve) -> Result<Self, AlignError> {
        let RawCurve { name, x, y, e } = raw;
        let n = y.len();

        let x = if x.len() == n + 1 {
            bin_centers(&x)
        } else if x.len() == n {
            x
        } else {
            return Err(AlignError::shape(
                &name,
                format!("x has {} values; expected {} (bin edges) or {} (points)", x.len(), n + 1, n),
            ));
        };
        // Missing uncertainties are allowed; treat them as zero.
        let e = if e.is_empty() { vec![0.0; n] } else { e };
        if e.len() != n {
            return Err(AlignError::shape(
                &name,
                format!("e has {} values but y has {n}", e.len()),
            ));
        }

        let interpolant =
            QuadraticSpline::new(&x, &y).map_err(|err| AlignError::shape(&name, err.to_string()))?;

        Ok(Self {
            name,
            x,
            y,
            e,
            interpolant,
            qrange: CurveView::default(),
            trimmed: CurveView::default(),
            fit: FitState::NotFitted,
        })
    }

    /// The untouched samples as a view.
    pub fn full_view(&self) -> CurveView {
        CurveView {
            x: self.x.clone(),
            y: self.y.clone(),
            e: self.e.clone(),
        }
    }

    /// Evaluate the interpolant at each `xs`.
    pub fn interpolate(&self, xs: &[f64]) -> Result<Vec<f64>, AlignError> {
        self.interpolant.eval_many(xs).ok_or_else(|| {
            let (lo, hi) = self.interpolant.domain();
            AlignError::shape(
                &self.name,
                format!("evaluation requested outside interpolation domain [{lo}, {hi}]"),
            )
        })
    }
}

/// Average adjacent bin edges.
pub fn bin_centers(edges: &[f64]) -> Vec<f64> {
    edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
}

/// Ordered name → `Curve` association.
#[derive(Debug, Clone, Default)]
pub struct CurveStore {
    curves: Vec<Curve>,
    index: HashMap<String, usize>,
}

impl CurveStore {
    /// Materialize every raw curve, preserving order.
    pub fn ingest(raw_curves: impl IntoIterator<Item = RawCurve>) -> Result<Self, AlignError> {
        let mut store = CurveStore::default();
        for raw in raw_curves {
            store.insert(Curve::from_raw(raw)?)?;
        }
        debug!(curves = store.len(), "ingested curves");
        Ok(store)
    }

    pub fn insert(&mut self, curve: Curve) -> Result<(), AlignError> {
        if self.index.contains_key(&curve.name) {
            return Err(AlignError::shape(&curve.name, "duplicate curve name"));
        }
        self.index.insert(curve.name.clone(), self.curves.len());
        self.curves.push(curve);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Curve> {
        self.index.get(name).map(|&i| &self.curves[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn first(&self) -> Option<&Curve> {
        self.curves.first()
    }

    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    pub fn curves_mut(&mut self) -> &mut [Curve] {
        &mut self.curves
    }

    pub fn iter(&self) -> impl Iterator<Item = &Curve> {
        self.curves.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.curves.iter().map(|c| c.name.as_str())
    }
}
