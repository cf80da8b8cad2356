//! Common fit window across all curves.
//!
//! The window is the intersection of each curve's positive-signal x-span:
//!
//! ```text
//! [max_c min(x_c[y_c > 0]), min_c max(x_c[y_c > 0])]
//! ```
//!
//! User bounds may only narrow it.

use crate::domain::QRange;
use crate::error::AlignError;
use crate::store::Curve;

/// Positive-signal x-span of one curve, `None` if it has no positive sample.
pub fn positive_span(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let mut span: Option<(f64, f64)> = None;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        if yi > 0.0 {
            span = Some(match span {
                None => (xi, xi),
                Some((lo, hi)) => (lo.min(xi), hi.max(xi)),
            });
        }
    }
    span
}

pub fn find_common_range(
    curves: &[Curve],
    user_min: Option<f64>,
    user_max: Option<f64>,
) -> Result<QRange, AlignError> {
    if curves.is_empty() {
        return Err(AlignError::config("no curves to align"));
    }
    for (label, bound) in [("q_min", user_min), ("q_max", user_max)] {
        if let Some(v) = bound {
            if !v.is_finite() {
                return Err(AlignError::config(format!("{label} must be finite, got {v}")));
            }
        }
    }

    let mut x_min = f64::NEG_INFINITY;
    let mut x_max = f64::INFINITY;
    for curve in curves {
        let (lo, hi) = positive_span(&curve.x, &curve.y).ok_or_else(|| {
            AlignError::EmptyOverlap(format!("curve '{}' has no positive-signal samples", curve.name))
        })?;
        x_min = x_min.max(lo);
        x_max = x_max.min(hi);
    }
    if x_min > x_max {
        return Err(AlignError::EmptyOverlap(format!(
            "positive-signal ranges do not intersect (max of minima {x_min} > min of maxima {x_max})"
        )));
    }

    if let Some(u) = user_min {
        if u > x_min {
            x_min = u;
        }
    }
    if let Some(u) = user_max {
        if u < x_max {
            x_max = u;
        }
    }
    if x_min > x_max {
        return Err(AlignError::config(format!(
            "q-range bounds leave an empty window [{x_min}, {x_max}]"
        )));
    }

    Ok(QRange { min: x_min, max: x_max })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawCurve;

    fn curve(name: &str, x: &[f64], y: &[f64]) -> Curve {
        Curve::from_raw(RawCurve::points(name, x.to_vec(), y.to_vec())).unwrap()
    }

    fn pair() -> Vec<Curve> {
        vec![
            curve("a", &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], &[0.0, 1.0, 2.0, 3.0, 4.0, -1.0]),
            curve("b", &[0.5, 1.5, 2.5, 3.5, 4.5], &[2.0, 2.0, 2.0, 2.0, 2.0]),
        ]
    }

    #[test]
    fn intersection_of_positive_spans() {
        let r = find_common_range(&pair(), None, None).unwrap();
        assert_eq!(r, QRange { min: 1.0, max: 4.0 });
    }

    #[test]
    fn user_bounds_only_narrow() {
        let curves = pair();
        let natural = find_common_range(&curves, None, None).unwrap();

        let wider = find_common_range(&curves, Some(-10.0), Some(10.0)).unwrap();
        assert_eq!(wider, natural);

        let narrow = find_common_range(&curves, Some(1.5), Some(3.2)).unwrap();
        assert_eq!(narrow, QRange { min: 1.5, max: 3.2 });
        assert!(narrow.min >= natural.min && narrow.max <= natural.max);
    }

    #[test]
    fn crossed_user_bounds_are_a_configuration_error() {
        let err = find_common_range(&pair(), Some(3.0), Some(2.0)).unwrap_err();
        assert!(matches!(err, AlignError::Configuration(_)));
    }

    #[test]
    fn disjoint_curves_have_empty_overlap() {
        let curves = vec![
            curve("low", &[0.0, 1.0, 2.0], &[1.0, 1.0, 1.0]),
            curve("high", &[3.0, 4.0, 5.0], &[1.0, 1.0, 1.0]),
        ];
        let err = find_common_range(&curves, None, None).unwrap_err();
        assert!(matches!(err, AlignError::EmptyOverlap(_)));
    }

    #[test]
    fn curve_without_positive_signal_has_empty_overlap() {
        let curves = vec![
            curve("ok", &[0.0, 1.0, 2.0], &[1.0, 1.0, 1.0]),
            curve("dead", &[0.0, 1.0, 2.0], &[0.0, -1.0, 0.0]),
        ];
        let err = find_common_range(&curves, None, None).unwrap_err();
        assert!(err.to_string().contains("dead"));
    }
}
