//! Result assembly: fitted curve groups, parameter table, averaged curve.
//!
//! Every builder requires all curves to be in the `Fitted` state.

use crate::domain::{CurveGroup, FitOutcome, OutputCurve, ParameterRow, ParameterTable, ViewKind};
use crate::error::AlignError;
use crate::store::Curve;

pub mod format;

pub use format::*;

fn outcome(curve: &Curve) -> Result<&FitOutcome, AlignError> {
    curve
        .fit
        .outcome()
        .ok_or_else(|| AlignError::Unfitted(curve.name.clone()))
}

fn view_x(curve: &Curve, view: ViewKind) -> &[f64] {
    match view {
        ViewKind::Qrange => &curve.qrange.x,
        ViewKind::Trimmed => &curve.trimmed.x,
        ViewKind::Full => &curve.x,
    }
}

/// Name of the group holding one view: `<prefix>_<suffix>_fit`.
pub fn group_name(prefix: &str, view: ViewKind) -> String {
    format!("{prefix}_{}_fit", view.suffix())
}

/// Name of the averaged curve: `<prefix>_trimmed_fit_averaged`.
pub fn averaged_name(prefix: &str) -> String {
    format!("{}_averaged", group_name(prefix, ViewKind::Trimmed))
}

/// One group per view, each with one curve per input curve.
pub fn build_curve_sets(curves: &[Curve], prefix: &str) -> Result<Vec<CurveGroup>, AlignError> {
    let mut groups = Vec::with_capacity(ViewKind::ALL.len());
    for view in ViewKind::ALL {
        let mut members = Vec::with_capacity(curves.len());
        for curve in curves {
            let fitted = outcome(curve)?.fitted.get(view);
            members.push(OutputCurve {
                name: format!("{}_{}_fit", curve.name, view.suffix()),
                x: view_x(curve, view).to_vec(),
                y: fitted.to_vec(),
            });
        }
        groups.push(CurveGroup {
            name: group_name(prefix, view),
            view,
            curves: members,
        });
    }
    Ok(groups)
}

/// One row per curve, in store order.
pub fn build_parameter_table(curves: &[Curve]) -> Result<ParameterTable, AlignError> {
    let rows = curves
        .iter()
        .map(|curve| {
            let fit = outcome(curve)?;
            Ok(ParameterRow {
                iq_curve: curve.name.clone(),
                k: fit.k,
                k_error: fit.k_error,
                b: fit.b,
                b_error: fit.b_error,
                goodness_of_fit: fit.goodness_of_fit,
            })
        })
        .collect::<Result<Vec<_>, AlignError>>()?;
    Ok(ParameterTable { rows })
}

/// Plain mean of the trimmed fitted values at each unique trimmed x.
///
/// x-values are matched by exact equality; a curve without a sample at some
/// x simply does not contribute there. All samples are sorted once, so equal
/// x-values end up adjacent.
pub fn build_averaged_curve(curves: &[Curve], prefix: &str) -> Result<OutputCurve, AlignError> {
    let mut samples: Vec<(f64, f64)> = Vec::new();
    for curve in curves {
        let fitted = &outcome(curve)?.fitted.trimmed;
        samples.extend(curve.trimmed.x.iter().copied().zip(fitted.iter().copied()));
    }
    // Stable: ties keep curve order, so sums run in the same order as the curves.
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut i = 0;
    while i < samples.len() {
        let x = samples[i].0;
        if x.is_nan() {
            return Err(AlignError::AveragingAmbiguity { x });
        }
        let mut sum = 0.0;
        let mut count = 0usize;
        while i < samples.len() && samples[i].0 == x {
            sum += samples[i].1;
            count += 1;
            i += 1;
        }
        xs.push(x);
        ys.push(sum / count as f64);
    }

    Ok(OutputCurve {
        name: averaged_name(prefix),
        x: xs,
        y: ys,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurveView, FitState, FittedViews, RawCurve};

    fn fitted_curve(name: &str, x: &[f64], fitted: &[f64], k: f64) -> Curve {
        let mut c = Curve::from_raw(RawCurve::points(name, x.to_vec(), vec![1.0; x.len()])).unwrap();
        c.qrange = c.full_view();
        c.trimmed = c.full_view();
        c.fit = FitState::Fitted(FitOutcome {
            k,
            k_error: 0.01,
            b: 0.0,
            b_error: 0.02,
            goodness_of_fit: 0.9,
            covariance: None,
            iterations: 3,
            fitted: FittedViews {
                qrange: fitted.to_vec(),
                trimmed: fitted.to_vec(),
                full: fitted.to_vec(),
            },
        });
        c
    }

    #[test]
    fn averages_shared_grid() {
        let x = [1.0, 2.0, 3.0];
        let curves = vec![
            fitted_curve("a", &x, &[1.0, 2.0, 3.0], 1.0),
            fitted_curve("b", &x, &[3.0, 2.0, 1.0], 2.0),
        ];
        let avg = build_averaged_curve(&curves, "run").unwrap();
        assert_eq!(avg.name, "run_trimmed_fit_averaged");
        assert_eq!(avg.x, vec![1.0, 2.0, 3.0]);
        assert_eq!(avg.y, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn unmatched_x_uses_only_contributing_curves() {
        let curves = vec![
            fitted_curve("a", &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 1.0),
            fitted_curve("b", &[2.0, 3.0, 4.0], &[4.0, 5.0, 6.0], 1.0),
        ];
        let avg = build_averaged_curve(&curves, "p").unwrap();
        assert_eq!(avg.x, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(avg.y, vec![1.0, 3.0, 4.0, 6.0]);
    }

    #[test]
    fn signed_zero_and_interleaved_grids_merge_exactly() {
        let curves = vec![
            fitted_curve("a", &[-0.0, 2.0, 4.0], &[1.0, 2.0, 3.0], 1.0),
            fitted_curve("b", &[0.0, 3.0, 4.0], &[3.0, 7.0, 5.0], 1.0),
            fitted_curve("c", &[2.0, 3.0, 5.0], &[4.0, 1.0, 9.0], 1.0),
        ];
        let avg = build_averaged_curve(&curves, "p").unwrap();
        assert_eq!(avg.x, vec![0.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(avg.y, vec![2.0, 3.0, 4.0, 4.0, 9.0]);
    }

    #[test]
    fn long_shared_grids_average_pointwise() {
        let x: Vec<f64> = (0..5000).map(|i| 1e-3 * i as f64).collect();
        let lo: Vec<f64> = x.iter().map(|v| v + 1.0).collect();
        let hi: Vec<f64> = x.iter().map(|v| v + 3.0).collect();
        let curves = vec![fitted_curve("lo", &x, &lo, 1.0), fitted_curve("hi", &x, &hi, 1.0)];
        let avg = build_averaged_curve(&curves, "p").unwrap();
        assert_eq!(avg.x, x);
        for (xi, yi) in avg.x.iter().zip(&avg.y) {
            assert!((yi - (xi + 2.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn nan_x_has_no_contributor() {
        let mut c = fitted_curve("a", &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 1.0);
        c.trimmed = CurveView {
            x: vec![1.0, f64::NAN],
            y: vec![1.0, 1.0],
            e: vec![0.0, 0.0],
        };
        let err = build_averaged_curve(&[c], "p").unwrap_err();
        assert!(matches!(err, AlignError::AveragingAmbiguity { .. }));
    }

    #[test]
    fn table_has_one_row_per_curve_in_order() {
        let x = [1.0, 2.0, 3.0];
        let curves = vec![
            fitted_curve("z", &x, &x, 1.0),
            fitted_curve("a", &x, &x, 2.0),
            fitted_curve("m", &x, &x, 3.0),
        ];
        let table = build_parameter_table(&curves).unwrap();
        let names: Vec<&str> = table.rows.iter().map(|r| r.iq_curve.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
        assert_eq!(table.row("m").unwrap().k, 3.0);
    }

    #[test]
    fn curve_sets_are_named_by_view() {
        let x = [1.0, 2.0, 3.0];
        let curves = vec![fitted_curve("s1", &x, &x, 1.0), fitted_curve("s2", &x, &x, 1.0)];
        let groups = build_curve_sets(&curves, "run").unwrap();
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["run_qrange_fit", "run_trimmed_fit", "run_full_fit"]);
        assert_eq!(groups[2].curves[1].name, "s2_full_fit");
        assert_eq!(groups[0].curves.len(), 2);
    }

    #[test]
    fn unfitted_curves_are_refused() {
        let c = Curve::from_raw(RawCurve::points("raw", vec![1.0, 2.0, 3.0], vec![1.0; 3])).unwrap();
        assert!(matches!(build_parameter_table(&[c]), Err(AlignError::Unfitted(name)) if name == "raw"));
    }
}
