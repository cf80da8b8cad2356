//! Shared alignment pipeline used by the CLI and by library callers.
//!
//! CurveStore -> common range -> trimmed views -> per-curve fit -> results.
//!
//! Configuration and data-shape problems are detected before any fitting
//! starts; a fit failure aborts the whole run. No partial results.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::{AlignConfig, CurveGroup, FitState, OutputCurve, ParamPolicy, ParameterTable, QRange, RawCurve};
use crate::error::AlignError;
use crate::fit::{FixedParamCursor, find_common_range, fit_curve, fit_reference, trim};
use crate::report::{build_averaged_curve, build_curve_sets, build_parameter_table};
use crate::store::{Curve, CurveStore};

/// All computed outputs of a single alignment run.
#[derive(Debug, Clone)]
pub struct AlignmentRun {
    pub store: CurveStore,
    pub reference: String,
    pub range: QRange,
    pub groups: Vec<CurveGroup>,
    pub table: ParameterTable,
    pub averaged: OutputCurve,
}

/// Execute the full alignment pipeline.
pub fn run_alignment(raw_curves: Vec<RawCurve>, config: &AlignConfig) -> Result<AlignmentRun, AlignError> {
    validate_config(config)?;

    // 1) Materialize curves.
    let mut store = CurveStore::ingest(raw_curves)?;
    if store.is_empty() {
        return Err(AlignError::config("no curves to align"));
    }

    // 2) Resolve the reference (first curve by default).
    let reference_idx = match &config.reference {
        Some(name) => store
            .position(name)
            .ok_or_else(|| AlignError::config(format!("reference curve '{name}' not found")))?,
        None => 0,
    };
    let reference = store.curves()[reference_idx].name.clone();

    // 3) Common fit window.
    let range = find_common_range(store.curves(), config.q_min, config.q_max)?;
    info!(
        curves = store.len(),
        reference = %reference,
        q_min = range.min,
        q_max = range.max,
        "aligning curves"
    );

    // 4) Working views.
    for curve in store.curves_mut() {
        let views = trim(
            &curve.x,
            &curve.y,
            &curve.e,
            range,
            config.discard_begin,
            config.discard_end,
        );
        curve.qrange = views.qrange;
        curve.trimmed = views.trimmed;
        debug!(
            curve = %curve.name,
            qrange = curve.qrange.len(),
            trimmed = curve.trimmed.len(),
            "trimmed views"
        );
    }

    // 5) Fixed-parameter policies, assigned in store order.
    let mut cursor = FixedParamCursor::new(&config.fixed_k, &config.fixed_b, store.len() - 1)?;
    let policies: Vec<Option<ParamPolicy>> = (0..store.len())
        .map(|i| (i != reference_idx).then(|| cursor.next_policy()))
        .collect();

    // 6) Fit. The reference is read-only while the others are fit.
    let reference_curve = store.curves()[reference_idx].clone();
    let fit_one = |(curve, policy): (&Curve, &Option<ParamPolicy>)| match policy {
        None => fit_reference(curve),
        Some(policy) => fit_curve(curve, &reference_curve, *policy, &config.solver, config.goodness),
    };
    let outcomes = if config.parallel {
        store
            .curves()
            .par_iter()
            .zip(policies.par_iter())
            .map(fit_one)
            .collect::<Result<Vec<_>, AlignError>>()?
    } else {
        store
            .curves()
            .iter()
            .zip(policies.iter())
            .map(fit_one)
            .collect::<Result<Vec<_>, AlignError>>()?
    };
    for (curve, outcome) in store.curves_mut().iter_mut().zip(outcomes) {
        curve.fit = FitState::Fitted(outcome);
    }

    // 7) Results.
    let prefix = &config.output_prefix;
    let groups = build_curve_sets(store.curves(), prefix)?;
    let table = build_parameter_table(store.curves())?;
    let averaged = build_averaged_curve(store.curves(), prefix)?;
    info!(points = averaged.x.len(), name = %averaged.name, "averaged curve built");

    Ok(AlignmentRun {
        store,
        reference,
        range,
        groups,
        table,
        averaged,
    })
}

fn validate_config(config: &AlignConfig) -> Result<(), AlignError> {
    if config.output_prefix.trim().is_empty() {
        return Err(AlignError::config("output prefix must not be empty"));
    }
    let s = &config.solver;
    if !(s.ftol >= 0.0 && s.xtol >= 0.0 && s.gtol >= 0.0) {
        return Err(AlignError::config("solver tolerances must be non-negative"));
    }
    if s.max_iterations == 0 {
        return Err(AlignError::config("solver max_iterations must be > 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> (Vec<f64>, Vec<f64>) {
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        (x, y)
    }

    #[test]
    fn end_to_end_recovers_k_and_b() {
        let (x, r) = ramp();
        let c: Vec<f64> = r.iter().map(|v| (v + 1.0) / 2.0).collect();
        let raw = vec![RawCurve::points("R", x.clone(), r), RawCurve::points("C", x, c)];

        let run = run_alignment(raw, &AlignConfig::default()).unwrap();
        assert_eq!(run.reference, "R");
        assert_eq!(run.range, QRange { min: 0.0, max: 4.0 });

        let row = run.table.row("C").unwrap();
        assert!((row.k - 2.0).abs() < 1e-3, "K={}", row.k);
        assert!((row.b - 1.0).abs() < 1e-3, "B={}", row.b);
        assert!(row.goodness_of_fit > 0.99);

        let reference_row = run.table.row("R").unwrap();
        assert_eq!(
            (reference_row.k, reference_row.k_error, reference_row.b, reference_row.b_error, reference_row.goodness_of_fit),
            (1.0, 0.0, 0.0, 0.0, 0.0)
        );

        assert_eq!(run.averaged.x, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        for (avg, expected) in run.averaged.y.iter().zip([1.0, 2.0, 3.0, 4.0, 5.0]) {
            assert!((avg - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn explicit_reference_and_parallel_match_sequential() {
        let x: Vec<f64> = (1..=30).map(|i| 0.01 * i as f64).collect();
        let base: Vec<f64> = x.iter().map(|q| 100.0 * (-q * q * 400.0 / 3.0).exp() + 0.2).collect();
        let raw: Vec<RawCurve> = [(1.0, 0.0), (1.5, 0.1), (0.8, -0.05)]
            .iter()
            .enumerate()
            .map(|(i, &(k, b))| {
                let y: Vec<f64> = base.iter().map(|v| (v + b) / k).collect();
                RawCurve::points(format!("s{i}"), x.clone(), y)
            })
            .collect();

        let config = AlignConfig {
            reference: Some("s0".into()),
            ..AlignConfig::default()
        };
        let seq = run_alignment(raw.clone(), &config).unwrap();
        let par = run_alignment(raw, &AlignConfig { parallel: true, ..config }).unwrap();
        assert_eq!(seq.table, par.table);
        assert!((seq.table.row("s1").unwrap().k - 1.5).abs() < 1e-6);
        assert!((seq.table.row("s2").unwrap().b + 0.05).abs() < 1e-6);
    }

    #[test]
    fn noisy_curves_on_shifted_grids_recover_truth() {
        use crate::data::{SampleSpec, generate_sample};

        let set = generate_sample(&SampleSpec {
            count: 4,
            points: 200,
            seed: 11,
            noise: 0.001,
            ..SampleSpec::default()
        })
        .unwrap();
        // Grids differ per curve, so every fit goes through the reference interpolant.
        assert_ne!(set.curves[0].x[0], set.curves[1].x[0]);

        let run = run_alignment(set.curves, &AlignConfig::default()).unwrap();
        for t in set.truth.iter().skip(1) {
            let row = run.table.row(&t.name).unwrap();
            assert!((row.k - t.k).abs() < 0.01 * t.k, "{}: K={} want {}", t.name, row.k, t.k);
            assert!((row.b - t.b).abs() < 0.1, "{}: B={} want {}", t.name, row.b, t.b);
            assert!(row.k_error > 0.0 && row.b_error > 0.0);
            assert!(row.goodness_of_fit > 0.99);
        }
    }

    #[test]
    fn small_intensity_scale_recovers_truth() {
        use crate::data::{SampleSpec, generate_sample};

        const SCALE: f64 = 1e-7;
        let mut set = generate_sample(&SampleSpec {
            count: 3,
            points: 100,
            seed: 5,
            ..SampleSpec::default()
        })
        .unwrap();
        for curve in &mut set.curves {
            curve.y.iter_mut().for_each(|v| *v *= SCALE);
        }

        let run = run_alignment(set.curves, &AlignConfig::default()).unwrap();
        for t in set.truth.iter().skip(1) {
            let row = run.table.row(&t.name).unwrap();
            assert!((row.k - t.k).abs() < 1e-3 * t.k, "{}: K={} want {}", t.name, row.k, t.k);
            assert!((row.b - t.b * SCALE).abs() < 1e-3 * SCALE, "{}: B={} want {}", t.name, row.b, t.b * SCALE);
        }
    }

    #[test]
    fn unknown_reference_is_a_configuration_error() {
        let (x, y) = ramp();
        let config = AlignConfig {
            reference: Some("missing".into()),
            ..AlignConfig::default()
        };
        let err = run_alignment(vec![RawCurve::points("a", x, y)], &config).unwrap_err();
        assert!(matches!(err, AlignError::Configuration(_)));
    }

    #[test]
    fn fixed_list_length_is_checked_before_fitting() {
        let (x, y) = ramp();
        let raw = vec![
            RawCurve::points("a", x.clone(), y.clone()),
            RawCurve::points("b", x.clone(), y.clone()),
            RawCurve::points("c", x, y),
        ];
        let config = AlignConfig {
            fixed_k: vec![1.0, 2.0, 3.0],
            ..AlignConfig::default()
        };
        assert!(matches!(run_alignment(raw, &config), Err(AlignError::Configuration(_))));
    }

    #[test]
    fn oversized_discards_are_reported() {
        let (x, y) = ramp();
        let raw = vec![RawCurve::points("a", x.clone(), y.clone()), RawCurve::points("b", x, y)];
        let config = AlignConfig {
            discard_begin: 3,
            discard_end: 2,
            ..AlignConfig::default()
        };
        assert!(matches!(run_alignment(raw, &config), Err(AlignError::Configuration(_))));
    }
}
