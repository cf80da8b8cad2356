//! Export alignment results to CSV.
//!
//! Three files per run, all keyed by the output prefix:
//! - `<prefix>_table.csv`: the parameter table
//! - `<prefix>_fits.csv`: every fitted curve in long form (`group,curve,x,y`)
//! - `<prefix>_trimmed_fit_averaged.csv`: the averaged curve

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::app::pipeline::AlignmentRun;
use crate::domain::{CurveGroup, OutputCurve, ParameterTable, RawCurve};
use crate::error::AlignError;

fn create_writer(path: &Path) -> Result<csv::Writer<File>, AlignError> {
    csv::Writer::from_path(path).map_err(|e| AlignError::io("create", path, e))
}

/// Write the parameter table with its exported column names.
pub fn write_table_csv(path: &Path, table: &ParameterTable) -> Result<(), AlignError> {
    let mut w = create_writer(path)?;
    for row in &table.rows {
        w.serialize(row).map_err(|e| AlignError::io("write", path, e))?;
    }
    w.flush().map_err(|e| AlignError::io("write", path, e))?;
    Ok(())
}

/// Write all fitted curve groups in long format.
pub fn write_groups_csv(path: &Path, groups: &[CurveGroup]) -> Result<(), AlignError> {
    let mut w = create_writer(path)?;
    w.write_record(["group", "curve", "x", "y"])
        .map_err(|e| AlignError::io("write", path, e))?;
    for group in groups {
        for curve in &group.curves {
            for (x, y) in curve.x.iter().zip(&curve.y) {
                let (xs, ys) = (format!("{x:.10e}"), format!("{y:.10e}"));
                w.write_record([group.name.as_str(), curve.name.as_str(), xs.as_str(), ys.as_str()])
                    .map_err(|e| AlignError::io("write", path, e))?;
            }
        }
    }
    w.flush().map_err(|e| AlignError::io("write", path, e))?;
    Ok(())
}

/// Write a single curve as `x,y`.
pub fn write_curve_csv(path: &Path, curve: &OutputCurve) -> Result<(), AlignError> {
    let mut w = create_writer(path)?;
    w.write_record(["x", "y"]).map_err(|e| AlignError::io("write", path, e))?;
    for (x, y) in curve.x.iter().zip(&curve.y) {
        w.write_record([format!("{x:.10e}"), format!("{y:.10e}")])
            .map_err(|e| AlignError::io("write", path, e))?;
    }
    w.flush().map_err(|e| AlignError::io("write", path, e))?;
    Ok(())
}

/// Write an input curve as `x,y,e`, in the same layout `ingest` reads.
///
/// Histogram curves get a closing row holding only the last bin edge.
pub fn write_raw_curve_csv(path: &Path, curve: &RawCurve) -> Result<(), AlignError> {
    let mut w = create_writer(path)?;
    w.write_record(["x", "y", "e"]).map_err(|e| AlignError::io("write", path, e))?;
    for (i, x) in curve.x.iter().enumerate() {
        let record = match curve.y.get(i) {
            Some(y) => [
                format!("{x:.10e}"),
                format!("{y:.10e}"),
                format!("{:.10e}", curve.e.get(i).copied().unwrap_or(0.0)),
            ],
            None => [format!("{x:.10e}"), String::new(), String::new()],
        };
        w.write_record(&record).map_err(|e| AlignError::io("write", path, e))?;
    }
    w.flush().map_err(|e| AlignError::io("write", path, e))?;
    Ok(())
}

/// Write every CSV export for a run into `dir`, returning the paths written.
pub fn write_run_exports(dir: &Path, prefix: &str, run: &AlignmentRun) -> Result<Vec<PathBuf>, AlignError> {
    std::fs::create_dir_all(dir).map_err(|e| AlignError::io("create directory", dir, e))?;

    let table = dir.join(format!("{prefix}_table.csv"));
    write_table_csv(&table, &run.table)?;

    let fits = dir.join(format!("{prefix}_fits.csv"));
    write_groups_csv(&fits, &run.groups)?;

    let averaged = dir.join(format!("{}.csv", run.averaged.name));
    write_curve_csv(&averaged, &run.averaged)?;

    let written = vec![table, fits, averaged];
    info!(dir = %dir.display(), files = written.len(), "wrote CSV exports");
    Ok(written)
}
