//! Curve file ingest.
//!
//! Two input formats are accepted:
//!
//! - **CSV**, one curve per file, named after the file stem. Columns are matched
//!   case-insensitively: `x`/`q` (required), `y`/`i`/`intensity` (required),
//!   `e`/`err`/`error`/`dy` (optional, zeros when absent). A final row that has
//!   an x but an empty y is taken as the closing bin edge, making the x column
//!   histogram edges.
//! - **JSON**, an array of `RawCurve` objects (`name`, `x`, `y`, optional `e`).
//!
//! Parsing is strict: a malformed row fails the whole file with its line
//! number, since a silently shortened curve would shift the fit.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use crate::domain::RawCurve;
use crate::error::AlignError;

const X_NAMES: [&str; 2] = ["x", "q"];
const Y_NAMES: [&str; 3] = ["y", "i", "intensity"];
const E_NAMES: [&str; 4] = ["e", "err", "error", "dy"];

/// Load curves from a list of files, dispatching on extension.
pub fn load_curves(paths: &[impl AsRef<Path>]) -> Result<Vec<RawCurve>, AlignError> {
    let mut out = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            out.extend(load_curves_json(path)?);
        } else {
            out.push(load_curve_csv(path)?);
        }
    }
    Ok(out)
}

/// Read a JSON array of curves.
pub fn load_curves_json(path: &Path) -> Result<Vec<RawCurve>, AlignError> {
    let file = File::open(path).map_err(|e| AlignError::io("open", path, e))?;
    let curves: Vec<RawCurve> =
        serde_json::from_reader(file).map_err(|e| AlignError::io("parse", path, e))?;
    debug!(path = %path.display(), curves = curves.len(), "loaded curve JSON");
    Ok(curves)
}

/// Read a single-curve CSV.
pub fn load_curve_csv(path: &Path) -> Result<RawCurve, AlignError> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("curve")
        .to_string();
    let file = File::open(path).map_err(|e| AlignError::io("open", path, e))?;
    let curve = parse_curve_csv(&name, file)?;
    debug!(path = %path.display(), points = curve.y.len(), "loaded curve CSV");
    Ok(curve)
}

/// Parse curve CSV from any reader.
pub fn parse_curve_csv(name: &str, reader: impl std::io::Read) -> Result<RawCurve, AlignError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AlignError::shape(name, format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let x_col = find_column(&header_map, &X_NAMES)
        .ok_or_else(|| AlignError::shape(name, "missing x column (expected 'x' or 'q')"))?;
    let y_col = find_column(&header_map, &Y_NAMES)
        .ok_or_else(|| AlignError::shape(name, "missing y column (expected 'y', 'i' or 'intensity')"))?;
    let e_col = find_column(&header_map, &E_NAMES);

    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut e = Vec::new();
    let mut closed_by_edge = false;

    for (idx, result) in reader.records().enumerate() {
        // +2: header line plus 1-based numbering.
        let line = idx + 2;
        let record = result.map_err(|err| AlignError::shape(name, format!("line {line}: CSV parse error: {err}")))?;
        if closed_by_edge {
            return Err(AlignError::shape(
                name,
                format!("line {line}: data after the closing bin edge"),
            ));
        }

        let xv = parse_field(name, &record, x_col, line, "x")?
            .ok_or_else(|| AlignError::shape(name, format!("line {line}: empty x")))?;
        match parse_field(name, &record, y_col, line, "y")? {
            Some(yv) => {
                x.push(xv);
                y.push(yv);
                let ev = match e_col {
                    Some(col) => parse_field(name, &record, col, line, "e")?.unwrap_or(0.0),
                    None => 0.0,
                };
                e.push(ev);
            }
            None => {
                x.push(xv);
                closed_by_edge = true;
            }
        }
    }

    Ok(RawCurve::new(name, x, y, e))
}

fn parse_field(
    name: &str,
    record: &StringRecord,
    col: usize,
    line: usize,
    label: &str,
) -> Result<Option<f64>, AlignError> {
    let Some(raw) = record.get(col) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| AlignError::shape(name, format!("line {line}: invalid {label} value '{raw}'")))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn find_column(map: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|n| map.get(*n).copied())
}
