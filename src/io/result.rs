//! Read/write alignment result JSON.
//!
//! The result file is the portable record of a run:
//! - reference name, fit window and goodness convention
//! - the parameter table
//! - every fitted curve group plus the averaged curve
//!
//! `superimpose plot` reads it back without refitting. The schema is
//! `domain::AlignmentFile`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::app::pipeline::AlignmentRun;
use crate::domain::{AlignConfig, AlignmentFile};
use crate::error::AlignError;

pub const TOOL_NAME: &str = "superimpose";

/// Snapshot a finished run into the serializable result schema.
pub fn alignment_file(run: &AlignmentRun, config: &AlignConfig) -> AlignmentFile {
    AlignmentFile {
        tool: TOOL_NAME.to_string(),
        prefix: config.output_prefix.clone(),
        reference: run.reference.clone(),
        range: run.range,
        goodness: config.goodness,
        table: run.table.clone(),
        groups: run.groups.clone(),
        averaged: run.averaged.clone(),
    }
}

/// Write a result JSON file.
pub fn write_alignment_json(path: &Path, result: &AlignmentFile) -> Result<(), AlignError> {
    let file = File::create(path).map_err(|e| AlignError::io("create", path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result).map_err(|e| AlignError::io("write", path, e))?;
    writer.flush().map_err(|e| AlignError::io("write", path, e))?;
    info!(path = %path.display(), "wrote result JSON");
    Ok(())
}

/// Read a result JSON file.
pub fn read_alignment_json(path: &Path) -> Result<AlignmentFile, AlignError> {
    let file = File::open(path).map_err(|e| AlignError::io("open", path, e))?;
    let result: AlignmentFile = serde_json::from_reader(file).map_err(|e| AlignError::io("parse", path, e))?;
    if result.tool != TOOL_NAME {
        return Err(AlignError::io(
            "parse",
            path,
            format!("not a {TOOL_NAME} result file (tool = '{}')", result.tool),
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_alignment;
    use crate::domain::{RawCurve, ViewKind};

    #[test]
    fn result_file_survives_disk() {
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let r = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let c: Vec<f64> = r.iter().map(|v| (v + 1.0) / 2.0).collect();
        let config = AlignConfig::default();
        let run = run_alignment(
            vec![RawCurve::points("R", x.clone(), r), RawCurve::points("C", x, c)],
            &config,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        write_alignment_json(&path, &alignment_file(&run, &config)).unwrap();

        let back = read_alignment_json(&path).unwrap();
        assert_eq!(back.reference, "R");
        assert_eq!(back.table, run.table);
        assert_eq!(back.groups.len(), 3);
        assert_eq!(back.groups[1].view, ViewKind::Trimmed);
        assert_eq!(back.averaged.name, "iq_trimmed_fit_averaged");
    }

    #[test]
    fn written_file_is_complete_json() {
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let config = AlignConfig::default();
        let run = run_alignment(
            vec![
                RawCurve::points("a", x.clone(), vec![2.0, 3.0, 4.0, 5.0]),
                RawCurve::points("b", x, vec![1.0, 1.5, 2.0, 2.5]),
            ],
            &config,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested.json");
        write_alignment_json(&path, &alignment_file(&run, &config)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.trim_end().ends_with('}'));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["tool"], TOOL_NAME);
        assert_eq!(value["groups"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn foreign_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.json");
        std::fs::write(&path, "{\"tool\":\"rv\"}").unwrap();
        assert!(matches!(read_alignment_json(&path), Err(AlignError::Io { .. })));
    }
}
