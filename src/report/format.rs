//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::app::pipeline::AlignmentRun;
use crate::domain::{AlignConfig, ParameterTable};

/// Format the run summary (window, reference, parameter table).
pub fn format_run_summary(run: &AlignmentRun, config: &AlignConfig) -> String {
    let mut out = String::new();

    out.push_str("=== superimpose - I(Q) curve alignment ===\n");
    out.push_str(&format!("Curves: {}\n", run.store.len()));
    out.push_str(&format!("Reference: {}\n", run.reference));
    out.push_str(&format!(
        "Fit window: [{:.6}, {:.6}]\n",
        run.range.min, run.range.max
    ));
    if !config.fixed_k.is_empty() {
        out.push_str(&format!("Fixed K: {}\n", fmt_vec(&config.fixed_k)));
    }
    if !config.fixed_b.is_empty() {
        out.push_str(&format!("Fixed B: {}\n", fmt_vec(&config.fixed_b)));
    }
    out.push_str(&format!(
        "Discard: begin={} end={} | goodness={:?}\n",
        config.discard_begin, config.discard_end, config.goodness
    ));

    out.push('\n');
    out.push_str(&format_parameter_table(&run.table));
    out.push('\n');

    out.push_str("Outputs:\n");
    for group in &run.groups {
        out.push_str(&format!("- {} ({} curves)\n", group.name, group.curves.len()));
    }
    out.push_str(&format!(
        "- {} ({} points)\n",
        run.averaged.name,
        run.averaged.x.len()
    ));

    out
}

/// Format the parameter table with the exported column names.
pub fn format_parameter_table(table: &ParameterTable) -> String {
    let mut out = String::new();
    let [c0, c1, c2, c3, c4, c5] = ParameterTable::COLUMNS;
    out.push_str(
        format!("{c0:<24} {c1:>12} {c2:>12} {c3:>12} {c4:>12} {c5:>14}\n").trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<24} {:-<12} {:-<12} {:-<12} {:-<12} {:-<14}\n",
            "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in &table.rows {
        out.push_str(
            format!(
                "{:<24} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>14.6}\n",
                truncate(&r.iq_curve, 24),
                r.k,
                r.k_error,
                r.b,
                r.b_error,
                r.goodness_of_fit,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
