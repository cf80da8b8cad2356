//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of an alignment in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - aligned curves: one marker per curve (`o`, `x`, `+`, ...)
//! - averaged curve: `-` line, drawn underneath the markers

use crate::domain::{AlignmentFile, OutputCurve, ViewKind};

const MARKERS: [char; 6] = ['o', 'x', '+', '*', '#', '@'];

/// Axis scaling. Log axes drop non-positive samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlotScale {
    pub log_x: bool,
    pub log_y: bool,
}

impl PlotScale {
    fn map(self, x: f64, y: f64) -> Option<(f64, f64)> {
        let x = if self.log_x { positive_log10(x)? } else { x };
        let y = if self.log_y { positive_log10(y)? } else { y };
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }
}

fn positive_log10(v: f64) -> Option<f64> {
    (v > 0.0).then(|| v.log10())
}

/// Plot one view group of a result file with the averaged curve overlaid.
pub fn render_alignment_plot(
    result: &AlignmentFile,
    view: ViewKind,
    width: usize,
    height: usize,
    scale: PlotScale,
) -> String {
    let curves: &[OutputCurve] = result
        .groups
        .iter()
        .find(|g| g.view == view)
        .map(|g| g.curves.as_slice())
        .unwrap_or(&[]);
    render_overlay(curves, Some(&result.averaged), width, height, scale)
}

/// Render curves as markers plus an optional line curve.
pub fn render_overlay(
    curves: &[OutputCurve],
    line: Option<&OutputCurve>,
    width: usize,
    height: usize,
    scale: PlotScale,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let series: Vec<Vec<(f64, f64)>> = curves.iter().map(|c| mapped(c, scale)).collect();
    let line_points = line.map(|c| mapped(c, scale)).unwrap_or_default();

    let all = series.iter().flatten().chain(line_points.iter());
    let Some((x_min, x_max, y_min, y_max)) = bounds(all) else {
        return "Plot: no plottable points\n".to_string();
    };
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);
    let (x_min, x_max) = if x_max > x_min { (x_min, x_max) } else { pad_range(x_min, x_max, 0.05) };

    let mut grid = vec![vec![' '; width]; height];

    // Line first so markers overlay it.
    let mut prev = None;
    for &(x, y) in &line_points {
        let cx = map_x(x, x_min, x_max, width);
        let cy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(&mut grid, x0, y0, cx, cy, '-'),
            None => grid[cy][cx] = '-',
        }
        prev = Some((cx, cy));
    }

    for (idx, points) in series.iter().enumerate() {
        let marker = MARKERS[idx % MARKERS.len()];
        for &(x, y) in points {
            grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)] = marker;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {}=[{x_min:.4}, {x_max:.4}] | {}=[{y_min:.4}, {y_max:.4}]\n",
        if scale.log_x { "log10(x)" } else { "x" },
        if scale.log_y { "log10(y)" } else { "y" },
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    for (idx, curve) in curves.iter().enumerate() {
        out.push_str(&format!("{} {}\n", MARKERS[idx % MARKERS.len()], curve.name));
    }
    if let Some(line) = line {
        out.push_str(&format!("- {}\n", line.name));
    }
    out
}

fn mapped(curve: &OutputCurve, scale: PlotScale) -> Vec<(f64, f64)> {
    curve
        .x
        .iter()
        .zip(&curve.y)
        .filter_map(|(&x, &y)| scale.map(x, y))
        .collect()
}

fn bounds<'a>(points: impl Iterator<Item = &'a (f64, f64)>) -> Option<(f64, f64, f64, f64)> {
    let mut b = (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        b.0 = b.0.min(x);
        b.1 = b.1.max(x);
        b.2 = b.2.min(y);
        b.3 = b.3.max(y);
    }
    (b.0.is_finite() && b.1.is_finite()).then_some(b)
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y max is row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham). Only fills blank cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(name: &str, x: &[f64], y: &[f64]) -> OutputCurve {
        OutputCurve {
            name: name.into(),
            x: x.to_vec(),
            y: y.to_vec(),
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let points = curve("s1", &[1.0, 10.0], &[1.0, 10.0]);
        let avg = curve("avg", &[1.0, 10.0], &[5.5, 5.5]);

        let txt = render_overlay(&[points], Some(&avg), 10, 5, PlotScale::default());
        let expected = concat!(
            "Plot: x=[1.0000, 10.0000] | y=[0.5500, 10.4500]\n",
            "         o\n",
            "          \n",
            "----------\n",
            "          \n",
            "o         \n",
            "o s1\n",
            "- avg\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn log_axes_skip_non_positive_samples() {
        let c = curve("c", &[0.0, 1.0, 10.0, 100.0], &[5.0, 1.0, -1.0, 100.0]);
        let txt = render_overlay(&[c], None, 10, 5, PlotScale { log_x: true, log_y: true });
        assert!(txt.starts_with("Plot: log10(x)=[0.0000, 2.0000] | log10(y)="));
        let markers = txt.lines().skip(1).take(5).flat_map(|l| l.chars()).filter(|&ch| ch == 'o').count();
        assert_eq!(markers, 2);
    }

    #[test]
    fn empty_input_is_reported() {
        assert_eq!(
            render_overlay(&[], None, 20, 10, PlotScale::default()),
            "Plot: no plottable points\n"
        );
    }
}
