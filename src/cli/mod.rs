//! Command-line parsing for the `superimpose` curve aligner.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_PREFIX, GoodnessMode, ViewKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "superimpose",
    version,
    about = "Align I(Q) curves onto a reference by fitting scale K and offset B"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Align curve files, print the parameter table, and write exports.
    Align(AlignArgs),
    /// Plot a previously written result JSON.
    Plot(PlotArgs),
    /// Generate a synthetic curve set with known K/B and write it as CSV files.
    Demo(DemoArgs),
}

/// Terminal plot options shared by `align` and `plot`.
#[derive(Debug, Args, Clone)]
pub struct PlotOptions {
    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Use log10 axes (non-positive samples are skipped).
    #[arg(long)]
    pub log: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct AlignArgs {
    /// Curve files: CSV (one curve each) or JSON (array of curves).
    #[arg(required = true, value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Reference curve name (defaults to the first curve loaded).
    #[arg(short = 'r', long)]
    pub reference: Option<String>,

    /// Lower bound of the fit window.
    #[arg(long)]
    pub q_min: Option<f64>,

    /// Upper bound of the fit window.
    #[arg(long)]
    pub q_max: Option<f64>,

    /// Positive samples dropped from the start of each trimmed view.
    #[arg(long, default_value_t = 0)]
    pub discard_begin: usize,

    /// Positive samples dropped from the end of each trimmed view.
    #[arg(long, default_value_t = 0)]
    pub discard_end: usize,

    /// Fixed K: one value, or one per non-reference curve (comma separated).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub fixed_k: Vec<f64>,

    /// Fixed B: one value, or one per non-reference curve (comma separated).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub fixed_b: Vec<f64>,

    /// Prefix for output names.
    #[arg(short = 'p', long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Directory for CSV exports (skipped when absent).
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Write the result JSON here.
    #[arg(long, value_name = "JSON")]
    pub json: Option<PathBuf>,

    /// Total sum of squares convention for the goodness of fit.
    #[arg(long, value_enum, default_value_t = GoodnessMode::FittedMean)]
    pub goodness: GoodnessMode,

    /// Fit curves on the rayon thread pool.
    #[arg(long)]
    pub parallel: bool,

    /// Solver iteration cap.
    #[arg(long, default_value_t = 200)]
    pub max_iterations: usize,

    /// Render the trimmed fits in the terminal.
    #[arg(long)]
    pub plot: bool,

    #[command(flatten)]
    pub plot_options: PlotOptions,
}

/// Options for plotting a saved result.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Result JSON produced by `superimpose align --json`.
    #[arg(value_name = "JSON")]
    pub result: PathBuf,

    /// Which fitted view to draw.
    #[arg(long, value_enum, default_value_t = ViewKind::Trimmed)]
    pub view: ViewKind,

    #[command(flatten)]
    pub plot_options: PlotOptions,
}

#[derive(Debug, Parser)]
pub struct DemoArgs {
    /// Number of curves (the first is the reference).
    #[arg(short = 'n', long, default_value_t = 4)]
    pub count: usize,

    /// Points per curve.
    #[arg(long, default_value_t = 200)]
    pub points: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Relative Gaussian noise on intensities.
    #[arg(long, default_value_t = 0.01)]
    pub noise: f64,

    /// Directory that receives one CSV per curve.
    #[arg(short = 'o', long, default_value = "demo-curves")]
    pub output_dir: PathBuf,
}
