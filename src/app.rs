//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads curve files
//! - runs the alignment pipeline
//! - prints the summary and an optional plot
//! - writes optional exports

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::cli::{AlignArgs, Command, DemoArgs, PlotArgs, PlotOptions};
use crate::domain::{AlignConfig, SolverConfig, ViewKind};
use crate::error::AlignError;
use crate::plot::PlotScale;

pub mod pipeline;

/// Entry point for the `superimpose` binary.
pub fn run() -> Result<(), AlignError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Align(args) => handle_align(args),
        Command::Plot(args) => handle_plot(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_align(args: AlignArgs) -> Result<(), AlignError> {
    let config = align_config_from_args(&args);
    let raw = crate::io::load_curves(&args.inputs)?;
    let run = pipeline::run_alignment(raw, &config)?;

    println!("{}", crate::report::format_run_summary(&run, &config));

    let result = crate::io::alignment_file(&run, &config);
    if args.plot {
        println!("{}", render(&result, ViewKind::Trimmed, &args.plot_options));
    }

    if let Some(dir) = &args.output_dir {
        crate::io::write_run_exports(dir, &config.output_prefix, &run)?;
    }
    if let Some(path) = &args.json {
        crate::io::write_alignment_json(path, &result)?;
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AlignError> {
    let result = crate::io::read_alignment_json(&args.result)?;
    println!("{}", render(&result, args.view, &args.plot_options));
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AlignError> {
    let spec = crate::data::SampleSpec {
        count: args.count,
        points: args.points,
        seed: args.seed,
        noise: args.noise,
        ..crate::data::SampleSpec::default()
    };
    let set = crate::data::generate_sample(&spec)?;

    let dir = &args.output_dir;
    std::fs::create_dir_all(dir).map_err(|e| AlignError::io("create directory", dir, e))?;
    let mut written: Vec<PathBuf> = Vec::with_capacity(set.curves.len());
    for curve in &set.curves {
        let path = dir.join(format!("{}.csv", curve.name));
        crate::io::write_raw_curve_csv(&path, curve)?;
        written.push(path);
    }
    info!(dir = %dir.display(), curves = written.len(), seed = args.seed, "wrote demo curves");

    println!("{:<12} {:>10} {:>10}", "curve", "K", "B");
    for t in &set.truth {
        println!("{:<12} {:>10.6} {:>10.6}", t.name, t.k, t.b);
    }
    Ok(())
}

fn render(result: &crate::domain::AlignmentFile, view: ViewKind, opts: &PlotOptions) -> String {
    let scale = PlotScale {
        log_x: opts.log,
        log_y: opts.log,
    };
    crate::plot::render_alignment_plot(result, view, opts.width, opts.height, scale)
}

pub fn align_config_from_args(args: &AlignArgs) -> AlignConfig {
    AlignConfig {
        reference: args.reference.clone(),
        q_min: args.q_min,
        q_max: args.q_max,
        discard_begin: args.discard_begin,
        discard_end: args.discard_end,
        fixed_k: args.fixed_k.clone(),
        fixed_b: args.fixed_b.clone(),
        output_prefix: args.prefix.clone(),
        goodness: args.goodness,
        parallel: args.parallel,
        solver: SolverConfig {
            max_iterations: args.max_iterations,
            ..SolverConfig::default()
        },
    }
}
