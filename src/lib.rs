//! `iq-superimpose` library crate.
//!
//! Aligns a set of I(Q) curves onto a reference curve by fitting a scale `K`
//! and offset `B` per curve (`reference ≈ K * curve - B`), then averages the
//! aligned curves.
//!
//! The binary (`superimpose`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the pipeline can be driven directly with in-memory curves

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod store;

pub use app::pipeline::{AlignmentRun, run_alignment};
pub use domain::{AlignConfig, RawCurve};
pub use error::AlignError;
