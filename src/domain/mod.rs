//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input containers (`RawCurve`) and per-curve views (`CurveView`)
//! - fit policies and outcomes (`ParamPolicy`, `FitOutcome`, `FitState`)
//! - run configuration (`AlignConfig`, `SolverConfig`)
//! - output artifacts (`CurveGroup`, `ParameterTable`, `AlignmentFile`)

pub mod types;

pub use types::*;
