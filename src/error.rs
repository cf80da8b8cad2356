//! Error type shared by the library and the `superimpose` binary.
//!
//! Every variant maps to a process exit code so `main` can stay tiny:
//!
//! - `2`: bad configuration, malformed input data, file I/O
//! - `3`: the curves have no usable overlap
//! - `4`: fitting or averaging failed

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlignError {
    /// Invalid combination of user settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed curve data.
    #[error("curve '{curve}': {message}")]
    DataShape { curve: String, message: String },

    /// No positive-signal overlap across the curves.
    #[error("no common positive-signal range: {0}")]
    EmptyOverlap(String),

    /// The nonlinear solver failed for one curve.
    #[error("fit of curve '{curve}' failed (K={k}, B={b}): {reason}")]
    FitConvergence {
        curve: String,
        k: f64,
        b: f64,
        reason: String,
    },

    /// A union x-value had no contributing curve during averaging.
    #[error("averaging: no curve contributes a value at x={x}")]
    AveragingAmbiguity { x: f64 },

    /// Results were requested before every curve was fitted.
    #[error("curve '{0}' has not been fitted")]
    Unfitted(String),

    #[error("failed to {action} '{}': {message}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        message: String,
    },
}

impl AlignError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn shape(curve: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataShape {
            curve: curve.into(),
            message: message.into(),
        }
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Io {
            action,
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AlignError::Configuration(_) | AlignError::DataShape { .. } | AlignError::Io { .. } => 2,
            AlignError::EmptyOverlap(_) => 3,
            AlignError::FitConvergence { .. }
            | AlignError::AveragingAmbiguity { .. }
            | AlignError::Unfitted(_) => 4,
        }
    }
}
