//! Numerical kernels: interpolation, linear and nonlinear least squares.

pub mod interp;
pub mod lm;
pub mod ols;

pub use interp::*;
pub use lm::*;
pub use ols::*;
