//! Curve alignment stages.
//!
//! Responsibilities:
//!
//! - find the common positive-signal fit window (`range`)
//! - build the fit-window and trimmed views per curve (`trim`)
//! - hand out fixed K/B values round-robin (`cursor`)
//! - solve `(K, B)` per curve against the reference (`fitter`)

pub mod cursor;
pub mod fitter;
pub mod range;
pub mod trim;

pub use cursor::*;
pub use fitter::*;
pub use range::*;
pub use trim::*;
