//! Input/output helpers.
//!
//! - curve ingest from CSV or JSON (`ingest`)
//! - CSV exports of a finished run (`export`)
//! - result JSON read/write (`result`)

pub mod export;
pub mod ingest;
pub mod result;

pub use export::*;
pub use ingest::*;
pub use result::*;
