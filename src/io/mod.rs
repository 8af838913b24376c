//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - forecast / residual / model exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
