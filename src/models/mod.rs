//! Additive model building blocks.
//!
//! Components are implemented as small, pure functions so that the fitter can
//! assemble one design matrix from them and evaluate predictions the same way.

pub mod seasonality;
pub mod trend;

pub use seasonality::*;
pub use trend::*;
