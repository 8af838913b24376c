//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`Variant`, `SeasonalityToggle`, `Frequency`)
//! - observation / forecast / residual rows
//! - fitted-model export records (`ModelFile`)

pub mod types;

pub use types::*;
