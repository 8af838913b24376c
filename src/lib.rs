//! `sunspot-forecast` library crate.
//!
//! The binary (`sunspot`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - the model can be reused outside the dashboard (exports, notebooks, etc.)
//! - presentation (HTML, terminal) stays separate from fitting

pub mod app;
pub mod cli;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
