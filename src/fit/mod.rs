//! Model fitting orchestration.
//!
//! Responsibilities:
//!
//! - register seasonalities and fit the additive model (`forecaster`)
//! - build the forecast horizon (`horizon`)
//! - simulate prediction intervals in parallel (`uncertainty`)

pub mod forecaster;
pub mod horizon;
pub mod uncertainty;

pub use forecaster::*;
pub use horizon::*;
pub use uncertainty::*;
