pub mod error;
pub mod types;

#[cfg(feature = "planning")]
pub mod planning;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "costing")]
pub mod costing;

#[cfg(feature = "finance")]
pub mod finance;

pub use error::PropdevError;
pub use types::*;

/// Standard result type for all propdev calculations
pub type PropdevResult<T> = Result<T, PropdevError>;
