pub mod costing;
pub mod finance;
pub mod planning;
pub mod valuation;
