pub mod engine;
pub mod record;

pub use engine::{DealEngine, NewDeal};
pub use record::{
    BuildCostStep, Deal, DealId, DealPatch, DealStatus, FinanceStep, GdvStep, PdStep, StepRecord,
    StepSubmission,
};
