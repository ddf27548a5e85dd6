//! Deal progression engine for property development appraisals.
//!
//! Walks a caller through the four-step assessment sequence (PD route, GDV,
//! build cost, finance), persists partial progress as a `Deal` record, and
//! captures standalone calculator submissions for lead follow-up. The
//! document store, identity provider, and narrative-insight generator are
//! collaborator seams expressed as traits; the engine itself performs no I/O
//! beyond those seams.

pub mod deal;
pub mod error;
pub mod identity;
pub mod insights;
pub mod store;
pub mod submissions;

pub use error::EngineError;

/// Standard result type for all engine operations
pub type EngineResult<T> = Result<T, EngineError>;
