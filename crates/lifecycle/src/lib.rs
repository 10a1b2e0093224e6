//! Order lifecycle engine.
//!
//! This crate owns the transaction boundary for every order operation. Each
//! call opens one unit of work, lets the order decide its transition, applies
//! the resulting stock and customer changes, saves the order and commits.
//! Any failure rolls everything back before the error is returned.
//!
//! The transitions are:
//! 1. complete: Draft → Completed, reserving stock
//! 2. deliver: Completed → Delivered, accruing purchase stats
//! 3. revert_to_draft: Completed → Draft, optionally releasing stock
//! 4. return_order: Delivered → Returned, with caller-chosen reversals

pub mod catalog;
pub mod engine;
pub mod error;

pub use catalog::Catalog;
pub use engine::{LifecycleEngine, TransitionOutcome};
pub use error::{LifecycleError, Result};
