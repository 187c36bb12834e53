//! Planning module for sync operations.
//!
//! This module compares desired and current state and turns the
//! difference into an ordered plan that can be previewed or applied.

mod diff;
mod executor;
mod plan;

pub use diff::{DiffEngine, DiffMode, DiffResult};
pub use executor::{OperationOutcome, PlanExecutor};
pub use plan::{ChangeKind, PlannedChange, PlannedChangeView, SyncPlan};
