//! Turning scanned references into an ordered fetch plan.
//!
//! Scanner output → distinct addresses → batches in which no module link
//! appears twice. Batches run one after another; entries of a batch run in
//! parallel.

mod batch;
mod dedup;

pub use batch::{plan_batches, Batch};
pub use dedup::distinct_modules;

use crate::reference::ModuleReference;

/// Deduplicates and batches in one step.
pub fn plan(references: impl IntoIterator<Item = ModuleReference>) -> Vec<Batch> {
    plan_batches(distinct_modules(references))
}
