//! Collision-aware batch planner.
//!
//! The same link at two versions usually means the same repository, and two
//! concurrent checkouts of one repository are not safe. Each batch therefore
//! holds at most one reference per link.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::reference::ModuleReference;

/// Set of references that may be fetched concurrently. Keyed by link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Batch {
    modules: BTreeMap<String, ModuleReference>,
}

impl Batch {
    pub fn contains_link(&self, link: &str) -> bool {
        self.modules.contains_key(link)
    }

    pub fn get(&self, link: &str) -> Option<&ModuleReference> {
        self.modules.get(link)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// References in link order.
    pub fn references(&self) -> impl Iterator<Item = &ModuleReference> {
        self.modules.values()
    }

    fn insert(&mut self, reference: ModuleReference) {
        debug_assert!(!self.contains_link(reference.link()));
        self.modules.insert(reference.link().to_string(), reference);
    }
}

/// Greedy first-fit: each reference goes into the first batch (left to right)
/// that does not hold its link yet, or into a new trailing batch.
///
/// Because a link always fills a contiguous prefix of the batches, this is the
/// same as placing it right after the last batch that already holds the link.
pub fn plan_batches(references: impl IntoIterator<Item = ModuleReference>) -> Vec<Batch> {
    let mut batches: Vec<Batch> = Vec::new();
    for reference in references {
        match batches.iter().position(|b| !b.contains_link(reference.link())) {
            Some(i) => batches[i].insert(reference),
            None => {
                let mut batch = Batch::default();
                batch.insert(reference);
                batches.push(batch);
            }
        }
    }
    tracing::debug!(
        "planned {} batch(es): sizes {:?}",
        batches.len(),
        batches.iter().map(Batch::len).collect::<Vec<_>>()
    );
    batches
}
