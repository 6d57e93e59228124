//! Collapse references that would fetch the same (link, version).

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::reference::{ModuleAddress, ModuleReference};

/// One reference per address, ordered by first appearance of the address.
/// When an address repeats, the last reference seen replaces the earlier one;
/// all of them fetch the same module so the choice only affects the target dir.
pub fn distinct_modules(
    references: impl IntoIterator<Item = ModuleReference>,
) -> Vec<ModuleReference> {
    let mut index: HashMap<ModuleAddress, usize> = HashMap::new();
    let mut out: Vec<ModuleReference> = Vec::new();
    for reference in references {
        match index.entry(reference.address()) {
            Entry::Occupied(slot) => out[*slot.get()] = reference,
            Entry::Vacant(slot) => {
                slot.insert(out.len());
                out.push(reference);
            }
        }
    }
    out
}
