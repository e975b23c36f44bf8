//! Added/removed entity keys between two states of a model.
//!
//! Because keys include the `changed` flag, an entity mutated since the old
//! state shows up as removed (old key) and added (new key); consumers that
//! apply a diff incrementally should remove before adding.

use crate::signature::ModelSignature;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelDiff {
    /// Keys present in the new state but not in the old one.
    pub added: ModelSignature,
    /// Keys present in the old state but not in the new one.
    pub removed: ModelSignature,
}

impl ModelDiff {
    pub fn between(new: &ModelSignature, old: &ModelSignature) -> Self {
        Self {
            added: difference(new, old),
            removed: difference(old, new),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

fn difference(a: &ModelSignature, b: &ModelSignature) -> ModelSignature {
    ModelSignature {
        buses: a.buses.difference(&b.buses).cloned().collect(),
        lines: a.lines.difference(&b.lines).cloned().collect(),
        transformers: a.transformers.difference(&b.transformers).cloned().collect(),
        generators: a.generators.difference(&b.generators).cloned().collect(),
        loads: a.loads.difference(&b.loads).cloned().collect(),
        storage_units: a.storage_units.difference(&b.storage_units).cloned().collect(),
    }
}
