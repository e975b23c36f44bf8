//! Immutable key-set snapshots of a model, used for partition diffing.
//!
//! A [`ModelSignature`] records the `(name, changed)` key of every entity in
//! a model at one point in time. Comparing signatures is the same as comparing
//! the entity sets themselves, because entity equality is keyed on exactly
//! that pair; unlike live handles, a signature is not affected by later
//! mutations, so it can serve as the cached "previous partition".

use std::collections::BTreeSet;

use crate::entity::{Entity, EntityKey, Shared};
use crate::model::Model;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSignature {
    pub buses: BTreeSet<EntityKey>,
    pub lines: BTreeSet<EntityKey>,
    pub transformers: BTreeSet<EntityKey>,
    pub generators: BTreeSet<EntityKey>,
    pub loads: BTreeSet<EntityKey>,
    pub storage_units: BTreeSet<EntityKey>,
}

fn keys<T: Entity>(entities: &[Shared<T>]) -> BTreeSet<EntityKey> {
    entities.iter().map(|entity| entity.read().key()).collect()
}

impl ModelSignature {
    pub fn of(model: &Model) -> Self {
        Self {
            buses: keys(model.buses()),
            lines: keys(model.lines()),
            transformers: keys(model.transformers()),
            generators: keys(model.generators()),
            loads: keys(model.loads()),
            storage_units: keys(model.storage_units()),
        }
    }

    /// Same bus set and same line set.
    pub fn structure_eq(&self, other: &Self) -> bool {
        self.buses == other.buses && self.lines == other.lines
    }

    /// Same generator, load, storage unit and transformer sets.
    pub fn components_eq(&self, other: &Self) -> bool {
        self.generators == other.generators
            && self.loads == other.loads
            && self.storage_units == other.storage_units
            && self.transformers == other.transformers
    }

    /// Both predicates hold: the segment needs no recomputation.
    pub fn matches(&self, other: &Self) -> bool {
        self.structure_eq(other) && self.components_eq(other)
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
            && self.lines.is_empty()
            && self.transformers.is_empty()
            && self.generators.is_empty()
            && self.loads.is_empty()
            && self.storage_units.is_empty()
    }

    /// Total number of keys across all kinds.
    pub fn len(&self) -> usize {
        self.buses.len()
            + self.lines.len()
            + self.transformers.len()
            + self.generators.len()
            + self.loads.len()
            + self.storage_units.len()
    }
}

/// Structural equality of two models: same buses and lines.
pub fn compare_model_structure(a: &Model, b: &Model) -> bool {
    keys(a.buses()) == keys(b.buses()) && keys(a.lines()) == keys(b.lines())
}

/// Component equality of two models: same injections and transformers.
pub fn compare_model_components(a: &Model, b: &Model) -> bool {
    keys(a.generators()) == keys(b.generators())
        && keys(a.loads()) == keys(b.loads())
        && keys(a.storage_units()) == keys(b.storage_units())
        && keys(a.transformers()) == keys(b.transformers())
}
