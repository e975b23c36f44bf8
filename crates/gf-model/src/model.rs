//! The grid model aggregate.

use crate::entity::{
    Branch, Bus, Entity, Generator, Injection, Line, Load, Shared, StorageUnit, Transformer,
};
use crate::signature::ModelSignature;

/// Flat lists of buses, edges and point injections.
///
/// A `Model` holds shared handles, so cloning it or segmenting it re-groups
/// the same entities rather than copying them. Values reached through a
/// segment are the values of the combined model.
///
/// Construct through [`ModelBuilder`](crate::ModelBuilder), which validates
/// that names are unique and every bus reference resolves.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub(crate) buses: Vec<Shared<Bus>>,
    pub(crate) lines: Vec<Shared<Line>>,
    pub(crate) transformers: Vec<Shared<Transformer>>,
    pub(crate) generators: Vec<Shared<Generator>>,
    pub(crate) loads: Vec<Shared<Load>>,
    pub(crate) storage_units: Vec<Shared<StorageUnit>>,
}

impl Model {
    /// An empty model.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buses(&self) -> &[Shared<Bus>] {
        &self.buses
    }

    pub fn lines(&self) -> &[Shared<Line>] {
        &self.lines
    }

    pub fn transformers(&self) -> &[Shared<Transformer>] {
        &self.transformers
    }

    pub fn generators(&self) -> &[Shared<Generator>] {
        &self.generators
    }

    pub fn loads(&self) -> &[Shared<Load>] {
        &self.loads
    }

    pub fn storage_units(&self) -> &[Shared<StorageUnit>] {
        &self.storage_units
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    /// Lines plus transformers.
    pub fn edge_count(&self) -> usize {
        self.lines.len() + self.transformers.len()
    }

    pub fn injection_count(&self) -> usize {
        self.generators.len() + self.loads.len() + self.storage_units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
            && self.lines.is_empty()
            && self.transformers.is_empty()
            && self.generators.is_empty()
            && self.loads.is_empty()
            && self.storage_units.is_empty()
    }

    pub fn bus(&self, name: &str) -> Option<&Shared<Bus>> {
        self.buses.iter().find(|bus| bus.read().name() == name)
    }

    pub fn bus_names(&self) -> Vec<String> {
        self.buses
            .iter()
            .map(|bus| bus.read().name().to_string())
            .collect()
    }

    /// True if at least one active generator or storage unit is present.
    pub fn has_generation(&self) -> bool {
        self.generators.iter().any(|g| g.read().is_active())
            || self.storage_units.iter().any(|s| s.read().is_active())
    }

    /// Current `(name, changed)` key sets of every entity.
    pub fn signature(&self) -> ModelSignature {
        ModelSignature::of(self)
    }

    /// Clear the `changed` flag of every entity.
    pub fn reset_changed_components(&self) {
        for bus in &self.buses {
            bus.write().clear_changed();
        }
        for line in &self.lines {
            line.write().clear_changed();
        }
        for transformer in &self.transformers {
            transformer.write().clear_changed();
        }
        for generator in &self.generators {
            generator.write().clear_changed();
        }
        for load in &self.loads {
            load.write().clear_changed();
        }
        for storage in &self.storage_units {
            storage.write().clear_changed();
        }
    }

    /// Reset every edge and injection output to `snapshot_count` empty values.
    pub fn reset_outputs(&self, snapshot_count: usize) {
        for line in &self.lines {
            line.write().outputs_mut().reset(snapshot_count);
        }
        for transformer in &self.transformers {
            transformer.write().outputs_mut().reset(snapshot_count);
        }
        for generator in &self.generators {
            generator.write().outputs_mut().reset(snapshot_count);
        }
        for load in &self.loads {
            load.write().outputs_mut().reset(snapshot_count);
        }
        for storage in &self.storage_units {
            storage.write().outputs_mut().reset(snapshot_count);
        }
    }

    /// Drop all entity handles.
    pub fn clear(&mut self) {
        self.buses.clear();
        self.lines.clear();
        self.transformers.clear();
        self.generators.clear();
        self.loads.clear();
        self.storage_units.clear();
    }

    /// Solved generator and storage output at `snapshot`.
    pub fn total_generation(&self, snapshot: usize) -> f64 {
        sum_outputs(&self.generators, snapshot) + sum_outputs(&self.storage_units, snapshot)
    }

    /// Solved load at `snapshot`.
    pub fn total_load(&self, snapshot: usize) -> f64 {
        sum_outputs(&self.loads, snapshot)
    }
}

fn sum_outputs<T: Injection>(entities: &[Shared<T>], snapshot: usize) -> f64 {
    entities
        .iter()
        .filter_map(|entity| {
            let entity = entity.read();
            if entity.is_active() {
                entity.outputs().value(snapshot)
            } else {
                None
            }
        })
        .sum()
}
