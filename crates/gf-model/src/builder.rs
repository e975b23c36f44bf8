//! Incremental model builder.

use crate::entity::{Bus, Generator, Line, Load, Shared, StorageUnit, Transformer, shared};
use crate::error::ModelResult;
use crate::model::Model;
use crate::validate;

/// Builder for constructing a model incrementally.
///
/// Each `add_*` call wraps the entity into a shared handle and returns it, so
/// the caller can keep mutating the entity after the model is built. The
/// `add_shared_*` variants register a handle that already exists (for example
/// one taken from another model).
#[derive(Debug, Default)]
pub struct ModelBuilder {
    model: Model,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bus(&mut self, bus: Bus) -> Shared<Bus> {
        self.add_shared_bus(shared(bus))
    }

    pub fn add_line(&mut self, line: Line) -> Shared<Line> {
        self.add_shared_line(shared(line))
    }

    pub fn add_transformer(&mut self, transformer: Transformer) -> Shared<Transformer> {
        self.add_shared_transformer(shared(transformer))
    }

    pub fn add_generator(&mut self, generator: Generator) -> Shared<Generator> {
        self.add_shared_generator(shared(generator))
    }

    pub fn add_load(&mut self, load: Load) -> Shared<Load> {
        self.add_shared_load(shared(load))
    }

    pub fn add_storage_unit(&mut self, storage: StorageUnit) -> Shared<StorageUnit> {
        self.add_shared_storage_unit(shared(storage))
    }

    pub fn add_shared_bus(&mut self, bus: Shared<Bus>) -> Shared<Bus> {
        self.model.buses.push(bus.clone());
        bus
    }

    pub fn add_shared_line(&mut self, line: Shared<Line>) -> Shared<Line> {
        self.model.lines.push(line.clone());
        line
    }

    pub fn add_shared_transformer(&mut self, transformer: Shared<Transformer>) -> Shared<Transformer> {
        self.model.transformers.push(transformer.clone());
        transformer
    }

    pub fn add_shared_generator(&mut self, generator: Shared<Generator>) -> Shared<Generator> {
        self.model.generators.push(generator.clone());
        generator
    }

    pub fn add_shared_load(&mut self, load: Shared<Load>) -> Shared<Load> {
        self.model.loads.push(load.clone());
        load
    }

    pub fn add_shared_storage_unit(&mut self, storage: Shared<StorageUnit>) -> Shared<StorageUnit> {
        self.model.storage_units.push(storage.clone());
        storage
    }

    /// Register every handle of `model`.
    pub fn extend_from(&mut self, model: &Model) {
        self.model.buses.extend(model.buses.iter().cloned());
        self.model.lines.extend(model.lines.iter().cloned());
        self.model.transformers.extend(model.transformers.iter().cloned());
        self.model.generators.extend(model.generators.iter().cloned());
        self.model.loads.extend(model.loads.iter().cloned());
        self.model.storage_units.extend(model.storage_units.iter().cloned());
    }

    /// Validate and return the model.
    pub fn build(self) -> ModelResult<Model> {
        validate::validate_model(&self.model)?;
        Ok(self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::error::ModelError;

    #[test]
    fn build_simple_model() {
        let mut builder = ModelBuilder::new();
        builder.add_bus(Bus::new("a", 0.4));
        builder.add_bus(Bus::new("b", 0.4));
        builder.add_transformer(Transformer::new("t", "a", "b"));
        let model = builder.build().unwrap();
        assert_eq!(model.bus_count(), 2);
        assert_eq!(model.transformers().len(), 1);
    }

    #[test]
    fn handles_stay_live_after_build() {
        let mut builder = ModelBuilder::new();
        let bus = builder.add_bus(Bus::new("a", 0.4));
        let model = builder.build().unwrap();
        bus.write().set_v_nom(20.0);
        assert_eq!(model.buses()[0].read().v_nom(), 20.0);
        assert!(model.buses()[0].read().is_changed());
    }

    #[test]
    fn rejects_unknown_bus() {
        let mut builder = ModelBuilder::new();
        builder.add_bus(Bus::new("a", 0.4));
        builder.add_load(Load::new("l", "missing"));
        assert!(matches!(
            builder.build(),
            Err(ModelError::UnknownBus { kind: "load", .. })
        ));
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut builder = ModelBuilder::new();
        builder.add_bus(Bus::new("a", 0.4));
        builder.add_bus(Bus::new("a", 0.4));
        assert!(matches!(
            builder.build(),
            Err(ModelError::DuplicateName { kind: "bus", .. })
        ));
    }

    #[test]
    fn same_name_across_kinds_is_fine() {
        let mut builder = ModelBuilder::new();
        builder.add_bus(Bus::new("x", 0.4));
        builder.add_generator(Generator::new("x", "x"));
        assert!(builder.build().is_ok());
    }
}
