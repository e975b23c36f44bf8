//! Model validation logic.

use std::collections::HashSet;

use gf_core::ensure_finite;

use crate::entity::{Branch, Entity, Injection, Shared};
use crate::error::{ModelError, ModelResult};
use crate::model::Model;

/// Validate the model: unique names per kind, every bus reference resolves,
/// no edge connects a bus to itself, numeric parameters are finite.
pub(crate) fn validate_model(model: &Model) -> ModelResult<()> {
    let bus_names = unique_names(model.buses())?;
    unique_names(model.lines())?;
    unique_names(model.transformers())?;
    unique_names(model.generators())?;
    unique_names(model.loads())?;
    unique_names(model.storage_units())?;

    check_branches(model.lines(), &bus_names)?;
    check_branches(model.transformers(), &bus_names)?;

    check_injections(model.generators(), &bus_names)?;
    check_injections(model.loads(), &bus_names)?;
    check_injections(model.storage_units(), &bus_names)?;

    for generator in model.generators() {
        let g = generator.read();
        let values = [
            ("p_nom", g.p_nom()),
            ("p_set", g.p_set()),
            ("marginal_cost", g.marginal_cost()),
        ];
        check_finite(&*g, &values)?;
    }
    for load in model.loads() {
        let l = load.read();
        check_finite(&*l, &[("p_set", l.p_set()), ("q_set", l.q_set())])?;
    }
    for storage in model.storage_units() {
        let s = storage.read();
        let values = [("p_nom", s.p_nom()), ("marginal_cost", s.marginal_cost())];
        check_finite(&*s, &values)?;
    }

    Ok(())
}

fn check_finite<T: Entity>(entity: &T, values: &[(&'static str, f64)]) -> ModelResult<()> {
    for &(what, value) in values {
        ensure_finite(value, what).map_err(|source| ModelError::NonFinite {
            kind: entity.kind(),
            name: entity.name().to_string(),
            source,
        })?;
    }
    Ok(())
}

fn unique_names<T: Entity>(entities: &[Shared<T>]) -> ModelResult<HashSet<String>> {
    let mut seen = HashSet::with_capacity(entities.len());
    for entity in entities {
        let entity = entity.read();
        if !seen.insert(entity.name().to_string()) {
            return Err(ModelError::DuplicateName {
                kind: entity.kind(),
                name: entity.name().to_string(),
            });
        }
    }
    Ok(seen)
}

fn check_branches<T: Branch>(edges: &[Shared<T>], buses: &HashSet<String>) -> ModelResult<()> {
    for edge in edges {
        let edge = edge.read();
        for bus in [edge.bus0(), edge.bus1()] {
            if !buses.contains(bus) {
                return Err(ModelError::UnknownBus {
                    kind: edge.kind(),
                    entity: edge.name().to_string(),
                    bus: bus.to_string(),
                });
            }
        }
        check_finite(&*edge, &[("r", edge.r()), ("x", edge.x()), ("s_nom", edge.s_nom())])?;
        if edge.bus0() == edge.bus1() {
            return Err(ModelError::SelfLoop {
                kind: edge.kind(),
                name: edge.name().to_string(),
                bus: edge.bus0().to_string(),
            });
        }
    }
    Ok(())
}

fn check_injections<T: Injection>(
    injections: &[Shared<T>],
    buses: &HashSet<String>,
) -> ModelResult<()> {
    for injection in injections {
        let injection = injection.read();
        if !buses.contains(injection.bus0()) {
            return Err(ModelError::UnknownBus {
                kind: injection.kind(),
                entity: injection.name().to_string(),
                bus: injection.bus0().to_string(),
            });
        }
    }
    Ok(())
}
