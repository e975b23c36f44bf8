//! Solver-side network built from a segment model.
//!
//! The [`NetworkBuilder`] keeps its own copy of the parameters of every
//! active entity, keyed by name. The first build (and any build after the
//! snapshot count changed) constructs the network from scratch; later builds
//! drop what the [`ModelDiff`] against the previously built state reports as
//! removed and re-read the parameters of everything else, so a slot that keeps
//! receiving the same segment only rewrites what moved.

use std::collections::{BTreeMap, BTreeSet};

use gf_core::Timer;
use gf_model::{
    Branch, Bus, Entity, EntityKey, Generator, Injection, Load, Model, ModelDiff, ModelSignature,
    Shared, Snapshots, StorageUnit,
};
use serde::Serialize;
use tracing::debug;

use crate::error::{SolverError, SolverResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetBus {
    pub v_nom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetBranch {
    pub bus0: String,
    pub bus1: String,
    pub r: f64,
    pub x: f64,
    pub s_nom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetGenerator {
    pub bus: String,
    pub p_nom: f64,
    pub p_set: f64,
    pub p_min_pu: f64,
    pub p_max_pu: f64,
    pub marginal_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetLoad {
    pub bus: String,
    pub p_set: f64,
    pub q_set: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetStorage {
    pub bus: String,
    pub p_nom: f64,
    pub marginal_cost: f64,
}

/// Parameters of every active entity of a segment, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Network {
    pub snapshot_count: usize,
    pub buses: BTreeMap<String, NetBus>,
    pub lines: BTreeMap<String, NetBranch>,
    pub transformers: BTreeMap<String, NetBranch>,
    pub generators: BTreeMap<String, NetGenerator>,
    pub loads: BTreeMap<String, NetLoad>,
    pub storage_units: BTreeMap<String, NetStorage>,
}

impl Network {
    pub fn has_generation(&self) -> bool {
        !self.generators.is_empty() || !self.storage_units.is_empty()
    }

    /// Position of every bus in name order.
    pub fn bus_positions(&self) -> BTreeMap<&str, usize> {
        self.buses
            .keys()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect()
    }

    fn clear(&mut self) {
        self.buses.clear();
        self.lines.clear();
        self.transformers.clear();
        self.generators.clear();
        self.loads.clear();
        self.storage_units.clear();
    }

    fn check_references(&self) -> SolverResult<()> {
        let branches = self
            .lines
            .iter()
            .map(|(name, b)| ("line", name, b))
            .chain(self.transformers.iter().map(|(name, b)| ("transformer", name, b)));
        for (kind, name, branch) in branches {
            for bus in [&branch.bus0, &branch.bus1] {
                if !self.buses.contains_key(bus) {
                    return Err(unknown_bus(kind, name, bus));
                }
            }
        }

        let injections = self
            .generators
            .iter()
            .map(|(name, g)| ("generator", name, &g.bus))
            .chain(self.loads.iter().map(|(name, l)| ("load", name, &l.bus)))
            .chain(self.storage_units.iter().map(|(name, s)| ("storage unit", name, &s.bus)));
        for (kind, name, bus) in injections {
            if !self.buses.contains_key(bus) {
                return Err(unknown_bus(kind, name, bus));
            }
        }
        Ok(())
    }
}

fn unknown_bus(kind: &str, name: &str, bus: &str) -> SolverError {
    SolverError::UnknownBus {
        entity: format!("{kind} {name}"),
        bus: bus.to_string(),
    }
}

fn net_bus(bus: &Bus) -> NetBus {
    NetBus { v_nom: bus.v_nom() }
}

fn net_branch<T: Branch>(branch: &T) -> NetBranch {
    NetBranch {
        bus0: branch.bus0().to_string(),
        bus1: branch.bus1().to_string(),
        r: branch.r(),
        x: branch.x(),
        s_nom: branch.s_nom(),
    }
}

fn net_generator(generator: &Generator) -> NetGenerator {
    NetGenerator {
        bus: generator.bus0().to_string(),
        p_nom: generator.p_nom(),
        p_set: generator.p_set(),
        p_min_pu: generator.p_min_pu(),
        p_max_pu: generator.p_max_pu(),
        marginal_cost: generator.marginal_cost(),
    }
}

fn net_load(load: &Load) -> NetLoad {
    NetLoad {
        bus: load.bus0().to_string(),
        p_set: load.p_set(),
        q_set: load.q_set(),
    }
}

fn net_storage(storage: &StorageUnit) -> NetStorage {
    NetStorage {
        bus: storage.bus0().to_string(),
        p_nom: storage.p_nom(),
        marginal_cost: storage.marginal_cost(),
    }
}

/// Insert every active entity.
fn fill<T: Entity, N>(
    entities: &[Shared<T>],
    target: &mut BTreeMap<String, N>,
    convert: impl Fn(&T) -> N,
) {
    for entity in entities {
        let entity = entity.read();
        if entity.is_active() {
            target.insert(entity.name().to_string(), convert(&*entity));
        }
    }
}

/// Drop removed keys, then re-read every active entity of the input and
/// keep the ones whose parameters differ from the built network.
///
/// The `changed` flag is not consulted: it is cleared after every round, and
/// the segment may have been solved on another slot in between.
fn patch<T: Entity, N: PartialEq>(
    entities: &[Shared<T>],
    removed: &BTreeSet<EntityKey>,
    target: &mut BTreeMap<String, N>,
    convert: impl Fn(&T) -> N,
) -> usize {
    let mut touched = 0;
    for key in removed {
        if target.remove(&key.name).is_some() {
            touched += 1;
        }
    }

    for entity in entities {
        let entity = entity.read();
        if !entity.is_active() {
            if target.remove(entity.name()).is_some() {
                touched += 1;
            }
            continue;
        }
        let fresh = convert(&*entity);
        if target.get(entity.name()) != Some(&fresh) {
            target.insert(entity.name().to_string(), fresh);
            touched += 1;
        }
    }
    touched
}

/// Builds and maintains the [`Network`] of one worker slot.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    input: Model,
    snapshots: Snapshots,
    network: Network,
    previous: Option<ModelSignature>,
    build_time_s: f64,
    full_rebuilds: usize,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input_model(&mut self, model: Model) {
        self.input = model;
    }

    pub fn set_snapshots(&mut self, snapshots: Snapshots) {
        self.snapshots = snapshots;
    }

    pub fn input(&self) -> &Model {
        &self.input
    }

    pub fn snapshots(&self) -> &Snapshots {
        &self.snapshots
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn build_time_s(&self) -> f64 {
        self.build_time_s
    }

    /// Number of from-scratch builds so far.
    pub fn full_rebuilds(&self) -> usize {
        self.full_rebuilds
    }

    pub fn build(&mut self) -> SolverResult<()> {
        let timer = Timer::start("network build");
        let signature = self.input.signature();

        let incremental = match self.previous.take() {
            Some(previous) if self.network.snapshot_count == self.snapshots.len() => {
                Some(ModelDiff::between(&signature, &previous))
            }
            _ => None,
        };

        match incremental {
            Some(diff) => {
                let touched = self.apply(&diff);
                debug!(touched, "network updated incrementally");
            }
            None => {
                self.rebuild();
                debug!(
                    buses = self.network.buses.len(),
                    snapshots = self.network.snapshot_count,
                    "network rebuilt"
                );
            }
        }

        self.build_time_s = timer.stop();
        self.network.check_references()?;
        self.previous = Some(signature);
        Ok(())
    }

    fn rebuild(&mut self) {
        let network = &mut self.network;
        network.clear();
        network.snapshot_count = self.snapshots.len();
        fill(self.input.buses(), &mut network.buses, net_bus);
        fill(self.input.lines(), &mut network.lines, net_branch);
        fill(self.input.transformers(), &mut network.transformers, net_branch);
        fill(self.input.generators(), &mut network.generators, net_generator);
        fill(self.input.loads(), &mut network.loads, net_load);
        fill(self.input.storage_units(), &mut network.storage_units, net_storage);
        self.full_rebuilds += 1;
    }

    fn apply(&mut self, diff: &ModelDiff) -> usize {
        let (input, network) = (&self.input, &mut self.network);
        let removed = &diff.removed;
        patch(input.buses(), &removed.buses, &mut network.buses, net_bus)
            + patch(input.lines(), &removed.lines, &mut network.lines, net_branch)
            + patch(
                input.transformers(),
                &removed.transformers,
                &mut network.transformers,
                net_branch,
            )
            + patch(
                input.generators(),
                &removed.generators,
                &mut network.generators,
                net_generator,
            )
            + patch(input.loads(), &removed.loads, &mut network.loads, net_load)
            + patch(
                input.storage_units(),
                &removed.storage_units,
                &mut network.storage_units,
                net_storage,
            )
    }
}
