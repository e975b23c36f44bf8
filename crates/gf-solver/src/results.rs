//! Solved values, their write-back into the entity model, and JSON export.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use gf_model::{Branch, Entity, Injection, Model, Shared};
use serde::Serialize;

use crate::error::SolverResult;
use crate::method::CalculationMethod;
use crate::network::Network;

/// Per-snapshot values of one calculation, keyed by entity name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolveResults {
    pub snapshot_count: usize,
    pub lines: BTreeMap<String, Vec<f64>>,
    pub transformers: BTreeMap<String, Vec<f64>>,
    pub generators: BTreeMap<String, Vec<f64>>,
    pub loads: BTreeMap<String, Vec<f64>>,
    pub storage_units: BTreeMap<String, Vec<f64>>,
}

impl SolveResults {
    pub fn new(snapshot_count: usize) -> Self {
        Self {
            snapshot_count,
            ..Self::default()
        }
    }

    /// Write values into the outputs of the matching active entities of `model`.
    pub fn write_back(&self, model: &Model, network: &Network) {
        write_branches(model.lines(), &self.lines);
        write_branches(model.transformers(), &self.transformers);
        for transformer in model.transformers() {
            let mut transformer = transformer.write();
            if let Some(net) = network.transformers.get(transformer.name()) {
                transformer.set_capacity(net.s_nom);
            }
        }
        write_injections(model.generators(), &self.generators);
        write_injections(model.loads(), &self.loads);
        write_injections(model.storage_units(), &self.storage_units);
    }
}

fn write_branches<T: Branch>(entities: &[Shared<T>], values: &BTreeMap<String, Vec<f64>>) {
    for entity in entities {
        let mut entity = entity.write();
        if !entity.is_active() {
            continue;
        }
        if let Some(values) = values.get(entity.name()) {
            entity.outputs_mut().set(values.clone());
        }
    }
}

fn write_injections<T: Injection>(entities: &[Shared<T>], values: &BTreeMap<String, Vec<f64>>) {
    for entity in entities {
        let mut entity = entity.write();
        if !entity.is_active() {
            continue;
        }
        if let Some(values) = values.get(entity.name()) {
            entity.outputs_mut().set(values.clone());
        }
    }
}

/// Status of the last calculation of a solver.
#[derive(Debug, Clone, Default)]
pub struct SolveState {
    pub status: String,
    pub condition: String,
    pub calculation_time_s: f64,
    pub results: SolveResults,
}

impl SolveState {
    pub fn set(&mut self, status: &str, condition: &str) {
        self.status = status.to_string();
        self.condition = condition.to_string();
    }
}

#[derive(Serialize)]
struct ExportedResults<'a> {
    method: CalculationMethod,
    status: &'a str,
    condition: &'a str,
    calculation_time_s: f64,
    results: &'a SolveResults,
}

/// Write `network.json` and `results.json` below `dir`, creating it if needed.
pub fn export_json(
    dir: &Path,
    method: CalculationMethod,
    network: &Network,
    state: &SolveState,
) -> SolverResult<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("network.json"), serde_json::to_string_pretty(network)?)?;
    let exported = ExportedResults {
        method,
        status: &state.status,
        condition: &state.condition,
        calculation_time_s: state.calculation_time_s,
        results: &state.results,
    };
    fs::write(dir.join("results.json"), serde_json::to_string_pretty(&exported)?)?;
    Ok(())
}
