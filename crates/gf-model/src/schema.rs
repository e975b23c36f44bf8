//! Grid file schema definitions.
//!
//! A grid file is a direct YAML serialization of a [`Model`]: flat lists of
//! buses, edges and injections, plus an optional snapshot list.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builder::ModelBuilder;
use crate::entity::{
    Bus, BusControl, Entity, Generator, Line, Load, StorageUnit, Transformer, TransformerModel,
};
use crate::error::ModelResult;
use crate::model::Model;
use crate::snapshot::Snapshots;

fn yes() -> bool {
    true
}

fn one() -> f64 {
    1.0
}

fn big() -> f64 {
    1_000_000.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GridDef {
    #[serde(default)]
    pub buses: Vec<BusDef>,
    #[serde(default)]
    pub lines: Vec<LineDef>,
    #[serde(default)]
    pub transformers: Vec<TransformerDef>,
    #[serde(default)]
    pub generators: Vec<GeneratorDef>,
    #[serde(default)]
    pub loads: Vec<LoadDef>,
    #[serde(default)]
    pub storage_units: Vec<StorageUnitDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<Snapshots>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusDef {
    pub name: String,
    pub v_nom: f64,
    #[serde(default)]
    pub control: BusControl,
    #[serde(default = "yes")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineDef {
    pub name: String,
    pub bus0: String,
    pub bus1: String,
    #[serde(default)]
    pub r: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub s_nom: f64,
    #[serde(default = "yes")]
    pub s_nom_extendable: bool,
    #[serde(default)]
    pub length: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_type: Option<String>,
    #[serde(default = "yes")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformerDef {
    pub name: String,
    pub bus0: String,
    pub bus1: String,
    #[serde(default)]
    pub r: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub s_nom: f64,
    #[serde(default)]
    pub s_nom_extendable: bool,
    #[serde(default)]
    pub model: TransformerModel,
    #[serde(default = "yes")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratorDef {
    pub name: String,
    pub bus: String,
    #[serde(default)]
    pub p_nom: f64,
    #[serde(default)]
    pub p_set: f64,
    #[serde(default)]
    pub q_set: f64,
    #[serde(default)]
    pub p_min_pu: f64,
    #[serde(default = "one")]
    pub p_max_pu: f64,
    #[serde(default)]
    pub p_nom_min: f64,
    #[serde(default = "big")]
    pub p_nom_max: f64,
    #[serde(default)]
    pub marginal_cost: f64,
    #[serde(default)]
    pub p_nom_extendable: bool,
    #[serde(default = "yes")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadDef {
    pub name: String,
    pub bus: String,
    #[serde(default)]
    pub p_set: f64,
    #[serde(default)]
    pub q_set: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default = "yes")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageUnitDef {
    pub name: String,
    pub bus: String,
    #[serde(default)]
    pub p_nom: f64,
    #[serde(default)]
    pub p_nom_min: f64,
    #[serde(default = "big")]
    pub p_nom_max: f64,
    #[serde(default)]
    pub p_nom_extendable: bool,
    #[serde(default)]
    pub marginal_cost: f64,
    #[serde(default)]
    pub state_of_charge_initial: f64,
    #[serde(default = "yes")]
    pub active: bool,
}

impl GridDef {
    /// Build and validate the model described by this file.
    pub fn to_model(&self) -> ModelResult<Model> {
        let mut builder = ModelBuilder::new();

        for def in &self.buses {
            let bus = builder.add_bus(Bus::new(&def.name, def.v_nom).with_control(def.control));
            bus.write().set_active(def.active);
        }
        for def in &self.lines {
            let mut line = Line::new(&def.name, &def.bus0, &def.bus1)
                .with_impedance(def.r, def.x)
                .with_s_nom(def.s_nom)
                .with_s_nom_extendable(def.s_nom_extendable)
                .with_length(def.length);
            if let Some(line_type) = &def.line_type {
                line = line.with_line_type(line_type);
            }
            builder.add_line(line).write().set_active(def.active);
        }
        for def in &self.transformers {
            let transformer = Transformer::new(&def.name, &def.bus0, &def.bus1)
                .with_impedance(def.r, def.x)
                .with_s_nom(def.s_nom)
                .with_s_nom_extendable(def.s_nom_extendable)
                .with_model(def.model);
            builder.add_transformer(transformer).write().set_active(def.active);
        }
        for def in &self.generators {
            let generator = Generator::new(&def.name, &def.bus)
                .with_p_nom(def.p_nom)
                .with_p_set(def.p_set)
                .with_q_set(def.q_set)
                .with_pu_limits(def.p_min_pu, def.p_max_pu)
                .with_p_nom_range(def.p_nom_min, def.p_nom_max)
                .with_marginal_cost(def.marginal_cost)
                .with_p_nom_extendable(def.p_nom_extendable);
            builder.add_generator(generator).write().set_active(def.active);
        }
        for def in &self.loads {
            let mut load = Load::new(&def.name, &def.bus)
                .with_p_set(def.p_set)
                .with_q_set(def.q_set);
            if let Some(carrier) = &def.carrier {
                load = load.with_carrier(carrier);
            }
            builder.add_load(load).write().set_active(def.active);
        }
        for def in &self.storage_units {
            let storage = StorageUnit::new(&def.name, &def.bus)
                .with_p_nom(def.p_nom)
                .with_p_nom_range(def.p_nom_min, def.p_nom_max)
                .with_p_nom_extendable(def.p_nom_extendable)
                .with_marginal_cost(def.marginal_cost)
                .with_state_of_charge_initial(def.state_of_charge_initial);
            builder.add_storage_unit(storage).write().set_active(def.active);
        }

        let model = builder.build()?;
        // A freshly loaded grid has nothing pending.
        model.reset_changed_components();
        Ok(model)
    }

    /// Snapshot list of the file, or the single synthetic index.
    pub fn snapshots(&self) -> Snapshots {
        self.snapshots.clone().unwrap_or_default()
    }
}

pub fn parse_grid_yaml(content: &str) -> ModelResult<GridDef> {
    Ok(serde_yaml::from_str(content)?)
}

pub fn load_grid_yaml(path: &Path) -> ModelResult<GridDef> {
    let content = std::fs::read_to_string(path)?;
    parse_grid_yaml(&content)
}

pub fn save_grid_yaml(path: &Path, grid: &GridDef) -> ModelResult<()> {
    let content = serde_yaml::to_string(grid)?;
    std::fs::write(path, content)?;
    Ok(())
}
