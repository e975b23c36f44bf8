//! Grid entities: buses, edges (lines, transformers) and point injections
//! (generators, loads, storage units).
//!
//! Every entity carries an [`EntityState`] with its unique name, an `active`
//! flag and a `changed` flag. Equality and hashing of every entity are keyed
//! on `(name, changed)` only, so two snapshots of the same untouched entity
//! compare equal while any mutation makes them differ.
//!
//! Entities are shared between the combined model and its segments through
//! [`Shared`] handles; segmentation re-groups handles and never copies data.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Shared, lockable handle to an entity.
pub type Shared<T> = Arc<RwLock<T>>;

/// Wrap an entity into a [`Shared`] handle.
pub fn shared<T>(entity: T) -> Shared<T> {
    Arc::new(RwLock::new(entity))
}

/// Identity of an entity for diffing: its name and its "needs recompute" flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub name: String,
    pub changed: bool,
}

impl EntityKey {
    pub fn new(name: impl Into<String>, changed: bool) -> Self {
        Self {
            name: name.into(),
            changed,
        }
    }
}

/// State shared by every entity kind.
#[derive(Debug, Clone)]
pub struct EntityState {
    name: String,
    active: bool,
    changed: bool,
}

impl EntityState {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            changed: false,
        }
    }

    /// Assign `value` to `field`, flagging the entity as changed if it differs.
    fn update<T: PartialEq>(&mut self, field: &mut T, value: T) {
        if *field != value {
            *field = value;
            self.changed = true;
        }
    }
}

/// Common behaviour of all grid entities.
pub trait Entity {
    fn state(&self) -> &EntityState;
    fn state_mut(&mut self) -> &mut EntityState;

    /// Kind label used in logs and errors.
    fn kind(&self) -> &'static str;

    fn name(&self) -> &str {
        &self.state().name
    }

    fn is_active(&self) -> bool {
        self.state().active
    }

    fn is_changed(&self) -> bool {
        self.state().changed
    }

    /// Activate or deactivate the entity. Marks it changed if the flag flips.
    fn set_active(&mut self, active: bool) {
        let state = self.state_mut();
        if state.active != active {
            state.active = active;
            state.changed = true;
        }
    }

    fn mark_changed(&mut self) {
        self.state_mut().changed = true;
    }

    fn clear_changed(&mut self) {
        self.state_mut().changed = false;
    }

    fn key(&self) -> EntityKey {
        EntityKey::new(self.name(), self.is_changed())
    }
}

/// Per-snapshot outputs written by a solver after a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outputs {
    active_power: Vec<f64>,
    output: Vec<bool>,
}

impl Default for Outputs {
    fn default() -> Self {
        Self {
            active_power: vec![0.0],
            output: vec![false],
        }
    }
}

impl Outputs {
    /// Clear to `snapshot_count` zero values without output.
    pub fn reset(&mut self, snapshot_count: usize) {
        self.active_power.clear();
        self.active_power.resize(snapshot_count, 0.0);
        self.output.clear();
        self.output.resize(snapshot_count, false);
    }

    /// Store one solved value per snapshot and flag them as valid.
    pub fn set(&mut self, values: Vec<f64>) {
        self.output = vec![true; values.len()];
        self.active_power = values;
    }

    pub fn active_power(&self) -> &[f64] {
        &self.active_power
    }

    pub fn output(&self) -> &[bool] {
        &self.output
    }

    /// Value at `snapshot`, if a solver produced one.
    pub fn value(&self, snapshot: usize) -> Option<f64> {
        match self.output.get(snapshot) {
            Some(true) => self.active_power.get(snapshot).copied(),
            _ => None,
        }
    }
}

/// Entities attached to exactly one bus.
pub trait Injection: Entity {
    fn bus0(&self) -> &str;
    fn outputs(&self) -> &Outputs;
    fn outputs_mut(&mut self) -> &mut Outputs;
}

/// Entities connecting two buses.
pub trait Branch: Entity {
    fn bus0(&self) -> &str;
    fn bus1(&self) -> &str;
    /// Series resistance.
    fn r(&self) -> f64;
    /// Series reactance.
    fn x(&self) -> f64;
    /// Nominal apparent power capacity.
    fn s_nom(&self) -> f64;
    fn outputs(&self) -> &Outputs;
    fn outputs_mut(&mut self) -> &mut Outputs;
}

macro_rules! impl_entity {
    ($ty:ident, $kind:literal) => {
        impl Entity for $ty {
            fn state(&self) -> &EntityState {
                &self.state
            }

            fn state_mut(&mut self) -> &mut EntityState {
                &mut self.state
            }

            fn kind(&self) -> &'static str {
                $kind
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.state.name == other.state.name && self.state.changed == other.state.changed
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.state.name.hash(state);
                self.state.changed.hash(state);
            }
        }
    };
}

macro_rules! impl_injection {
    ($ty:ident) => {
        impl Injection for $ty {
            fn bus0(&self) -> &str {
                &self.bus0
            }

            fn outputs(&self) -> &Outputs {
                &self.outputs
            }

            fn outputs_mut(&mut self) -> &mut Outputs {
                &mut self.outputs
            }
        }
    };
}

macro_rules! impl_branch {
    ($ty:ident) => {
        impl Branch for $ty {
            fn bus0(&self) -> &str {
                &self.bus0
            }

            fn bus1(&self) -> &str {
                &self.bus1
            }

            fn r(&self) -> f64 {
                self.r
            }

            fn x(&self) -> f64 {
                self.x
            }

            fn s_nom(&self) -> f64 {
                self.s_nom
            }

            fn outputs(&self) -> &Outputs {
                &self.outputs
            }

            fn outputs_mut(&mut self) -> &mut Outputs {
                &mut self.outputs
            }
        }
    };
}

/// P,Q,V control strategy of a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BusControl {
    #[default]
    PQ,
    PV,
    Slack,
}

/// A connection point with a nominal voltage.
#[derive(Debug, Clone)]
pub struct Bus {
    state: EntityState,
    v_nom: f64,
    control: BusControl,
}

impl Bus {
    pub fn new(name: impl Into<String>, v_nom: f64) -> Self {
        Self {
            state: EntityState::new(name),
            v_nom,
            control: BusControl::default(),
        }
    }

    pub fn with_control(mut self, control: BusControl) -> Self {
        self.control = control;
        self
    }

    pub fn v_nom(&self) -> f64 {
        self.v_nom
    }

    pub fn control(&self) -> BusControl {
        self.control
    }

    pub fn set_v_nom(&mut self, v_nom: f64) {
        self.state.update(&mut self.v_nom, v_nom);
    }
}

impl_entity!(Bus, "bus");

/// A power line between two buses.
#[derive(Debug, Clone)]
pub struct Line {
    state: EntityState,
    bus0: String,
    bus1: String,
    r: f64,
    x: f64,
    s_nom: f64,
    s_nom_extendable: bool,
    length: f64,
    line_type: Option<String>,
    outputs: Outputs,
}

impl Line {
    pub fn new(name: impl Into<String>, bus0: impl Into<String>, bus1: impl Into<String>) -> Self {
        Self {
            state: EntityState::new(name),
            bus0: bus0.into(),
            bus1: bus1.into(),
            r: 0.0,
            x: 0.0,
            s_nom: 0.0,
            s_nom_extendable: true,
            length: 0.0,
            line_type: None,
            outputs: Outputs::default(),
        }
    }

    pub fn with_impedance(mut self, r: f64, x: f64) -> Self {
        self.r = r;
        self.x = x;
        self
    }

    pub fn with_s_nom(mut self, s_nom: f64) -> Self {
        self.s_nom = s_nom;
        self
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    pub fn with_line_type(mut self, line_type: impl Into<String>) -> Self {
        self.line_type = Some(line_type.into());
        self
    }

    pub fn with_s_nom_extendable(mut self, extendable: bool) -> Self {
        self.s_nom_extendable = extendable;
        self
    }

    pub fn s_nom_extendable(&self) -> bool {
        self.s_nom_extendable
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn line_type(&self) -> Option<&str> {
        self.line_type.as_deref()
    }

    pub fn set_impedance(&mut self, r: f64, x: f64) {
        self.state.update(&mut self.r, r);
        self.state.update(&mut self.x, x);
    }

    pub fn set_s_nom(&mut self, s_nom: f64) {
        self.state.update(&mut self.s_nom, s_nom);
    }
}

impl_entity!(Line, "line");
impl_branch!(Line);

/// Admittance model of a transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformerModel {
    #[default]
    T,
    Pi,
}

/// A transformer between two buses (typically bus0 is the higher voltage side).
#[derive(Debug, Clone)]
pub struct Transformer {
    state: EntityState,
    bus0: String,
    bus1: String,
    r: f64,
    x: f64,
    s_nom: f64,
    s_nom_extendable: bool,
    model: TransformerModel,
    outputs: Outputs,
    capacity: f64,
}

impl Transformer {
    pub fn new(name: impl Into<String>, bus0: impl Into<String>, bus1: impl Into<String>) -> Self {
        Self {
            state: EntityState::new(name),
            bus0: bus0.into(),
            bus1: bus1.into(),
            r: 0.0,
            x: 0.0,
            s_nom: 0.0,
            s_nom_extendable: false,
            model: TransformerModel::default(),
            outputs: Outputs::default(),
            capacity: 0.0,
        }
    }

    pub fn with_impedance(mut self, r: f64, x: f64) -> Self {
        self.r = r;
        self.x = x;
        self
    }

    pub fn with_s_nom(mut self, s_nom: f64) -> Self {
        self.s_nom = s_nom;
        self
    }

    pub fn with_model(mut self, model: TransformerModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_s_nom_extendable(mut self, extendable: bool) -> Self {
        self.s_nom_extendable = extendable;
        self
    }

    pub fn s_nom_extendable(&self) -> bool {
        self.s_nom_extendable
    }

    pub fn model(&self) -> TransformerModel {
        self.model
    }

    /// Capacity reported by the last successful solve.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: f64) {
        self.capacity = capacity;
    }

    pub fn set_impedance(&mut self, r: f64, x: f64) {
        self.state.update(&mut self.r, r);
        self.state.update(&mut self.x, x);
    }

    pub fn set_s_nom(&mut self, s_nom: f64) {
        self.state.update(&mut self.s_nom, s_nom);
    }
}

impl_entity!(Transformer, "transformer");
impl_branch!(Transformer);

/// A dispatchable or fixed generator.
#[derive(Debug, Clone)]
pub struct Generator {
    state: EntityState,
    bus0: String,
    p_nom: f64,
    p_set: f64,
    q_set: f64,
    p_min_pu: f64,
    p_max_pu: f64,
    p_nom_min: f64,
    p_nom_max: f64,
    marginal_cost: f64,
    p_nom_extendable: bool,
    outputs: Outputs,
}

impl Generator {
    pub fn new(name: impl Into<String>, bus0: impl Into<String>) -> Self {
        Self {
            state: EntityState::new(name),
            bus0: bus0.into(),
            p_nom: 0.0,
            p_set: 0.0,
            q_set: 0.0,
            p_min_pu: 0.0,
            p_max_pu: 1.0,
            p_nom_min: 0.0,
            p_nom_max: 1_000_000.0,
            marginal_cost: 0.0,
            p_nom_extendable: false,
            outputs: Outputs::default(),
        }
    }

    pub fn with_p_nom(mut self, p_nom: f64) -> Self {
        self.p_nom = p_nom;
        self
    }

    pub fn with_p_set(mut self, p_set: f64) -> Self {
        self.p_set = p_set;
        self
    }

    pub fn with_q_set(mut self, q_set: f64) -> Self {
        self.q_set = q_set;
        self
    }

    pub fn with_pu_limits(mut self, p_min_pu: f64, p_max_pu: f64) -> Self {
        self.p_min_pu = p_min_pu;
        self.p_max_pu = p_max_pu;
        self
    }

    pub fn with_p_nom_range(mut self, p_nom_min: f64, p_nom_max: f64) -> Self {
        self.p_nom_min = p_nom_min;
        self.p_nom_max = p_nom_max;
        self
    }

    pub fn with_marginal_cost(mut self, marginal_cost: f64) -> Self {
        self.marginal_cost = marginal_cost;
        self
    }

    pub fn with_p_nom_extendable(mut self, extendable: bool) -> Self {
        self.p_nom_extendable = extendable;
        self
    }

    pub fn p_nom(&self) -> f64 {
        self.p_nom
    }

    pub fn p_set(&self) -> f64 {
        self.p_set
    }

    pub fn q_set(&self) -> f64 {
        self.q_set
    }

    pub fn p_min_pu(&self) -> f64 {
        self.p_min_pu
    }

    pub fn p_max_pu(&self) -> f64 {
        self.p_max_pu
    }

    pub fn p_nom_min(&self) -> f64 {
        self.p_nom_min
    }

    pub fn p_nom_max(&self) -> f64 {
        self.p_nom_max
    }

    pub fn marginal_cost(&self) -> f64 {
        self.marginal_cost
    }

    pub fn p_nom_extendable(&self) -> bool {
        self.p_nom_extendable
    }

    /// Upper dispatch limit: `p_nom * p_max_pu`.
    pub fn p_available(&self) -> f64 {
        self.p_nom * self.p_max_pu
    }

    pub fn set_p_nom(&mut self, p_nom: f64) {
        self.state.update(&mut self.p_nom, p_nom);
    }

    pub fn set_p_set(&mut self, p_set: f64) {
        self.state.update(&mut self.p_set, p_set);
    }

    pub fn set_q_set(&mut self, q_set: f64) {
        self.state.update(&mut self.q_set, q_set);
    }

    pub fn set_p_max_pu(&mut self, p_max_pu: f64) {
        self.state.update(&mut self.p_max_pu, p_max_pu);
    }

    pub fn set_marginal_cost(&mut self, marginal_cost: f64) {
        self.state.update(&mut self.marginal_cost, marginal_cost);
    }
}

impl_entity!(Generator, "generator");
impl_injection!(Generator);

/// A consumer with fixed active/reactive set points.
#[derive(Debug, Clone)]
pub struct Load {
    state: EntityState,
    bus0: String,
    carrier: String,
    p_set: f64,
    q_set: f64,
    outputs: Outputs,
}

impl Load {
    pub fn new(name: impl Into<String>, bus0: impl Into<String>) -> Self {
        Self {
            state: EntityState::new(name),
            bus0: bus0.into(),
            carrier: "AC".to_string(),
            p_set: 0.0,
            q_set: 0.0,
            outputs: Outputs::default(),
        }
    }

    pub fn with_p_set(mut self, p_set: f64) -> Self {
        self.p_set = p_set;
        self
    }

    pub fn with_q_set(mut self, q_set: f64) -> Self {
        self.q_set = q_set;
        self
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = carrier.into();
        self
    }

    pub fn carrier(&self) -> &str {
        &self.carrier
    }

    pub fn p_set(&self) -> f64 {
        self.p_set
    }

    pub fn q_set(&self) -> f64 {
        self.q_set
    }

    pub fn set_p_set(&mut self, p_set: f64) {
        self.state.update(&mut self.p_set, p_set);
    }

    pub fn set_q_set(&mut self, q_set: f64) {
        self.state.update(&mut self.q_set, q_set);
    }
}

impl_entity!(Load, "load");
impl_injection!(Load);

/// A battery-like storage unit able to inject or absorb power.
#[derive(Debug, Clone)]
pub struct StorageUnit {
    state: EntityState,
    bus0: String,
    p_nom: f64,
    p_nom_min: f64,
    p_nom_max: f64,
    p_nom_extendable: bool,
    marginal_cost: f64,
    state_of_charge_initial: f64,
    outputs: Outputs,
}

impl StorageUnit {
    pub fn new(name: impl Into<String>, bus0: impl Into<String>) -> Self {
        Self {
            state: EntityState::new(name),
            bus0: bus0.into(),
            p_nom: 0.0,
            p_nom_min: 0.0,
            p_nom_max: 1_000_000.0,
            p_nom_extendable: false,
            marginal_cost: 0.0,
            state_of_charge_initial: 0.0,
            outputs: Outputs::default(),
        }
    }

    pub fn with_p_nom(mut self, p_nom: f64) -> Self {
        self.p_nom = p_nom;
        self
    }

    pub fn with_p_nom_range(mut self, p_nom_min: f64, p_nom_max: f64) -> Self {
        self.p_nom_min = p_nom_min;
        self.p_nom_max = p_nom_max;
        self
    }

    pub fn with_marginal_cost(mut self, marginal_cost: f64) -> Self {
        self.marginal_cost = marginal_cost;
        self
    }

    pub fn with_state_of_charge_initial(mut self, soc: f64) -> Self {
        self.state_of_charge_initial = soc;
        self
    }

    pub fn with_p_nom_extendable(mut self, extendable: bool) -> Self {
        self.p_nom_extendable = extendable;
        self
    }

    pub fn p_nom(&self) -> f64 {
        self.p_nom
    }

    pub fn p_nom_min(&self) -> f64 {
        self.p_nom_min
    }

    pub fn p_nom_max(&self) -> f64 {
        self.p_nom_max
    }

    pub fn p_nom_extendable(&self) -> bool {
        self.p_nom_extendable
    }

    pub fn marginal_cost(&self) -> f64 {
        self.marginal_cost
    }

    pub fn state_of_charge_initial(&self) -> f64 {
        self.state_of_charge_initial
    }

    pub fn set_p_nom(&mut self, p_nom: f64) {
        self.state.update(&mut self.p_nom, p_nom);
    }

    pub fn set_marginal_cost(&mut self, marginal_cost: f64) {
        self.state.update(&mut self.marginal_cost, marginal_cost);
    }

    pub fn set_state_of_charge_initial(&mut self, soc: f64) {
        self.state.update(&mut self.state_of_charge_initial, soc);
    }
}

impl_entity!(StorageUnit, "storage unit");
impl_injection!(StorageUnit);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_is_name_and_changed() {
        let a = Generator::new("gen_0", "bus_0").with_p_nom(10.0);
        let b = Generator::new("gen_0", "bus_7").with_p_nom(99.0);
        assert_eq!(a, b);

        let mut c = a.clone();
        c.set_p_set(5.0);
        assert!(c.is_changed());
        assert_ne!(a, c);
    }

    #[test]
    fn hash_follows_equality() {
        let mut set = HashSet::new();
        set.insert(Bus::new("bus_0", 110.0));
        assert!(set.contains(&Bus::new("bus_0", 0.4)));

        let mut touched = Bus::new("bus_0", 110.0);
        touched.mark_changed();
        assert!(!set.contains(&touched));
    }

    #[test]
    fn setters_only_flag_real_changes() {
        let mut load = Load::new("load_0", "bus_6").with_p_set(3.0);
        load.set_p_set(3.0);
        assert!(!load.is_changed());
        load.set_p_set(4.0);
        assert!(load.is_changed());
        load.clear_changed();
        assert_eq!(load.key(), EntityKey::new("load_0", false));
    }

    #[test]
    fn set_active_marks_changed() {
        let mut line = Line::new("line_4", "bus_3", "bus_4").with_impedance(0.1, 0.2);
        line.set_active(true);
        assert!(!line.is_changed());
        line.set_active(false);
        assert!(!line.is_active());
        assert!(line.is_changed());
    }

    #[test]
    fn outputs_reset_and_set() {
        let mut outputs = Outputs::default();
        assert_eq!(outputs.value(0), None);

        outputs.reset(3);
        assert_eq!(outputs.active_power(), &[0.0, 0.0, 0.0]);
        assert_eq!(outputs.value(1), None);

        outputs.set(vec![1.0, -2.0]);
        assert_eq!(outputs.output(), &[true, true]);
        assert_eq!(outputs.value(1), Some(-2.0));
        assert_eq!(outputs.value(2), None);
    }

    #[test]
    fn generator_availability() {
        let generator = Generator::new("pv", "bus_1")
            .with_p_nom(20.0)
            .with_pu_limits(0.0, 0.5);
        assert!((generator.p_available() - 10.0).abs() < 1e-12);
    }
}
