//! Merit-order dispatch followed by DC flows.
//!
//! Serves the optimising methods (`lopf`, `optimize`) as a copper-plate
//! economic dispatch: every unit first runs at its minimum, then the
//! remaining demand is filled in order of marginal cost. Branch capacities
//! are not enforced.

use std::collections::BTreeMap;
use std::path::Path;

use gf_core::{Timer, Tolerances};
use gf_model::{Model, Snapshots};
use tracing::{debug, warn};

use crate::dc::{pick_slack, solve_dc};
use crate::error::{SolverError, SolverResult};
use crate::method::CalculationMethod;
use crate::network::{Network, NetworkBuilder};
use crate::results::{SolveResults, SolveState, export_json};
use crate::solver::{
    CONDITION_FAILED, CONDITION_INFEASIBLE, CONDITION_NO_GENERATION, CONDITION_OPTIMAL,
    GridSolver, STATUS_FAILED, STATUS_OK, STATUS_WARNING,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitKind {
    Generator,
    StorageUnit,
}

#[derive(Debug, Clone)]
struct Unit {
    kind: UnitKind,
    name: String,
    bus: String,
    min: f64,
    max: f64,
    cost: f64,
}

fn units(network: &Network) -> Vec<Unit> {
    let generators = network.generators.iter().map(|(name, g)| Unit {
        kind: UnitKind::Generator,
        name: name.clone(),
        bus: g.bus.clone(),
        min: g.p_nom * g.p_min_pu,
        max: g.p_nom * g.p_max_pu,
        cost: g.marginal_cost,
    });
    let storage = network.storage_units.iter().map(|(name, s)| Unit {
        kind: UnitKind::StorageUnit,
        name: name.clone(),
        bus: s.bus.clone(),
        min: 0.0,
        max: s.p_nom,
        cost: s.marginal_cost,
    });
    let mut units: Vec<Unit> = generators.chain(storage).collect();
    units.sort_by(|a, b| a.cost.total_cmp(&b.cost).then_with(|| a.name.cmp(&b.name)));
    units
}

/// Dispatch `demand` over `units` in merit order. `None` if infeasible.
fn dispatch(units: &[Unit], demand: f64, tol: Tolerances) -> Option<Vec<f64>> {
    let floor: f64 = units.iter().map(|u| u.min).sum();
    let ceiling: f64 = units.iter().map(|u| u.max).sum();
    if tol.exceeds(demand, ceiling) || tol.exceeds(floor, demand) {
        return None;
    }

    let mut output: Vec<f64> = units.iter().map(|u| u.min).collect();
    let mut remaining = demand - floor;
    for (unit, p) in units.iter().zip(output.iter_mut()) {
        if remaining <= 0.0 {
            break;
        }
        let extra = (unit.max - unit.min).max(0.0).min(remaining);
        *p += extra;
        remaining -= extra;
    }
    Some(output)
}

#[derive(Debug)]
pub struct MeritOrderDispatch {
    method: CalculationMethod,
    builder: NetworkBuilder,
    state: SolveState,
    tolerances: Tolerances,
}

impl MeritOrderDispatch {
    pub fn new(method: CalculationMethod) -> Self {
        Self {
            method,
            builder: NetworkBuilder::new(),
            state: SolveState::default(),
            tolerances: Tolerances::default(),
        }
    }

    pub fn builder(&self) -> &NetworkBuilder {
        &self.builder
    }

    pub fn results(&self) -> &SolveResults {
        &self.state.results
    }

    fn run(&mut self) -> SolverResult<bool> {
        let network = self.builder.network();
        let Some(slack) = pick_slack(self.builder.input(), network) else {
            self.state.set(STATUS_FAILED, CONDITION_NO_GENERATION);
            return Ok(false);
        };

        let demand: f64 = network.loads.values().map(|l| l.p_set).sum();
        let units = units(network);
        let Some(output) = dispatch(&units, demand, self.tolerances) else {
            debug!(demand, units = units.len(), "dispatch infeasible");
            self.state.set(STATUS_WARNING, CONDITION_INFEASIBLE);
            return Ok(false);
        };

        let mut injections: BTreeMap<String, f64> = BTreeMap::new();
        for (unit, p) in units.iter().zip(&output) {
            *injections.entry(unit.bus.clone()).or_default() += p;
        }
        for load in network.loads.values() {
            *injections.entry(load.bus.clone()).or_default() -= load.p_set;
        }

        let flows = match solve_dc(network, &injections, &slack.bus) {
            Ok(flows) => flows,
            Err(SolverError::Singular { what }) => {
                warn!(%what, method = %self.method, "dispatch flows failed");
                self.state.set(STATUS_WARNING, CONDITION_FAILED);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let count = network.snapshot_count;
        let constant = |value: f64| vec![value; count];
        let mut results = SolveResults::new(count);
        for (unit, &p) in units.iter().zip(&output) {
            let target = match unit.kind {
                UnitKind::Generator => &mut results.generators,
                UnitKind::StorageUnit => &mut results.storage_units,
            };
            target.insert(unit.name.clone(), constant(p));
        }
        for (name, load) in &network.loads {
            results.loads.insert(name.clone(), constant(load.p_set));
        }
        for (name, flow) in flows.lines {
            results.lines.insert(name, constant(flow));
        }
        for (name, flow) in flows.transformers {
            results.transformers.insert(name, constant(flow));
        }

        results.write_back(self.builder.input(), network);
        self.state.results = results;
        self.state.set(STATUS_OK, CONDITION_OPTIMAL);
        Ok(true)
    }
}

impl GridSolver for MeritOrderDispatch {
    fn method(&self) -> CalculationMethod {
        self.method
    }

    fn set_input_model(&mut self, model: Model) {
        self.builder.set_input_model(model);
    }

    fn set_snapshots(&mut self, snapshots: Snapshots) {
        self.builder.set_snapshots(snapshots);
    }

    fn build_model(&mut self) -> SolverResult<()> {
        self.builder.build()
    }

    fn calculate(&mut self) -> SolverResult<bool> {
        let timer = Timer::start("merit order dispatch");
        let outcome = self.run();
        self.state.calculation_time_s = timer.stop();
        outcome
    }

    fn status(&self) -> &str {
        &self.state.status
    }

    fn condition(&self) -> &str {
        &self.state.condition
    }

    fn calculation_time(&self) -> f64 {
        self.state.calculation_time_s
    }

    fn network_build_time(&self) -> f64 {
        self.builder.build_time_s()
    }

    fn export_result(&self, dir: &Path) -> SolverResult<()> {
        export_json(dir, self.method, self.builder.network(), &self.state)
    }
}
