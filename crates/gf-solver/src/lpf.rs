//! Linear (DC) power flow.
//!
//! Generators inject their set point, loads withdraw theirs, and the slack
//! unit (first generator, else first storage unit) balances the segment.

use std::collections::BTreeMap;
use std::path::Path;

use gf_core::Timer;
use gf_model::{Model, Snapshots};
use tracing::warn;

use crate::dc::{SlackUnit, pick_slack, solve_dc};
use crate::error::{SolverError, SolverResult};
use crate::method::CalculationMethod;
use crate::network::NetworkBuilder;
use crate::results::{SolveResults, SolveState, export_json};
use crate::solver::{
    CONDITION_FAILED, CONDITION_NO_GENERATION, CONDITION_SUCCESS, GridSolver, STATUS_FAILED,
    STATUS_OK, STATUS_WARNING,
};

#[derive(Debug, Default)]
pub struct LinearPowerFlow {
    builder: NetworkBuilder,
    state: SolveState,
}

impl LinearPowerFlow {
    pub fn new() -> Self {
        Self::default()
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

        let mut injections: BTreeMap<String, f64> = BTreeMap::new();
        for generator in network.generators.values() {
            *injections.entry(generator.bus.clone()).or_default() += generator.p_set;
        }
        for load in network.loads.values() {
            *injections.entry(load.bus.clone()).or_default() -= load.p_set;
        }
        let imbalance: f64 = injections.values().sum();
        *injections.entry(slack.bus.clone()).or_default() -= imbalance;

        let flows = match solve_dc(network, &injections, &slack.bus) {
            Ok(flows) => flows,
            Err(SolverError::Singular { what }) => {
                warn!(%what, "linear power flow failed");
                self.state.set(STATUS_WARNING, CONDITION_FAILED);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let count = network.snapshot_count;
        let constant = |value: f64| vec![value; count];
        let mut results = SolveResults::new(count);
        for (name, generator) in &network.generators {
            let mut p = generator.p_set;
            if slack.unit == SlackUnit::Generator(name.clone()) {
                p -= imbalance;
            }
            results.generators.insert(name.clone(), constant(p));
        }
        for name in network.storage_units.keys() {
            let p = if slack.unit == SlackUnit::StorageUnit(name.clone()) {
                -imbalance
            } else {
                0.0
            };
            results.storage_units.insert(name.clone(), constant(p));
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
        self.state.set(STATUS_OK, CONDITION_SUCCESS);
        Ok(true)
    }
}

impl GridSolver for LinearPowerFlow {
    fn method(&self) -> CalculationMethod {
        CalculationMethod::Lpf
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
        let timer = Timer::start("lpf");
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
        export_json(dir, self.method(), self.builder.network(), &self.state)
    }
}
