//! The seam between worker slots and power-flow solvers.
//!
//! A worker slot drives one [`GridSolver`] per round:
//! `set_input_model` → `set_snapshots` → `build_model` → `calculate`, then
//! reads `status`, `condition` and the timings. Results are written straight
//! into the entities of the input model, which are shared with the combined
//! model, so callers see them without any copying.

use std::path::Path;

use gf_model::{Model, Snapshots};

use crate::error::SolverResult;
use crate::method::CalculationMethod;

pub const STATUS_OK: &str = "ok";
pub const STATUS_WARNING: &str = "warning";
pub const STATUS_FAILED: &str = "failed";

pub const CONDITION_SUCCESS: &str = "success";
pub const CONDITION_OPTIMAL: &str = "optimal";
pub const CONDITION_INFEASIBLE: &str = "infeasible";
pub const CONDITION_FAILED: &str = "failed";
pub const CONDITION_NO_GENERATION: &str = "no generation";

/// A solver bound to one worker slot.
pub trait GridSolver: Send {
    fn method(&self) -> CalculationMethod;

    fn set_input_model(&mut self, model: Model);

    fn set_snapshots(&mut self, snapshots: Snapshots);

    /// Construct (or incrementally update) the solver's own network from the
    /// input model. Calling it twice without changes is a no-op.
    fn build_model(&mut self) -> SolverResult<()>;

    /// Run the calculation. `Ok(false)` means the solver ran but produced no
    /// usable result; `status` and `condition` say why.
    fn calculate(&mut self) -> SolverResult<bool>;

    fn status(&self) -> &str;

    fn condition(&self) -> &str;

    /// Seconds spent in the last `calculate`.
    fn calculation_time(&self) -> f64;

    /// Seconds spent in the last `build_model`.
    fn network_build_time(&self) -> f64;

    /// Write the built network and last results below `dir`.
    fn export_result(&self, dir: &Path) -> SolverResult<()>;
}

/// Creates solvers for a calculation method.
pub trait SolverFactory: Send + Sync {
    fn create(&self, method: CalculationMethod) -> SolverResult<Box<dyn GridSolver>>;
}
