//! gf-solver: power-flow solvers behind the worker-slot seam.
//!
//! A worker slot owns one [`GridSolver`] created by a [`SolverFactory`] for
//! the configured [`CalculationMethod`]. The built-in reference solvers keep
//! a per-slot [`Network`] that is updated incrementally between rounds:
//! - [`LinearPowerFlow`] (`lpf`): DC power flow with a slack unit
//! - [`MeritOrderDispatch`] (`lopf`, `optimize`): economic dispatch plus DC flows

pub mod dc;
pub mod error;
pub mod factory;
pub mod lpf;
pub mod merit;
pub mod method;
pub mod network;
pub mod results;
pub mod solver;

pub use error::{SolverError, SolverResult};
pub use factory::BuiltinSolverFactory;
pub use lpf::LinearPowerFlow;
pub use merit::MeritOrderDispatch;
pub use method::CalculationMethod;
pub use network::{Network, NetworkBuilder};
pub use results::SolveResults;
pub use solver::{
    CONDITION_FAILED, CONDITION_INFEASIBLE, CONDITION_NO_GENERATION, CONDITION_OPTIMAL,
    CONDITION_SUCCESS, GridSolver, STATUS_FAILED, STATUS_OK, STATUS_WARNING, SolverFactory,
};
