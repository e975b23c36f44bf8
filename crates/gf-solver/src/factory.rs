//! Built-in solver factory.

use crate::error::{SolverError, SolverResult};
use crate::lpf::LinearPowerFlow;
use crate::merit::MeritOrderDispatch;
use crate::method::CalculationMethod;
use crate::solver::{GridSolver, SolverFactory};

/// Routes `lpf` to [`LinearPowerFlow`] and `lopf`/`optimize` to
/// [`MeritOrderDispatch`]. Full AC power flow (`pf`) is not built in.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSolverFactory;

impl SolverFactory for BuiltinSolverFactory {
    fn create(&self, method: CalculationMethod) -> SolverResult<Box<dyn GridSolver>> {
        match method {
            CalculationMethod::Lpf => Ok(Box::new(LinearPowerFlow::new())),
            CalculationMethod::Lopf | CalculationMethod::Optimize => {
                Ok(Box::new(MeritOrderDispatch::new(method)))
            }
            CalculationMethod::Pf => Err(SolverError::Unsupported { method }),
        }
    }
}
