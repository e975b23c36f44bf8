//! Calculation method selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SolverError;

/// Closed set of solver strategies a worker slot can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationMethod {
    /// Optimal dispatch over all snapshots.
    Optimize,
    /// Linear optimal power flow.
    Lopf,
    /// Linear (DC) power flow.
    #[default]
    Lpf,
    /// Full AC power flow.
    Pf,
}

impl CalculationMethod {
    pub const ALL: [CalculationMethod; 4] = [
        CalculationMethod::Optimize,
        CalculationMethod::Lopf,
        CalculationMethod::Lpf,
        CalculationMethod::Pf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationMethod::Optimize => "optimize",
            CalculationMethod::Lopf => "lopf",
            CalculationMethod::Lpf => "lpf",
            CalculationMethod::Pf => "pf",
        }
    }
}

impl fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculationMethod {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        CalculationMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == lowered)
            .ok_or_else(|| SolverError::UnknownMethod {
                name: s.to_string(),
            })
    }
}
