//! DC (linearised) power flow on a [`Network`].
//!
//! Solves `B' θ = P` on the susceptance matrix reduced by the slack bus,
//! with θ = 0 at the slack. Branch flows are `(θ0 - θ1) / x`.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use gf_model::{Entity, Model};

use crate::error::{SolverError, SolverResult};
use crate::network::{NetBranch, Network};

/// Reactance used for branches that carry no positive reactance of their own.
pub const DEFAULT_REACTANCE: f64 = 0.1;

/// Bus angles and branch flows of one DC solve.
#[derive(Debug, Clone, Default)]
pub struct DcFlows {
    pub angles: BTreeMap<String, f64>,
    pub lines: BTreeMap<String, f64>,
    pub transformers: BTreeMap<String, f64>,
}

/// The unit that balances a DC solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackUnit {
    Generator(String),
    StorageUnit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slack {
    pub bus: String,
    pub unit: SlackUnit,
}

/// The bus of the first active generator of `input` that is part of
/// `network`, else of the first such storage unit.
pub fn pick_slack(input: &Model, network: &Network) -> Option<Slack> {
    let generator = input.generators().iter().find_map(|g| {
        let g = g.read();
        network.generators.get(g.name()).map(|net| Slack {
            bus: net.bus.clone(),
            unit: SlackUnit::Generator(g.name().to_string()),
        })
    });
    generator.or_else(|| {
        input.storage_units().iter().find_map(|s| {
            let s = s.read();
            network.storage_units.get(s.name()).map(|net| Slack {
                bus: net.bus.clone(),
                unit: SlackUnit::StorageUnit(s.name().to_string()),
            })
        })
    })
}

fn susceptance(branch: &NetBranch) -> f64 {
    if branch.x > 0.0 {
        1.0 / branch.x
    } else {
        1.0 / DEFAULT_REACTANCE
    }
}

/// Solve the DC power flow for net bus injections `injections` (missing
/// buses inject nothing). The slack bus balances whatever is left over.
pub fn solve_dc(
    network: &Network,
    injections: &BTreeMap<String, f64>,
    slack: &str,
) -> SolverResult<DcFlows> {
    let positions = network.bus_positions();
    let n = positions.len();
    let slack_pos = *positions.get(slack).ok_or_else(|| SolverError::UnknownBus {
        entity: "slack".to_string(),
        bus: slack.to_string(),
    })?;

    let mut b = DMatrix::<f64>::zeros(n, n);
    let branches = network.lines.values().chain(network.transformers.values());
    for branch in branches {
        let (i, j) = match (
            positions.get(branch.bus0.as_str()),
            positions.get(branch.bus1.as_str()),
        ) {
            (Some(&i), Some(&j)) => (i, j),
            _ => {
                return Err(SolverError::UnknownBus {
                    entity: "branch".to_string(),
                    bus: format!("{} or {}", branch.bus0, branch.bus1),
                });
            }
        };
        let s = susceptance(branch);
        b[(i, i)] += s;
        b[(j, j)] += s;
        b[(i, j)] -= s;
        b[(j, i)] -= s;
    }

    // Reduced system without the slack row and column
    let keep: Vec<usize> = (0..n).filter(|&k| k != slack_pos).collect();
    let mut theta = vec![0.0; n];
    if !keep.is_empty() {
        let m = keep.len();
        let reduced = DMatrix::from_fn(m, m, |r, c| b[(keep[r], keep[c])]);
        let names: Vec<&String> = network.buses.keys().collect();
        let p = DVector::from_fn(m, |r, _| {
            injections.get(names[keep[r]]).copied().unwrap_or(0.0)
        });
        let solved = reduced.lu().solve(&p).ok_or_else(|| SolverError::Singular {
            what: format!("reduced susceptance matrix ({m}x{m}) is singular"),
        })?;
        for (r, &k) in keep.iter().enumerate() {
            theta[k] = solved[r];
        }
    }

    let angle = |bus: &str| positions.get(bus).map(|&k| theta[k]).unwrap_or(0.0);
    let flow = |branch: &NetBranch| {
        (angle(branch.bus0.as_str()) - angle(branch.bus1.as_str())) * susceptance(branch)
    };

    Ok(DcFlows {
        angles: network
            .buses
            .keys()
            .map(|name| (name.clone(), angle(name.as_str())))
            .collect(),
        lines: network
            .lines
            .iter()
            .map(|(name, branch)| (name.clone(), flow(branch)))
            .collect(),
        transformers: network
            .transformers
            .iter()
            .map(|(name, branch)| (name.clone(), flow(branch)))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetBus;

    fn branch(bus0: &str, bus1: &str, x: f64) -> NetBranch {
        NetBranch {
            bus0: bus0.to_string(),
            bus1: bus1.to_string(),
            r: 0.0,
            x,
            s_nom: 100.0,
        }
    }

    fn triangle() -> Network {
        let mut network = Network {
            snapshot_count: 1,
            ..Network::default()
        };
        for name in ["a", "b", "c"] {
            network.buses.insert(name.to_string(), NetBus { v_nom: 20.0 });
        }
        network.lines.insert("ab".to_string(), branch("a", "b", 0.1));
        network.lines.insert("bc".to_string(), branch("b", "c", 0.1));
        network.lines.insert("ca".to_string(), branch("c", "a", 0.2));
        network
    }

    #[test]
    fn single_bus_has_no_flows() {
        let mut network = Network::default();
        network.buses.insert("a".to_string(), NetBus { v_nom: 0.4 });
        let flows = solve_dc(&network, &BTreeMap::new(), "a").unwrap();
        assert_eq!(flows.angles["a"], 0.0);
        assert!(flows.lines.is_empty());
    }

    #[test]
    fn flows_split_by_reactance() {
        let network = triangle();
        // 10 units injected at a (slack), withdrawn at c.
        let injections = BTreeMap::from([("a".to_string(), 10.0), ("c".to_string(), -10.0)]);
        let flows = solve_dc(&network, &injections, "a").unwrap();

        // Path a-b-c has x = 0.2, path a-c has x = 0.2: equal split.
        assert!((flows.lines["ab"] - 5.0).abs() < 1e-9);
        assert!((flows.lines["bc"] - 5.0).abs() < 1e-9);
        assert!((flows.lines["ca"] + 5.0).abs() < 1e-9);
    }

    #[test]
    fn disconnected_network_is_singular() {
        let mut network = triangle();
        network.buses.insert("island".to_string(), NetBus { v_nom: 20.0 });
        let injections = BTreeMap::from([("island".to_string(), 1.0)]);
        assert!(matches!(
            solve_dc(&network, &injections, "a"),
            Err(SolverError::Singular { .. })
        ));
    }

    #[test]
    fn unknown_slack_rejected() {
        assert!(solve_dc(&triangle(), &BTreeMap::new(), "zz").is_err());
    }
}
