//! Load-flow seam and a DC implementation.
//!
//! The monitoring engine only needs voltage angles, so the [`LoadFlowSolver`]
//! contract is narrow: solve in place, write `angle_rad` on every bus, and
//! report whether the computation converged. A non-converged outcome is not an
//! error; callers decide what divergence means for them.
//!
//! [`DcLoadFlow`] solves `B' θ = P` on the main synchronous component with
//! the lowest-id bus as angle reference. Buses outside that component are
//! left with a NaN angle.

use crate::graph_utils::main_synchronous_component;
use crate::solver::SolverKind;
use crate::units::Radians;
use crate::{BusId, Edge, Network, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Anything able to compute bus voltage angles on a network.
pub trait LoadFlowSolver: Send + Sync {
    fn name(&self) -> &str;

    /// Solve in place. On success every energized bus carries its angle.
    fn solve(&self, network: &mut Network, parameters: &LoadFlowParameters) -> LoadFlowOutcome;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadFlowParameters {
    pub base_mva: f64,
    pub backend: SolverKind,
    /// Floor applied to |x| so a zero-impedance branch cannot blow up the matrix.
    pub min_reactance_pu: f64,
}

impl Default for LoadFlowParameters {
    fn default() -> Self {
        Self {
            base_mva: 100.0,
            backend: SolverKind::Gauss,
            min_reactance_pu: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadFlowOutcome {
    pub fully_converged: bool,
    pub slack_bus: Option<BusId>,
    /// Power picked up by the slack bus (MW)
    pub slack_mismatch_mw: f64,
    pub message: Option<String>,
}

impl LoadFlowOutcome {
    pub fn converged(slack_bus: BusId, slack_mismatch_mw: f64) -> Self {
        Self {
            fully_converged: true,
            slack_bus: Some(slack_bus),
            slack_mismatch_mw,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            fully_converged: false,
            slack_bus: None,
            slack_mismatch_mw: 0.0,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DcLoadFlow;

impl DcLoadFlow {
    pub fn new() -> Self {
        Self
    }
}

fn invalidate_angles(network: &mut Network) {
    for node in network.graph.node_weights_mut() {
        if let Node::Bus(bus) = node {
            bus.angle_rad = Radians(f64::NAN);
        }
    }
}

impl LoadFlowSolver for DcLoadFlow {
    fn name(&self) -> &str {
        "dc"
    }

    fn solve(&self, network: &mut Network, parameters: &LoadFlowParameters) -> LoadFlowOutcome {
        invalidate_angles(network);

        let main = main_synchronous_component(network);
        let Some(&slack) = main.first() else {
            return LoadFlowOutcome::failed("network has no energized bus");
        };

        // row/column of every non-slack bus in the reduced system
        let index: HashMap<BusId, usize> = main
            .iter()
            .skip(1)
            .enumerate()
            .map(|(i, bus)| (*bus, i))
            .collect();
        let in_main = |bus: &BusId| *bus == slack || index.contains_key(bus);
        let n = index.len();

        let mut injections_mw = vec![0.0; n];
        let mut balance_mw = 0.0;
        for node in network.graph.node_weights() {
            let (bus, p) = match node {
                Node::Gen(g) if g.connected => (g.bus, g.target_p.value()),
                Node::Load(l) if l.connected => (l.bus, -l.p0.value()),
                Node::DanglingLine(d) if d.connected => (d.bus, -d.p0.value()),
                _ => continue,
            };
            if !in_main(&bus) {
                continue;
            }
            balance_mw += p;
            if let Some(&i) = index.get(&bus) {
                injections_mw[i] += p;
            }
        }

        let mut matrix = vec![vec![0.0; n]; n];
        let mut rhs: Vec<f64> = injections_mw
            .iter()
            .map(|p| p / parameters.base_mva)
            .collect();

        for edge in network.graph.edge_weights() {
            let Edge::Branch(branch) = edge;
            if !branch.in_service || !in_main(&branch.from_bus) || !in_main(&branch.to_bus) {
                continue;
            }
            let b = 1.0 / branch.reactance.abs().max(parameters.min_reactance_pu);
            let shift = b * branch.phase_shift.value();
            let from = index.get(&branch.from_bus).copied();
            let to = index.get(&branch.to_bus).copied();
            if let Some(f) = from {
                matrix[f][f] += b;
                rhs[f] += shift;
            }
            if let Some(t) = to {
                matrix[t][t] += b;
                rhs[t] -= shift;
            }
            if let (Some(f), Some(t)) = (from, to) {
                matrix[f][t] -= b;
                matrix[t][f] -= b;
            }
        }

        let solver = parameters.backend.build_solver();
        let theta = match solver.solve(&matrix, &rhs) {
            Ok(theta) => theta,
            Err(err) => {
                debug!(backend = solver.name(), error = %err, "DC load flow failed");
                return LoadFlowOutcome::failed(err.to_string());
            }
        };
        if theta.iter().any(|t| !t.is_finite()) {
            return LoadFlowOutcome::failed("non-finite voltage angle");
        }

        for node in network.graph.node_weights_mut() {
            if let Node::Bus(bus) = node {
                if bus.id == slack {
                    bus.angle_rad = Radians(0.0);
                } else if let Some(&i) = index.get(&bus.id) {
                    bus.angle_rad = Radians(theta[i]);
                }
            }
        }

        debug!(
            buses = main.len(),
            slack = slack.value(),
            slack_mismatch_mw = -balance_mw,
            "DC load flow converged"
        );
        LoadFlowOutcome::converged(slack, -balance_mw)
    }
}
