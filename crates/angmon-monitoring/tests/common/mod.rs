#![allow(dead_code)]

use angmon_core::{
    Branch, BranchId, Bus, BusId, Contingency, ContingencyElement, Country, DcLoadFlow, Gen,
    GenId, Kilovolts, Load, LoadFlowOutcome, LoadFlowParameters, LoadFlowSolver, LoadId, Network,
    Node, Substation, VoltageLevel,
};
use angmon_crac::{
    AngleCnec, AngleThreshold, Crac, ElementaryAction, InjectionSetpoint, Instant, NetworkAction,
    RemedialAction, State, UsageRule,
};
use angmon_monitoring::MonitoringParameters;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn fr() -> Country {
    "FR".parse().unwrap()
}

pub fn curative(contingency: &str) -> State {
    State::post_contingency(contingency, Instant::Curative)
}

/// Reactance making a 100 MW transfer over one line produce a 95° angle.
pub fn line_reactance() -> f64 {
    95f64.to_radians()
}

/// Two French buses joined by two parallel lines.
///
/// B1 (VL1) holds the slack generator G1, already at its maximum, and load
/// LD1. B2 (VL2) holds G2 and LD2, so 100 MW flow from B1 to B2. With one
/// line tripped the VL1 - VL2 angle is 95°.
pub fn two_bus_network() -> Network {
    let mut network = Network::new();
    network.add_substation(Substation::new("S1", Some(fr())));
    network.add_substation(Substation::new("S2", Some(fr())));
    network.add_voltage_level(VoltageLevel::new("VL1", Some("S1"), Kilovolts(400.0)));
    network.add_voltage_level(VoltageLevel::new("VL2", Some("S2"), Kilovolts(400.0)));
    network.add_bus(Bus::new(BusId::new(1), "VL1_B1", "VL1"));
    network.add_bus(Bus::new(BusId::new(2), "VL2_B1", "VL2"));
    for (id, name) in [(1, "L1"), (2, "L2")] {
        network
            .add_branch(Branch::new(
                BranchId::new(id),
                name,
                BusId::new(1),
                BusId::new(2),
                line_reactance(),
            ))
            .unwrap();
    }
    network.add_node(Node::Gen(
        Gen::new(GenId::new(1), "G1", BusId::new(1))
            .with_target_p(150.0)
            .with_p_limits(0.0, 150.0),
    ));
    network.add_node(Node::Gen(
        Gen::new(GenId::new(2), "G2", BusId::new(2))
            .with_target_p(100.0)
            .with_p_limits(0.0, 500.0),
    ));
    network.add_node(Node::Load(Load::new(LoadId::new(1), "LD1", BusId::new(1), 50.0)));
    network.add_node(Node::Load(Load::new(LoadId::new(2), "LD2", BusId::new(2), 200.0)));
    network
}

pub fn load_setpoint(id: &str, mw: f64) -> ElementaryAction {
    ElementaryAction::Injection(InjectionSetpoint::load(id, mw))
}

pub fn on_constraint(cnec_id: &str) -> UsageRule {
    UsageRule::OnConstraint {
        instant: Instant::Curative,
        cnec_id: cnec_id.to_string(),
    }
}

/// Catalog with contingency `coL1` (trips L1), constraint `ac1` on
/// `coL1 - curative` between VL1 (exporting) and VL2 (importing), and
/// no remedial action.
pub fn bare_crac(threshold: AngleThreshold) -> Crac {
    let mut crac = Crac::new(
        "crac",
        [Instant::Preventive, Instant::Outage, Instant::Curative],
    );
    crac.add_contingency(Contingency::new("coL1", vec![ContingencyElement::branch("L1")]));
    crac.add_angle_cnec(AngleCnec::new(
        "ac1",
        curative("coL1"),
        "VL2",
        "VL1",
        vec![threshold],
    ))
    .unwrap();
    crac
}

/// [`bare_crac`] plus `ra_load`, which raises LD1 by 50 MW.
pub fn crac_with_load_action(threshold: AngleThreshold) -> Crac {
    let mut crac = bare_crac(threshold);
    crac.add_remedial_action(RemedialAction::Network(
        NetworkAction::new("ra_load", vec![load_setpoint("LD1", 100.0)])
            .with_usage_rule(on_constraint("ac1")),
    ))
    .unwrap();
    crac
}

pub fn parameters(parallelism: usize) -> MonitoringParameters {
    let mut parameters = MonitoringParameters::default();
    parameters.parallelism = parallelism;
    parameters.redispatch.countries.insert(fr());
    parameters
}

/// DC load flow that counts its calls.
#[derive(Default)]
pub struct CountingLoadFlow {
    inner: DcLoadFlow,
    calls: AtomicUsize,
}

impl CountingLoadFlow {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LoadFlowSolver for CountingLoadFlow {
    fn name(&self) -> &str {
        "counting-dc"
    }

    fn solve(&self, network: &mut Network, parameters: &LoadFlowParameters) -> LoadFlowOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.solve(network, parameters)
    }
}

/// DC load flow that forks rayon work of its own, as a parallel linear
/// backend would.
pub struct NestedRayonLoadFlow;

impl LoadFlowSolver for NestedRayonLoadFlow {
    fn name(&self) -> &str {
        "nested-rayon-dc"
    }

    fn solve(&self, network: &mut Network, parameters: &LoadFlowParameters) -> LoadFlowOutcome {
        let (outcome, ()) = rayon::join(
            || DcLoadFlow.solve(network, parameters),
            || std::thread::sleep(Duration::from_millis(2)),
        );
        outcome
    }
}

/// DC load flow that diverges whenever the predicate holds on the network.
pub struct DivergeWhen<F>(pub F);

impl<F> LoadFlowSolver for DivergeWhen<F>
where
    F: Fn(&Network) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        "scripted-divergence"
    }

    fn solve(&self, network: &mut Network, parameters: &LoadFlowParameters) -> LoadFlowOutcome {
        if (self.0)(network) {
            return LoadFlowOutcome::failed("scripted divergence");
        }
        DcLoadFlow.solve(network, parameters)
    }
}

/// DC load flow that panics whenever the predicate holds on the network.
pub struct PanicWhen<F>(pub F);

impl<F> LoadFlowSolver for PanicWhen<F>
where
    F: Fn(&Network) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        "scripted-panic"
    }

    fn solve(&self, network: &mut Network, parameters: &LoadFlowParameters) -> LoadFlowOutcome {
        if (self.0)(network) {
            panic!("solver crashed");
        }
        DcLoadFlow.solve(network, parameters)
    }
}

pub fn load_p0(network: &Network, id: &str) -> f64 {
    network.load(id).unwrap().p0.value()
}

pub fn gen_p(network: &Network, id: &str) -> f64 {
    network.generator(id).unwrap().target_p.value()
}
