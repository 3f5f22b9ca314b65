//! # angmon-core: grid model for angle monitoring
//!
//! The network is an **undirected multigraph**:
//! - **Nodes**: buses and the injections attached to them (generators, loads,
//!   dangling lines, shunt compensators)
//! - **Edges**: branches between buses
//!
//! On top of the graph the network keeps two registries that the monitoring
//! engine needs and a pure electrical model does not: voltage levels (angle
//! constraints are measured between voltage levels) and substations (an
//! injection's country is read from its substation).
//!
//! ```
//! use angmon_core::*;
//!
//! let mut network = Network::new();
//! network.add_substation(Substation::new("S1", Some("FR".parse().unwrap())));
//! network.add_voltage_level(VoltageLevel::new("VL1", Some("S1"), Kilovolts(400.0)));
//! network.add_bus(Bus::new(BusId::new(1), "VL1_0", "VL1"));
//! network.add_node(Node::Gen(
//!     Gen::new(GenId::new(1), "G1", BusId::new(1)).with_target_p(100.0),
//! ));
//!
//! let country = network.injection_country("G1").unwrap();
//! assert_eq!(country.code(), "FR");
//! ```
//!
//! ## Modules
//!
//! - [`contingency`] - outage definitions and their application to a network
//! - [`graph_utils`] - synchronous components over in-service branches
//! - [`load_flow`] - the solver seam and a DC implementation
//! - [`solver`] - dense linear-system backends used by the DC load flow

use petgraph::{prelude::*, Undirected};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod contingency;
pub mod country;
pub mod error;
pub mod graph_utils;
pub mod load_flow;
pub mod solver;
pub mod units;

pub use contingency::{Contingency, ContingencyElement, ContingencyElementKind};
pub use country::Country;
pub use error::{AngmonError, AngmonResult};
pub use graph_utils::{bus_islands, main_synchronous_component};
pub use load_flow::{DcLoadFlow, LoadFlowOutcome, LoadFlowParameters, LoadFlowSolver};
pub use petgraph::graph::{EdgeIndex, NodeIndex};
pub use solver::{FaerSolver, GaussSolver, LinearSystemBackend, SolverKind};
pub use units::{Degrees, Kilovolts, Megawatts, PerUnit, Radians};

macro_rules! element_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            #[inline]
            pub fn new(value: usize) -> Self {
                $name(value)
            }
            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }
    };
}

element_id!(BusId);
element_id!(BranchId);
element_id!(GenId);
element_id!(LoadId);
element_id!(DanglingLineId);
element_id!(ShuntId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substation {
    pub id: String,
    pub country: Option<Country>,
}

impl Substation {
    pub fn new(id: impl Into<String>, country: Option<Country>) -> Self {
        Self {
            id: id.into(),
            country,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageLevel {
    pub id: String,
    /// Owning substation; voltage levels without one cannot be attributed to a country.
    pub substation: Option<String>,
    pub nominal_kv: Kilovolts,
}

impl VoltageLevel {
    pub fn new(id: impl Into<String>, substation: Option<&str>, nominal_kv: Kilovolts) -> Self {
        Self {
            id: id.into(),
            substation: substation.map(str::to_string),
            nominal_kv,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bus {
    pub id: BusId,
    /// Identifier used by constraints that target a single bus
    pub name: String,
    pub voltage_level: String,
    /// Voltage angle from the last load flow (NaN when not energized)
    pub angle_rad: Radians,
}

impl Bus {
    pub fn new(id: BusId, name: impl Into<String>, voltage_level: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            voltage_level: voltage_level.into(),
            angle_rad: Radians(0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Gen {
    pub id: GenId,
    pub name: String,
    pub bus: BusId,
    /// Active power set-point (MW)
    pub target_p: Megawatts,
    pub pmin: Megawatts,
    pub pmax: Megawatts,
    pub connected: bool,
}

impl Gen {
    pub fn new(id: GenId, name: impl Into<String>, bus: BusId) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
            target_p: Megawatts(0.0),
            pmin: Megawatts(f64::NEG_INFINITY),
            pmax: Megawatts(f64::INFINITY),
            connected: true,
        }
    }

    pub fn with_target_p(mut self, target_p: f64) -> Self {
        self.target_p = Megawatts(target_p);
        self
    }

    pub fn with_p_limits(mut self, pmin: f64, pmax: f64) -> Self {
        self.pmin = Megawatts(pmin);
        self.pmax = Megawatts(pmax);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Load {
    pub id: LoadId,
    pub name: String,
    pub bus: BusId,
    /// Active power consumption (MW)
    pub p0: Megawatts,
    pub connected: bool,
}

impl Load {
    pub fn new(id: LoadId, name: impl Into<String>, bus: BusId, p0: f64) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
            p0: Megawatts(p0),
            connected: true,
        }
    }
}

/// Boundary line towards an external network, modelled as a fixed consumption.
#[derive(Debug, Clone)]
pub struct DanglingLine {
    pub id: DanglingLineId,
    pub name: String,
    pub bus: BusId,
    pub p0: Megawatts,
    pub connected: bool,
}

impl DanglingLine {
    pub fn new(id: DanglingLineId, name: impl Into<String>, bus: BusId, p0: f64) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
            p0: Megawatts(p0),
            connected: true,
        }
    }
}

/// Sectioned shunt compensator. Only reactive, so invisible to the DC load flow.
#[derive(Debug, Clone)]
pub struct Shunt {
    pub id: ShuntId,
    pub name: String,
    pub bus: BusId,
    pub section_count: u32,
    pub maximum_section_count: u32,
    pub b_per_section: f64,
    pub connected: bool,
}

impl Shunt {
    pub fn new(id: ShuntId, name: impl Into<String>, bus: BusId, maximum_section_count: u32) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
            section_count: 0,
            maximum_section_count,
            b_per_section: 0.0,
            connected: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    /// Series reactance (per-unit)
    pub reactance: f64,
    /// Phase shift applied from `from_bus` to `to_bus`
    pub phase_shift: Radians,
    pub in_service: bool,
}

impl Branch {
    pub fn new(
        id: BranchId,
        name: impl Into<String>,
        from_bus: BusId,
        to_bus: BusId,
        reactance: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            from_bus,
            to_bus,
            reactance,
            phase_shift: Radians(0.0),
            in_service: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Bus(Bus),
    Gen(Gen),
    Load(Load),
    DanglingLine(DanglingLine),
    Shunt(Shunt),
}

#[derive(Debug, Clone)]
pub enum Edge {
    Branch(Branch),
}

impl Node {
    /// Identifier of the element (bus or injection name).
    pub fn label(&self) -> &str {
        match self {
            Node::Bus(bus) => &bus.name,
            Node::Gen(gen) => &gen.name,
            Node::Load(load) => &load.name,
            Node::DanglingLine(line) => &line.name,
            Node::Shunt(shunt) => &shunt.name,
        }
    }

    /// Bus an injection is attached to; `None` for buses themselves.
    pub fn connection_bus(&self) -> Option<BusId> {
        match self {
            Node::Bus(_) => None,
            Node::Gen(gen) => Some(gen.bus),
            Node::Load(load) => Some(load.bus),
            Node::DanglingLine(line) => Some(line.bus),
            Node::Shunt(shunt) => Some(shunt.bus),
        }
    }

    pub fn is_injection(&self) -> bool {
        !matches!(self, Node::Bus(_))
    }
}

impl Edge {
    pub fn label(&self) -> &str {
        match self {
            Edge::Branch(branch) => &branch.name,
        }
    }
}

/// The grid model: graph plus voltage-level and substation registries.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub graph: Graph<Node, Edge, Undirected>,
    pub voltage_levels: BTreeMap<String, VoltageLevel>,
    pub substations: BTreeMap<String, Substation>,
}

impl Network {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
            voltage_levels: BTreeMap::new(),
            substations: BTreeMap::new(),
        }
    }

    pub fn add_substation(&mut self, substation: Substation) {
        self.substations.insert(substation.id.clone(), substation);
    }

    pub fn add_voltage_level(&mut self, voltage_level: VoltageLevel) {
        self.voltage_levels
            .insert(voltage_level.id.clone(), voltage_level);
    }

    pub fn add_bus(&mut self, bus: Bus) -> NodeIndex {
        self.graph.add_node(Node::Bus(bus))
    }

    /// Add an injection (or a bus) without any edge; injections reference their bus by id.
    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        self.graph.add_node(node)
    }

    /// Connect two existing buses with a branch.
    pub fn add_branch(&mut self, branch: Branch) -> AngmonResult<EdgeIndex> {
        let from = self.bus_index(branch.from_bus).ok_or_else(|| {
            AngmonError::Network(format!(
                "branch {} references unknown bus {}",
                branch.name,
                branch.from_bus.value()
            ))
        })?;
        let to = self.bus_index(branch.to_bus).ok_or_else(|| {
            AngmonError::Network(format!(
                "branch {} references unknown bus {}",
                branch.name,
                branch.to_bus.value()
            ))
        })?;
        Ok(self.graph.add_edge(from, to, Edge::Branch(branch)))
    }

    pub fn bus_index(&self, bus_id: BusId) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|idx| matches!(&self.graph[*idx], Node::Bus(bus) if bus.id == bus_id))
    }

    pub fn bus(&self, bus_id: BusId) -> Option<&Bus> {
        self.graph.node_weights().find_map(|n| match n {
            Node::Bus(bus) if bus.id == bus_id => Some(bus),
            _ => None,
        })
    }

    pub fn buses(&self) -> Vec<&Bus> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Bus(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn generators(&self) -> Vec<&Gen> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Gen(g) => Some(g),
                _ => None,
            })
            .collect()
    }

    pub fn branches(&self) -> Vec<&Branch> {
        self.graph
            .edge_weights()
            .map(|e| match e {
                Edge::Branch(b) => b,
            })
            .collect()
    }

    /// Locate an injection node by identifier.
    pub fn find_injection(&self, element_id: &str) -> Option<NodeIndex> {
        self.graph.node_indices().find(|idx| {
            let node = &self.graph[*idx];
            node.is_injection() && node.label() == element_id
        })
    }

    pub fn injection(&self, element_id: &str) -> Option<&Node> {
        self.find_injection(element_id).map(|idx| &self.graph[idx])
    }

    pub fn injection_mut(&mut self, element_id: &str) -> Option<&mut Node> {
        let idx = self.find_injection(element_id)?;
        self.graph.node_weight_mut(idx)
    }

    pub fn generator(&self, element_id: &str) -> Option<&Gen> {
        match self.injection(element_id)? {
            Node::Gen(gen) => Some(gen),
            _ => None,
        }
    }

    pub fn generator_mut(&mut self, element_id: &str) -> Option<&mut Gen> {
        match self.injection_mut(element_id)? {
            Node::Gen(gen) => Some(gen),
            _ => None,
        }
    }

    pub fn load(&self, element_id: &str) -> Option<&Load> {
        match self.injection(element_id)? {
            Node::Load(load) => Some(load),
            _ => None,
        }
    }

    pub fn load_mut(&mut self, element_id: &str) -> Option<&mut Load> {
        match self.injection_mut(element_id)? {
            Node::Load(load) => Some(load),
            _ => None,
        }
    }

    pub fn branch(&self, element_id: &str) -> Option<&Branch> {
        self.graph.edge_weights().find_map(|e| match e {
            Edge::Branch(b) if b.name == element_id => Some(b),
            _ => None,
        })
    }

    pub fn branch_mut(&mut self, element_id: &str) -> Option<&mut Branch> {
        self.graph.edge_weights_mut().find_map(|e| match e {
            Edge::Branch(b) if b.name == element_id => Some(b),
            _ => None,
        })
    }

    /// Voltage level an element is measured at.
    ///
    /// The identifier is first looked up as a bus (bus-breaker view) and then
    /// as a voltage level.
    pub fn resolve_voltage_level(&self, element_id: &str) -> Option<&VoltageLevel> {
        let via_bus = self.graph.node_weights().find_map(|n| match n {
            Node::Bus(bus) if bus.name == element_id => Some(bus.voltage_level.as_str()),
            _ => None,
        });
        let vl_id = via_bus.unwrap_or(element_id);
        self.voltage_levels.get(vl_id)
    }

    /// Angles of the energized buses of a voltage level, in degrees.
    pub fn voltage_level_angles(&self, voltage_level_id: &str) -> Vec<Degrees> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Bus(bus) if bus.voltage_level == voltage_level_id => {
                    Some(bus.angle_rad.to_degrees())
                }
                _ => None,
            })
            .filter(|angle| angle.is_finite())
            .collect()
    }

    /// Substation owning the voltage level of a bus.
    pub fn bus_substation(&self, bus_id: BusId) -> Option<&Substation> {
        let bus = self.bus(bus_id)?;
        let voltage_level = self.voltage_levels.get(&bus.voltage_level)?;
        let substation_id = voltage_level.substation.as_ref()?;
        self.substations.get(substation_id)
    }

    pub fn bus_country(&self, bus_id: BusId) -> Option<Country> {
        self.bus_substation(bus_id)?.country.clone()
    }

    pub fn injection_substation(&self, element_id: &str) -> Option<&Substation> {
        let bus = self.injection(element_id)?.connection_bus()?;
        self.bus_substation(bus)
    }

    pub fn injection_country(&self, element_id: &str) -> Option<Country> {
        self.injection_substation(element_id)?.country.clone()
    }

    /// Sum of connected generator set-points (MW)
    pub fn total_generation_mw(&self) -> f64 {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Gen(g) if g.connected => Some(g.target_p.value()),
                _ => None,
            })
            .sum()
    }

    /// Sum of connected load and dangling-line consumption (MW)
    pub fn total_load_mw(&self) -> f64 {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Load(l) if l.connected => Some(l.p0.value()),
                Node::DanglingLine(d) if d.connected => Some(d.p0.value()),
                _ => None,
            })
            .sum()
    }
}
