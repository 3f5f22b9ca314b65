//! Outage definitions and their application to a network copy.

use crate::error::{AngmonError, AngmonResult};
use crate::{Edge, Network, Node};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContingencyElementKind {
    Branch,
    Generator,
    Load,
    DanglingLine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyElement {
    pub element_id: String,
    pub kind: ContingencyElementKind,
}

impl ContingencyElement {
    pub fn branch(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            kind: ContingencyElementKind::Branch,
        }
    }

    pub fn generator(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            kind: ContingencyElementKind::Generator,
        }
    }

    fn matches_node(&self, node: &Node) -> bool {
        match (self.kind, node) {
            (ContingencyElementKind::Generator, Node::Gen(g)) => {
                g.name == self.element_id || id_matches(&self.element_id, g.id.value())
            }
            (ContingencyElementKind::Load, Node::Load(l)) => {
                l.name == self.element_id || id_matches(&self.element_id, l.id.value())
            }
            (ContingencyElementKind::DanglingLine, Node::DanglingLine(d)) => {
                d.name == self.element_id || id_matches(&self.element_id, d.id.value())
            }
            _ => false,
        }
    }
}

/// Matches a numeric identifier, so outages can be written either by name or by id.
fn id_matches(needle: &str, id: usize) -> bool {
    needle.parse::<usize>().map(|n| n == id).unwrap_or(false)
}

/// A set of elements tripped together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contingency {
    pub id: String,
    pub elements: Vec<ContingencyElement>,
}

impl Contingency {
    pub fn new(id: impl Into<String>, elements: Vec<ContingencyElement>) -> Self {
        Self {
            id: id.into(),
            elements,
        }
    }

    fn element_exists(network: &Network, element: &ContingencyElement) -> bool {
        match element.kind {
            ContingencyElementKind::Branch => network.graph.edge_weights().any(|e| {
                let Edge::Branch(b) = e;
                b.name == element.element_id || id_matches(&element.element_id, b.id.value())
            }),
            _ => network
                .graph
                .node_weights()
                .any(|node| element.matches_node(node)),
        }
    }

    /// True when every element of the contingency exists in the network.
    pub fn is_valid(&self, network: &Network) -> bool {
        self.elements
            .iter()
            .all(|element| Self::element_exists(network, element))
    }

    /// Disconnect every element in place.
    ///
    /// Branches are taken out of service rather than removed from the graph,
    /// so node and edge indices stay stable across clones.
    pub fn apply(&self, network: &mut Network) -> AngmonResult<()> {
        if let Some(missing) = self
            .elements
            .iter()
            .find(|element| !Self::element_exists(network, element))
        {
            return Err(AngmonError::Contingency(format!(
                "contingency {} references unknown element {}",
                self.id, missing.element_id
            )));
        }

        for element in &self.elements {
            match element.kind {
                ContingencyElementKind::Branch => {
                    for edge in network.graph.edge_weights_mut() {
                        let Edge::Branch(b) = edge;
                        if b.name == element.element_id
                            || id_matches(&element.element_id, b.id.value())
                        {
                            b.in_service = false;
                        }
                    }
                }
                _ => {
                    for node in network.graph.node_weights_mut() {
                        if !element.matches_node(node) {
                            continue;
                        }
                        match node {
                            Node::Gen(g) => g.connected = false,
                            Node::Load(l) => l.connected = false,
                            Node::DanglingLine(d) => d.connected = false,
                            _ => {}
                        }
                    }
                }
            }
        }
        debug!(contingency = %self.id, elements = self.elements.len(), "contingency applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Branch, BranchId, Bus, BusId, Gen, GenId};

    fn network() -> Network {
        let mut network = Network::new();
        network.add_bus(Bus::new(BusId::new(1), "B1", "VL1"));
        network.add_bus(Bus::new(BusId::new(2), "B2", "VL2"));
        network
            .add_branch(Branch::new(BranchId::new(7), "L1", BusId::new(1), BusId::new(2), 0.1))
            .unwrap();
        network.add_node(Node::Gen(Gen::new(GenId::new(3), "G1", BusId::new(1))));
        network
    }

    #[test]
    fn branch_outage_by_name_or_id() {
        let mut by_name = network();
        Contingency::new("co", vec![ContingencyElement::branch("L1")])
            .apply(&mut by_name)
            .unwrap();
        assert!(!by_name.branch("L1").unwrap().in_service);

        let mut by_id = network();
        Contingency::new("co", vec![ContingencyElement::branch("7")])
            .apply(&mut by_id)
            .unwrap();
        assert!(!by_id.branch("L1").unwrap().in_service);
    }

    #[test]
    fn generator_outage_disconnects() {
        let mut network = network();
        Contingency::new("co", vec![ContingencyElement::generator("G1")])
            .apply(&mut network)
            .unwrap();
        assert!(!network.generator("G1").unwrap().connected);
    }

    #[test]
    fn unknown_element_leaves_network_untouched() {
        let mut network = network();
        let contingency = Contingency::new(
            "co",
            vec![ContingencyElement::branch("L1"), ContingencyElement::branch("L99")],
        );
        assert!(!contingency.is_valid(&network));
        let err = contingency.apply(&mut network).unwrap_err();
        assert!(matches!(err, AngmonError::Contingency(_)));
        assert!(network.branch("L1").unwrap().in_service);
    }

    #[test]
    fn kind_must_match() {
        let network = network();
        let wrong_kind = Contingency::new(
            "co",
            vec![ContingencyElement {
                element_id: "G1".into(),
                kind: ContingencyElementKind::Load,
            }],
        );
        assert!(!wrong_kind.is_valid(&network));
    }
}
