use crate::{BusId, Edge, Network, Node};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::{HashSet, VecDeque};

/// Groups buses into islands, walking only in-service branches (breadth-first search).
///
/// Injections are not graph-connected to their bus, so they never appear in
/// an island. Each island is sorted by bus id.
pub fn bus_islands(network: &Network) -> Vec<Vec<BusId>> {
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut islands = Vec::new();

    for start in network.graph.node_indices() {
        if visited.contains(&start) || !matches!(network.graph[start], Node::Bus(_)) {
            continue;
        }
        let mut island = Vec::new();
        let mut queue = VecDeque::from([start]);
        visited.insert(start);

        while let Some(node) = queue.pop_front() {
            if let Node::Bus(bus) = &network.graph[node] {
                island.push(bus.id);
            }
            for edge in network.graph.edges(node) {
                let Edge::Branch(branch) = edge.weight();
                if !branch.in_service {
                    continue;
                }
                let neighbor = if edge.source() == node {
                    edge.target()
                } else {
                    edge.source()
                };
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        island.sort();
        islands.push(island);
    }

    islands
}

/// The largest island; ties go to the island holding the lowest bus id.
pub fn main_synchronous_component(network: &Network) -> Vec<BusId> {
    bus_islands(network)
        .into_iter()
        .filter(|island| !island.is_empty())
        .min_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])))
        .unwrap_or_default()
}
