//! Road graph query interface consumed by the planner core.
//!
//! The core never fetches or caches graphs; it only asks these questions.
//! [`RoadNetwork`](crate::network::RoadNetwork) is the in-memory implementation.

use serde::{Deserialize, Serialize};

/// Identifier of a node in a road graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Result of snapping a coordinate onto the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    pub node: NodeId,
    /// Distance in metres between the queried coordinate and the node.
    pub connector_m: f64,
}

/// A directed road graph weighted by segment length in metres.
pub trait RoadGraph {
    /// Nearest graph node to (lat, lon). `None` only when the graph is empty.
    fn nearest_node(&self, lat: f64, lon: f64) -> Option<Snap>;

    /// Location (lat, lon) of a node.
    fn node_location(&self, node: NodeId) -> Option<(f64, f64)>;

    /// Shortest path length in metres, or `None` if `to` cannot be reached.
    fn path_length(&self, from: NodeId, to: NodeId) -> Option<f64>;

    /// Node sequence of a shortest path, both endpoints included.
    fn shortest_path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>>;

    /// Shortest path lengths from one source to each target, index-aligned.
    ///
    /// The default asks [`RoadGraph::path_length`] per target; implementations
    /// should answer with a single search.
    fn path_lengths_from(&self, from: NodeId, targets: &[NodeId]) -> Vec<Option<f64>> {
        targets
            .iter()
            .map(|target| self.path_length(from, *target))
            .collect()
    }
}
