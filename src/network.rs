//! In-memory directed road network.
//!
//! Nodes carry (lat, lon); edges are one-way segments weighted by length in
//! metres. Two-way roads are stored as a pair of opposite edges.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

use crate::error::InputError;
use crate::haversine;
use crate::traits::{NodeId, RoadGraph, Snap};

/// Initial half-width in degrees of the snapping search window.
const SNAP_WINDOW_DEG: f64 = 0.002;

/// Metres per degree of latitude.
const METRES_PER_DEG: f64 = 111_195.0;

type IndexedLocation = GeomWithData<[f64; 2], usize>;

#[derive(Debug, Clone, Copy)]
struct Edge {
    to: usize,
    length_m: f64,
}

/// Directed road graph with an R*-tree over node locations.
#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    locations: Vec<(f64, f64)>,
    adjacency: Vec<Vec<Edge>>,
    index: RTree<IndexedLocation>,
    edge_count: usize,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.locations.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Add a node at (lat, lon) and return its id.
    pub fn add_node(&mut self, lat: f64, lon: f64) -> Result<NodeId, InputError> {
        if !(lat.is_finite() && lon.is_finite()) || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(InputError::InvalidCoordinate { lat, lon });
        }
        let id = self.locations.len();
        self.locations.push((lat, lon));
        self.adjacency.push(Vec::new());
        self.index.insert(GeomWithData::new([lat, lon], id));
        Ok(NodeId(id))
    }

    /// Add a one-way segment.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, length_m: f64) -> Result<(), InputError> {
        self.check_node(from)?;
        self.check_node(to)?;
        if !length_m.is_finite() || length_m < 0.0 {
            return Err(InputError::NonFiniteValue {
                field: format!("length of edge {}->{}", from.0, to.0),
            });
        }
        self.adjacency[from.0].push(Edge { to: to.0, length_m });
        self.edge_count += 1;
        Ok(())
    }

    /// Add a two-way road as a pair of opposite segments.
    pub fn add_road(&mut self, a: NodeId, b: NodeId, length_m: f64) -> Result<(), InputError> {
        self.add_edge(a, b, length_m)?;
        self.add_edge(b, a, length_m)
    }

    /// Add a one-way segment whose length is the great-circle distance.
    pub fn add_edge_auto(&mut self, from: NodeId, to: NodeId) -> Result<(), InputError> {
        let length_m = self.straight_line_m(from, to)?;
        self.add_edge(from, to, length_m)
    }

    /// Add a two-way road whose length is the great-circle distance.
    pub fn add_road_auto(&mut self, a: NodeId, b: NodeId) -> Result<(), InputError> {
        let length_m = self.straight_line_m(a, b)?;
        self.add_road(a, b, length_m)
    }

    fn straight_line_m(&self, a: NodeId, b: NodeId) -> Result<f64, InputError> {
        let from = self.location(a)?;
        let to = self.location(b)?;
        Ok(haversine::distance_m(from, to))
    }

    fn check_node(&self, node: NodeId) -> Result<(), InputError> {
        if node.0 < self.locations.len() {
            Ok(())
        } else {
            Err(InputError::UnknownNode(node.0))
        }
    }

    fn location(&self, node: NodeId) -> Result<(f64, f64), InputError> {
        self.locations
            .get(node.0)
            .copied()
            .ok_or(InputError::UnknownNode(node.0))
    }

    /// Single-source Dijkstra. Stops early once `stop_at` is settled.
    fn dijkstra(&self, source: usize, stop_at: Option<usize>) -> SearchTree {
        let n = self.locations.len();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev = vec![None; n];
        if source >= n {
            return SearchTree { dist, prev };
        }

        dist[source] = 0.0;
        let mut heap = BinaryHeap::new();
        heap.push(Frontier { cost: 0.0, node: source });

        while let Some(Frontier { cost, node }) = heap.pop() {
            if Some(node) == stop_at {
                break;
            }
            // Stale entry.
            if cost > dist[node] {
                continue;
            }
            for edge in &self.adjacency[node] {
                let next = cost + edge.length_m;
                if next < dist[edge.to] {
                    dist[edge.to] = next;
                    prev[edge.to] = Some(node);
                    heap.push(Frontier { cost: next, node: edge.to });
                }
            }
        }

        SearchTree { dist, prev }
    }

    fn best_in_window(&self, lat: f64, lon: f64, lat_span: f64, lon_span: f64) -> Option<Snap> {
        let window = AABB::from_corners(
            [lat - lat_span, lon - lon_span],
            [lat + lat_span, lon + lon_span],
        );
        self.best_of(lat, lon, self.index.locate_in_envelope_intersecting(&window))
    }

    fn best_of<'a>(
        &self,
        lat: f64,
        lon: f64,
        candidates: impl Iterator<Item = &'a IndexedLocation>,
    ) -> Option<Snap> {
        candidates
            .map(|candidate| {
                let [node_lat, node_lon] = *candidate.geom();
                Snap {
                    node: NodeId(candidate.data),
                    connector_m: haversine::distance_m((lat, lon), (node_lat, node_lon)),
                }
            })
            .min_by(|a, b| {
                a.connector_m
                    .total_cmp(&b.connector_m)
                    .then_with(|| a.node.cmp(&b.node))
            })
    }
}

struct SearchTree {
    dist: Vec<f64>,
    prev: Vec<Option<usize>>,
}

impl SearchTree {
    fn length_to(&self, target: usize) -> Option<f64> {
        self.dist.get(target).copied().filter(|d| d.is_finite())
    }

    fn path_to(&self, source: usize, target: usize) -> Option<Vec<NodeId>> {
        self.length_to(target)?;
        let mut path = vec![NodeId(target)];
        let mut current = target;
        while current != source {
            current = self.prev[current]?;
            path.push(NodeId(current));
        }
        path.reverse();
        Some(path)
    }
}

/// Min-heap entry; ties broken by the lower node index.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    node: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl RoadGraph for RoadNetwork {
    fn nearest_node(&self, lat: f64, lon: f64) -> Option<Snap> {
        if self.locations.is_empty() {
            return None;
        }

        // Grow the window until it holds a node, then widen it to the
        // great-circle radius of the best hit so no closer node is missed.
        let mut half_width = SNAP_WINDOW_DEG;
        let first = loop {
            if let Some(best) = self.best_in_window(lat, lon, half_width, half_width) {
                break best;
            }
            if half_width > 360.0 {
                return self.best_of(lat, lon, self.index.iter());
            }
            half_width *= 2.0;
        };

        // A degree of longitude is shortest at the poleward edge of the window.
        let lat_span = first.connector_m / METRES_PER_DEG;
        let poleward = (lat.abs() + lat_span).min(90.0);
        let lon_span = (lat_span / poleward.to_radians().cos().max(1e-6)).min(360.0);
        self.best_in_window(lat, lon, lat_span, lon_span)
            .filter(|snap| snap.connector_m <= first.connector_m)
            .or(Some(first))
    }

    fn node_location(&self, node: NodeId) -> Option<(f64, f64)> {
        self.locations.get(node.0).copied()
    }

    fn path_length(&self, from: NodeId, to: NodeId) -> Option<f64> {
        if from == to {
            return self.node_location(from).map(|_| 0.0);
        }
        self.dijkstra(from.0, Some(to.0)).length_to(to.0)
    }

    fn shortest_path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        if from == to {
            return self.node_location(from).map(|_| vec![from]);
        }
        self.dijkstra(from.0, Some(to.0)).path_to(from.0, to.0)
    }

    fn path_lengths_from(&self, from: NodeId, targets: &[NodeId]) -> Vec<Option<f64>> {
        let tree = self.dijkstra(from.0, None);
        targets.iter().map(|target| tree.length_to(target.0)).collect()
    }
}
