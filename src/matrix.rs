//! Distance matrix over the logical points of a collection problem.
//!
//! Points are snapped onto their nearest graph node (the anchor) and the
//! matrix holds `connector(i) + shortest_path(anchor_i, anchor_j) + connector(j)`
//! for every ordered pair. Pairs with no path carry [`UNREACHABLE_M`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::InputError;
use crate::model::{Point, PointRole};
use crate::traits::{NodeId, RoadGraph};

/// Sentinel distance for unreachable pairs.
pub const UNREACHABLE_M: f64 = 1e9;

/// A logical point attached to its nearest graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub point_id: String,
    pub node: NodeId,
    pub connector_m: f64,
    /// Location of the logical point, not of the node.
    pub lat: f64,
    pub lon: f64,
}

/// Square matrix of distances in metres, index-aligned with the point list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    size: usize,
    data: Vec<f64>,
    anchors: Vec<Anchor>,
}

impl DistanceMatrix {
    /// Wrap caller-supplied rows.
    ///
    /// The diagonal is forced to zero and anything at or beyond the sentinel
    /// is clamped to it.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, InputError> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(InputError::MatrixShape {
                    row: i,
                    len: row.len(),
                    expected: size,
                });
            }
            for (j, value) in row.into_iter().enumerate() {
                if value.is_nan() || value < 0.0 {
                    return Err(InputError::NonFiniteValue {
                        field: format!("distance[{i}][{j}]"),
                    });
                }
                data.push(if i == j { 0.0 } else { value.min(UNREACHABLE_M) });
            }
        }
        Ok(Self {
            size,
            data,
            anchors: Vec::new(),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Distance from `from` to `to` in metres.
    ///
    /// Out-of-range indices read as unreachable.
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        if from >= self.size || to >= self.size {
            return UNREACHABLE_M;
        }
        self.data[from * self.size + to]
    }

    pub fn is_reachable(&self, from: usize, to: usize) -> bool {
        self.distance(from, to) < UNREACHABLE_M
    }

    /// Anchors of the points the matrix was built from; empty for [`DistanceMatrix::from_rows`].
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn index_of(&self, point_id: &str) -> Option<usize> {
        self.anchors
            .iter()
            .position(|anchor| anchor.point_id == point_id)
    }

    pub fn point_ids(&self) -> Vec<&str> {
        self.anchors
            .iter()
            .map(|anchor| anchor.point_id.as_str())
            .collect()
    }

    /// Ordered pairs with no path between them.
    pub fn unreachable_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for i in 0..self.size {
            for j in 0..self.size {
                if !self.is_reachable(i, j) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    /// Rows as nested vectors.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data
            .chunks(self.size.max(1))
            .take(self.size)
            .map(<[f64]>::to_vec)
            .collect()
    }
}

/// Build the distance matrix for `points` ordered `[depot, pickup_1 .. pickup_n, sink]`.
pub fn build_matrix<G: RoadGraph + ?Sized>(
    graph: &G,
    points: &[Point],
) -> Result<DistanceMatrix, InputError> {
    validate_order(points)?;

    let mut anchors = Vec::with_capacity(points.len());
    for point in points {
        point.validate()?;
        let snap = graph
            .nearest_node(point.lat, point.lon)
            .ok_or(InputError::EmptyGraph)?;
        debug!(
            point = %point.id,
            node = snap.node.0,
            connector_m = snap.connector_m,
            "snapped point onto road graph"
        );
        anchors.push(Anchor {
            point_id: point.id.clone(),
            node: snap.node,
            connector_m: snap.connector_m,
            lat: point.lat,
            lon: point.lon,
        });
    }

    let size = anchors.len();
    let nodes: Vec<NodeId> = anchors.iter().map(|anchor| anchor.node).collect();
    let mut data = vec![UNREACHABLE_M; size * size];
    let mut unreachable = 0usize;

    for (i, source) in anchors.iter().enumerate() {
        let lengths = graph.path_lengths_from(source.node, &nodes);
        for (j, (target, length)) in anchors.iter().zip(lengths).enumerate() {
            let cell = &mut data[i * size + j];
            if i == j {
                *cell = 0.0;
                continue;
            }
            match length {
                Some(length_m) => {
                    *cell = (source.connector_m + length_m + target.connector_m).min(UNREACHABLE_M);
                }
                None => unreachable += 1,
            }
        }
    }

    if unreachable > 0 {
        warn!(unreachable, "distance matrix contains unreachable pairs");
    }
    info!(points = size, "distance matrix built");

    Ok(DistanceMatrix {
        size,
        data,
        anchors,
    })
}

/// Enforce `[depot, pickups.., sink]` with unique ids and at least one pickup.
pub(crate) fn validate_order(points: &[Point]) -> Result<(), InputError> {
    let first = points.first().ok_or(InputError::MissingDepot)?;
    if first.role != PointRole::Depot {
        return Err(if points.iter().any(|p| p.role == PointRole::Depot) {
            InputError::PointOrder { index: 0 }
        } else {
            InputError::MissingDepot
        });
    }
    let last_index = points.len() - 1;
    let last = &points[last_index];
    if last.role != PointRole::Sink {
        return Err(if points.iter().any(|p| p.role == PointRole::Sink) {
            InputError::PointOrder { index: last_index }
        } else {
            InputError::MissingSink
        });
    }
    if points.len() < 3 {
        return Err(InputError::NoPickups);
    }

    for point in &points[1..last_index] {
        match point.role {
            PointRole::Pickup => {}
            PointRole::Depot => return Err(InputError::MultipleDepots),
            PointRole::Sink => return Err(InputError::MultipleSinks),
        }
    }

    let mut seen = HashSet::new();
    for point in points {
        if !seen.insert(point.id.as_str()) {
            return Err(InputError::DuplicatePointId(point.id.clone()));
        }
    }
    Ok(())
}
