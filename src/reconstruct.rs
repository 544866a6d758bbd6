//! Path reconstruction: turn a visiting order into drawable road geometry.

use std::iter::FusedIterator;

use tracing::warn;

use crate::matrix::Anchor;
use crate::polyline::Polyline;
use crate::traits::RoadGraph;

/// Lazy view of a tour's legs over a road graph.
///
/// Nothing is computed until the legs are iterated, and every iteration
/// recomputes the same polylines from the same graph and order.
pub struct RoutePath<'a, G: RoadGraph + ?Sized> {
    graph: &'a G,
    visiting_order: &'a [usize],
    anchors: &'a [Anchor],
    connectors: bool,
}

impl<'a, G: RoadGraph + ?Sized> RoutePath<'a, G> {
    pub fn new(graph: &'a G, visiting_order: &'a [usize], anchors: &'a [Anchor]) -> Self {
        Self {
            graph,
            visiting_order,
            anchors,
            connectors: false,
        }
    }

    /// Start and end every leg at the logical point rather than its anchor node.
    pub fn with_connectors(mut self, connectors: bool) -> Self {
        self.connectors = connectors;
        self
    }

    /// One polyline per consecutive pair in the visiting order.
    pub fn legs(&self) -> Legs<'a, G> {
        Legs {
            graph: self.graph,
            visiting_order: self.visiting_order,
            anchors: self.anchors,
            connectors: self.connectors,
            next: 0,
        }
    }

    pub fn leg_count(&self) -> usize {
        self.visiting_order.len().saturating_sub(1)
    }

    /// The whole tour as one polyline.
    pub fn flatten(&self) -> Polyline {
        self.legs().fold(Polyline::default(), |mut joined, leg| {
            joined.extend(&leg);
            joined
        })
    }
}

impl<'a, G: RoadGraph + ?Sized> IntoIterator for &RoutePath<'a, G> {
    type Item = Polyline;
    type IntoIter = Legs<'a, G>;

    fn into_iter(self) -> Self::IntoIter {
        self.legs()
    }
}

/// Iterator over the legs of a [`RoutePath`].
pub struct Legs<'a, G: RoadGraph + ?Sized> {
    graph: &'a G,
    visiting_order: &'a [usize],
    anchors: &'a [Anchor],
    connectors: bool,
    next: usize,
}

// Manual impl: a derive would demand `G: Clone`.
impl<G: RoadGraph + ?Sized> Clone for Legs<'_, G> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph,
            visiting_order: self.visiting_order,
            anchors: self.anchors,
            connectors: self.connectors,
            next: self.next,
        }
    }
}

impl<G: RoadGraph + ?Sized> Legs<'_, G> {
    fn leg(&self, from: usize, to: usize) -> Polyline {
        let (Some(start), Some(end)) = (self.anchors.get(from), self.anchors.get(to)) else {
            warn!(from, to, "visiting order refers to a point without an anchor");
            return Polyline::default();
        };

        let Some(nodes) = self.graph.shortest_path(start.node, end.node) else {
            warn!(
                from = %start.point_id,
                to = %end.point_id,
                "no road path between consecutive stops"
            );
            return Polyline::default();
        };

        let mut leg = Polyline::default();
        if self.connectors {
            leg.push((start.lat, start.lon));
        }
        for location in nodes.iter().filter_map(|node| self.graph.node_location(*node)) {
            leg.push(location);
        }
        if self.connectors {
            leg.push((end.lat, end.lon));
        }
        leg
    }
}

impl<G: RoadGraph + ?Sized> Iterator for Legs<'_, G> {
    type Item = Polyline;

    fn next(&mut self) -> Option<Polyline> {
        let pair = self.visiting_order.get(self.next..self.next + 2)?;
        self.next += 1;
        Some(self.leg(pair[0], pair[1]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.visiting_order.len().saturating_sub(self.next + 1);
        (remaining, Some(remaining))
    }
}

impl<G: RoadGraph + ?Sized> ExactSizeIterator for Legs<'_, G> {}

impl<G: RoadGraph + ?Sized> FusedIterator for Legs<'_, G> {}
