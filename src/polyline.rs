//! Polyline representation for route geometries.
//!
//! Coordinates are (latitude, longitude) pairs in degrees. Encoding to a
//! compact wire format is left to whatever renders the route.

use serde::{Deserialize, Serialize};

/// A route geometry as a sequence of coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    /// Creates a new Polyline from (latitude, longitude) points.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }

    pub fn first(&self) -> Option<(f64, f64)> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.points.last().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append a point unless it repeats the current last point.
    pub fn push(&mut self, point: (f64, f64)) {
        if self.last() != Some(point) {
            self.points.push(point);
        }
    }

    /// Append another polyline, dropping a shared boundary point.
    pub fn extend(&mut self, other: &Polyline) {
        let mut rest = other.points.iter().copied();
        if let Some(first) = rest.next() {
            self.push(first);
        }
        self.points.extend(rest);
    }

    /// Join legs end to end without repeating the point where they meet.
    pub fn concat<'a>(legs: impl IntoIterator<Item = &'a Polyline>) -> Polyline {
        let mut joined = Polyline::default();
        for leg in legs {
            joined.extend(leg);
        }
        joined
    }
}
