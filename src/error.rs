//! Error types for invalid input and graph loading.
//!
//! Infeasibility is not an error: solvers report it through
//! [`Outcome::Infeasible`](crate::solution::Outcome).

use thiserror::Error;

/// Malformed input rejected at a component boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("pickup demand for point {point_id} must be positive, got {quantity_kg}")]
    NonPositiveDemand { point_id: String, quantity_kg: f64 },

    #[error("{field} must be a finite number")]
    NonFiniteValue { field: String },

    #[error("vehicle {vehicle} must have positive capacity, got {capacity_kg}")]
    NonPositiveCapacity { vehicle: String, capacity_kg: f64 },

    #[error("vehicle {vehicle} has a negative {field}")]
    NegativeCost { vehicle: String, field: &'static str },

    #[error("duplicate point id {0}")]
    DuplicatePointId(String),

    #[error("duplicate vehicle name {0}")]
    DuplicateVehicle(String),

    #[error("no depot point supplied")]
    MissingDepot,

    #[error("no sink point supplied")]
    MissingSink,

    #[error("more than one depot point supplied")]
    MultipleDepots,

    #[error("more than one sink point supplied")]
    MultipleSinks,

    #[error("at least one pickup point is required")]
    NoPickups,

    #[error("unknown point id {0}")]
    UnknownPoint(String),

    #[error("point {0} is not a pickup")]
    NotAPickup(String),

    #[error("points must be ordered [depot, pickups.., sink]; offending index {index}")]
    PointOrder { index: usize },

    #[error("coordinate ({lat}, {lon}) is out of range")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("road graph has no nodes")]
    EmptyGraph,

    #[error("road graph has no node {0}")]
    UnknownNode(usize),

    #[error("distance matrix must be square; row {row} has {len} entries, expected {expected}")]
    MatrixShape { row: usize, len: usize, expected: usize },

    #[error("index {index} out of range for {size} points")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("depot and sink must be distinct indices")]
    DepotIsSink,

    #[error("demand vector has {len} entries for a {expected}-point matrix")]
    DemandShape { len: usize, expected: usize },

    #[error("demand at non-pickup index {0} must be zero")]
    DemandOnTerminal(usize),

    #[error("index {0} is the depot or sink and cannot be assigned to a vehicle")]
    AssignedTerminal(usize),

    #[error("pickup index {0} is assigned more than once")]
    DuplicateAssignment(usize),
}

/// Failures while fetching a road graph from a remote provider.
#[derive(Debug, Error)]
pub enum GraphLoadError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("bounding box ({south}, {west}, {north}, {east}) is invalid")]
    InvalidBoundingBox {
        south: f64,
        west: f64,
        north: f64,
        east: f64,
    },

    #[error("provider returned no drivable ways")]
    EmptyResponse,

    #[error("provider returned an invalid element: {0}")]
    InvalidElement(#[from] InputError),
}
