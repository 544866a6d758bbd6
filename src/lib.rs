//! pickup-planner core
//!
//! Plans a single-vehicle collection tour over a road network: depot, pickups,
//! a mandatory sink visited after every pickup, then back to the depot.
//! Pickups already split between vehicles can be routed as a fleet with
//! [`solve_assignments`].

pub mod assignment;
pub mod error;
pub mod fleet;
pub mod haversine;
pub mod matrix;
pub mod model;
pub mod network;
pub mod overpass;
pub mod planner;
pub mod polyline;
pub mod reconstruct;
pub mod selector;
pub mod solution;
pub mod solver;
pub mod traits;

pub use assignment::{Assignment, solve_assignments};
pub use error::{GraphLoadError, InputError};
pub use fleet::{CompatibilityTable, VehicleCatalog, filter_candidates};
pub use matrix::{Anchor, DistanceMatrix, UNREACHABLE_M, build_matrix};
pub use model::{Compatibility, PickupDemand, Point, PointRole, VehicleType};
pub use network::RoadNetwork;
pub use overpass::{OverpassClient, OverpassConfig, network_from_overpass};
pub use planner::{Plan, PlanRequest, Planner};
pub use polyline::Polyline;
pub use reconstruct::RoutePath;
pub use selector::select;
pub use solution::{
    CostBreakdown, FleetOutcome, FleetSolution, Infeasible, InfeasibleReason, Outcome, Solution,
};
pub use solver::{Demands, SolveOptions, solve};
pub use traits::{NodeId, RoadGraph, Snap};
