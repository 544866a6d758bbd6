//! Solver outputs: solutions, cost breakdowns and infeasibility outcomes.

use std::iter::Sum;

use serde::{Deserialize, Serialize};

use crate::model::VehicleType;

/// Cost of one tour split into its fixed and distance-proportional parts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub fixed: f64,
    pub variable: f64,
    pub total: f64,
    pub distance_km: f64,
    /// Present when the vehicle declares an energy consumption rate.
    pub energy_kwh: Option<f64>,
}

impl CostBreakdown {
    /// Cost of `vehicle` driving `distance_m` metres.
    pub fn evaluate(vehicle: &VehicleType, distance_m: f64) -> Self {
        let distance_km = distance_m / 1000.0;
        let fixed = vehicle.fixed_cost + vehicle.fixed_cost_per_km * distance_km;
        let variable = vehicle.per_km_cost * distance_km;
        let energy_kwh = (vehicle.energy_kwh_per_km > 0.0).then(|| vehicle.energy_kwh_per_km * distance_km);
        Self {
            fixed,
            variable,
            total: fixed + variable,
            distance_km,
            energy_kwh,
        }
    }
}

impl<'a> Sum<&'a CostBreakdown> for CostBreakdown {
    /// Energy stays `None` unless some tour reports it.
    fn sum<I: Iterator<Item = &'a CostBreakdown>>(iter: I) -> Self {
        iter.fold(
            CostBreakdown {
                fixed: 0.0,
                variable: 0.0,
                total: 0.0,
                distance_km: 0.0,
                energy_kwh: None,
            },
            |acc, cost| CostBreakdown {
                fixed: acc.fixed + cost.fixed,
                variable: acc.variable + cost.variable,
                total: acc.total + cost.total,
                distance_km: acc.distance_km + cost.distance_km,
                energy_kwh: match (acc.energy_kwh, cost.energy_kwh) {
                    (Some(a), Some(b)) => Some(a + b),
                    (a, b) => a.or(b),
                },
            },
        )
    }
}

/// A feasible tour for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub vehicle: VehicleType,
    /// Matrix indices, starting and ending at the depot, sink just before the return.
    pub visiting_order: Vec<usize>,
    pub total_distance_m: f64,
    pub cost: CostBreakdown,
}

impl Solution {
    pub fn new(vehicle: VehicleType, visiting_order: Vec<usize>, total_distance_m: f64) -> Self {
        let cost = CostBreakdown::evaluate(&vehicle, total_distance_m);
        Self {
            vehicle,
            visiting_order,
            total_distance_m,
            cost,
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.cost.total
    }

    /// The visiting order expressed as point ids. Indices without an id are skipped.
    pub fn point_ids<'a>(&self, point_ids: &[&'a str]) -> Vec<&'a str> {
        self.visiting_order
            .iter()
            .filter_map(|index| point_ids.get(*index).copied())
            .collect()
    }
}

/// One tour per assigned vehicle group, with costs summed over the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSolution {
    /// In assignment order; groups without pickups have no route.
    pub routes: Vec<Solution>,
    pub total_distance_m: f64,
    pub cost: CostBreakdown,
}

impl FleetSolution {
    pub fn new(routes: Vec<Solution>) -> Self {
        let total_distance_m = routes.iter().map(|route| route.total_distance_m).sum();
        let cost = routes.iter().map(|route| &route.cost).sum();
        Self {
            routes,
            total_distance_m,
            cost,
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.cost.total
    }
}

/// Why no tour could be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InfeasibleReason {
    Disconnected,
    CapacityExceeded,
    NoCompatibleVehicle,
}

/// A typed "no solution" result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infeasible {
    pub reason: InfeasibleReason,
    /// Most informative per-vehicle reason behind a fleet-level failure.
    pub cause: Option<InfeasibleReason>,
    /// Every resource kind is serviceable by some vehicle, just not by one vehicle
    /// alone. Multi-vehicle allocation is not attempted.
    #[serde(default)]
    pub multi_vehicle_candidate: bool,
}

impl Infeasible {
    pub fn new(reason: InfeasibleReason) -> Self {
        Self {
            reason,
            cause: None,
            multi_vehicle_candidate: false,
        }
    }

    pub fn with_cause(mut self, cause: Option<InfeasibleReason>) -> Self {
        self.cause = cause;
        self
    }
}

/// Result of a solve, select or plan call on valid input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Solved(Solution),
    Infeasible(Infeasible),
}

impl Outcome {
    pub fn infeasible(reason: InfeasibleReason) -> Self {
        Outcome::Infeasible(Infeasible::new(reason))
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Outcome::Solved(solution) => Some(solution),
            Outcome::Infeasible(_) => None,
        }
    }

    pub fn into_solution(self) -> Option<Solution> {
        match self {
            Outcome::Solved(solution) => Some(solution),
            Outcome::Infeasible(_) => None,
        }
    }

    pub fn infeasibility(&self) -> Option<&Infeasible> {
        match self {
            Outcome::Solved(_) => None,
            Outcome::Infeasible(infeasible) => Some(infeasible),
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, Outcome::Solved(_))
    }
}

/// Result of routing a caller-assigned fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FleetOutcome {
    Solved(FleetSolution),
    /// The first group that could not be routed.
    Infeasible(Infeasible),
}

impl FleetOutcome {
    pub fn solution(&self) -> Option<&FleetSolution> {
        match self {
            FleetOutcome::Solved(solution) => Some(solution),
            FleetOutcome::Infeasible(_) => None,
        }
    }

    pub fn infeasibility(&self) -> Option<&Infeasible> {
        match self {
            FleetOutcome::Solved(_) => None,
            FleetOutcome::Infeasible(infeasible) => Some(infeasible),
        }
    }
}
