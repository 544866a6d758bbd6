//! End-to-end planning: request validation, matrix build, vehicle filtering
//! and selection.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::InputError;
use crate::fleet::{CompatibilityTable, VehicleCatalog, filter_candidates};
use crate::matrix::{DistanceMatrix, build_matrix, validate_order};
use crate::model::{PickupDemand, Point, PointRole};
use crate::reconstruct::RoutePath;
use crate::selector::select;
use crate::solution::{Infeasible, InfeasibleReason, Outcome};
use crate::solver::{Demands, SolveOptions};
use crate::traits::RoadGraph;

/// Everything needed to plan one collection tour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Points in any order; exactly one depot and one sink.
    pub points: Vec<Point>,
    pub demands: Vec<PickupDemand>,
    pub fleet: VehicleCatalog,
    #[serde(default)]
    pub compatibility: CompatibilityTable,
}

impl PlanRequest {
    pub fn new(
        points: Vec<Point>,
        demands: Vec<PickupDemand>,
        fleet: VehicleCatalog,
        compatibility: CompatibilityTable,
    ) -> Self {
        Self {
            points,
            demands,
            fleet,
            compatibility,
        }
    }

    /// Check the request without touching a graph.
    pub fn validate(&self) -> Result<(), InputError> {
        let points = self.ordered_points()?;
        Demands::from_lines(&points, &self.demands)?;
        for vehicle in self.fleet.iter() {
            vehicle.validate()?;
        }
        Ok(())
    }

    /// Points arranged as `[depot, pickups.., sink]`, pickups in input order.
    pub fn ordered_points(&self) -> Result<Vec<Point>, InputError> {
        let mut depot = None;
        let mut sink = None;
        let mut pickups = Vec::new();
        for point in &self.points {
            point.validate()?;
            match point.role {
                PointRole::Depot if depot.is_some() => return Err(InputError::MultipleDepots),
                PointRole::Depot => depot = Some(point.clone()),
                PointRole::Sink if sink.is_some() => return Err(InputError::MultipleSinks),
                PointRole::Sink => sink = Some(point.clone()),
                PointRole::Pickup => pickups.push(point.clone()),
            }
        }

        let mut ordered = Vec::with_capacity(self.points.len());
        ordered.push(depot.ok_or(InputError::MissingDepot)?);
        let sink = sink.ok_or(InputError::MissingSink)?;
        ordered.extend(pickups);
        ordered.push(sink);
        validate_order(&ordered)?;
        Ok(ordered)
    }

    /// Distinct non-empty resource kinds, sorted.
    pub fn required_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self
            .demands
            .iter()
            .map(|line| line.resource_kind.as_str())
            .filter(|kind| !kind.is_empty())
            .collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }

    pub fn total_demand_kg(&self) -> f64 {
        self.demands.iter().map(|line| line.quantity_kg).sum()
    }
}

/// Result of [`Planner::plan`]: the matrix it was solved on and the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub matrix: DistanceMatrix,
    pub outcome: Outcome,
}

impl Plan {
    /// Road geometry of the chosen tour, if one was found.
    pub fn route_path<'a, G: RoadGraph + ?Sized>(&'a self, graph: &'a G) -> Option<RoutePath<'a, G>> {
        let solution = self.outcome.solution()?;
        Some(RoutePath::new(graph, &solution.visiting_order, self.matrix.anchors()))
    }

    /// Visiting order as point ids, if a tour was found.
    pub fn visiting_ids(&self) -> Option<Vec<&str>> {
        let solution = self.outcome.solution()?;
        Some(solution.point_ids(&self.matrix.point_ids()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Planner {
    options: SolveOptions,
}

impl Planner {
    pub fn new(options: SolveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SolveOptions {
        &self.options
    }

    /// Plan the cheapest single-vehicle tour for `request` over `graph`.
    pub fn plan<G: RoadGraph + ?Sized>(
        &self,
        graph: &G,
        request: &PlanRequest,
    ) -> Result<Plan, InputError> {
        let points = request.ordered_points()?;
        let demands = Demands::from_lines(&points, &request.demands)?;
        let matrix = build_matrix(graph, &points)?;

        let kinds = request.required_kinds();
        let total_demand_kg = demands.total();
        info!(
            pickups = points.len() - 2,
            vehicles = request.fleet.len(),
            total_demand_kg,
            kinds = kinds.len(),
            "planning collection tour"
        );

        let candidates = filter_candidates(
            request.fleet.as_slice(),
            &kinds,
            total_demand_kg,
            &request.compatibility,
        )?;
        info!(candidates = candidates.len(), "vehicle candidates filtered");

        let outcome = if candidates.is_empty() {
            Outcome::Infeasible(explain_empty_filter(request, &kinds))
        } else {
            let sink = points.len() - 1;
            select(&matrix, &demands, 0, sink, &candidates, &self.options)?
        };

        Ok(Plan { matrix, outcome })
    }
}

/// Why the filter left no candidates.
fn explain_empty_filter(request: &PlanRequest, kinds: &[&str]) -> Infeasible {
    let table = &request.compatibility;
    let fleet = request.fleet.as_slice();

    let kind_compatible = fleet
        .iter()
        .any(|vehicle| table.supports_all(&vehicle.name, kinds));
    if kind_compatible {
        debug!("kind-compatible vehicles exist but none holds the load");
        return Infeasible::new(InfeasibleReason::NoCompatibleVehicle)
            .with_cause(Some(InfeasibleReason::CapacityExceeded));
    }

    let mut infeasible = Infeasible::new(InfeasibleReason::NoCompatibleVehicle);
    infeasible.multi_vehicle_candidate = kinds.len() > 1
        && kinds.iter().all(|kind| {
            fleet
                .iter()
                .any(|vehicle| table.get(&vehicle.name, kind).permits())
        });
    if infeasible.multi_vehicle_candidate {
        debug!(?kinds, "every kind is serviceable, but not by a single vehicle");
    }
    infeasible
}
