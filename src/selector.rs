//! Fleet selector: solve every candidate vehicle and keep the cheapest tour.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::InputError;
use crate::matrix::DistanceMatrix;
use crate::model::VehicleType;
use crate::solution::{Infeasible, InfeasibleReason, Outcome, Solution};
use crate::solver::{Demands, SolveOptions, solve};

/// Solve each candidate and return the minimum-cost solution.
///
/// Ties go to the candidate listed first. When every candidate fails the
/// result is [`InfeasibleReason::NoCompatibleVehicle`] with the most
/// actionable per-vehicle reason as its cause.
pub fn select(
    matrix: &DistanceMatrix,
    demands: &Demands,
    depot: usize,
    sink: usize,
    candidates: &[&VehicleType],
    options: &SolveOptions,
) -> Result<Outcome, InputError> {
    if candidates.is_empty() {
        debug!("no candidate vehicles to solve");
        return Ok(Outcome::infeasible(InfeasibleReason::NoCompatibleVehicle));
    }

    let run = |vehicle: &&VehicleType| solve(matrix, demands, depot, sink, vehicle, options);
    // Outcomes stay in candidate order on both paths.
    let outcomes: Vec<Outcome> = if options.parallel && candidates.len() > 1 {
        candidates.par_iter().map(run).collect::<Result<_, _>>()?
    } else {
        candidates.iter().map(run).collect::<Result<_, _>>()?
    };

    let mut best: Option<Solution> = None;
    let mut cause: Option<InfeasibleReason> = None;
    for outcome in outcomes {
        match outcome {
            Outcome::Solved(solution) => {
                let better = best
                    .as_ref()
                    .is_none_or(|current| solution.total_cost() < current.total_cost());
                if better {
                    best = Some(solution);
                }
            }
            Outcome::Infeasible(infeasible) => {
                cause = Some(most_actionable(cause, infeasible.reason));
            }
        }
    }

    match best {
        Some(solution) => {
            info!(
                vehicle = %solution.vehicle.name,
                total_cost = solution.total_cost(),
                distance_m = solution.total_distance_m,
                "selected vehicle"
            );
            Ok(Outcome::Solved(solution))
        }
        None => {
            debug!(?cause, "every candidate vehicle failed");
            Ok(Outcome::Infeasible(
                Infeasible::new(InfeasibleReason::NoCompatibleVehicle).with_cause(cause),
            ))
        }
    }
}

/// Capacity problems are fixable by the caller, so they win over connectivity.
fn most_actionable(current: Option<InfeasibleReason>, next: InfeasibleReason) -> InfeasibleReason {
    match (current, next) {
        (Some(InfeasibleReason::CapacityExceeded), _) | (_, InfeasibleReason::CapacityExceeded) => {
            InfeasibleReason::CapacityExceeded
        }
        (Some(existing), _) => existing,
        (None, next) => next,
    }
}
