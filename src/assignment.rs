//! Routes for a fleet whose pickups the caller has already split between
//! vehicles.
//!
//! Each `(vehicle, pickups)` group is solved as its own single-vehicle tour
//! through the shared depot and sink. No allocation happens here: pickups
//! left out of every group are simply not visited.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::InputError;
use crate::matrix::DistanceMatrix;
use crate::model::VehicleType;
use crate::solution::{FleetOutcome, FleetSolution, Outcome};
use crate::solver::{Demands, SolveOptions, solve_pickups, validate_terminals};

/// Pickup indices assigned to one vehicle.
pub type Assignment<'a> = (&'a VehicleType, Vec<usize>);

/// Solve every assigned group and sum the tours.
///
/// Groups with no pickups are skipped. The first group that cannot be
/// routed, in assignment order, decides the infeasible outcome.
pub fn solve_assignments(
    matrix: &DistanceMatrix,
    demands: &Demands,
    depot: usize,
    sink: usize,
    assignments: &[Assignment<'_>],
    options: &SolveOptions,
) -> Result<FleetOutcome, InputError> {
    validate_terminals(matrix, demands, depot, sink)?;

    let size = matrix.size();
    let mut assigned = vec![false; size];
    let mut groups: Vec<(&VehicleType, Vec<usize>)> = Vec::with_capacity(assignments.len());
    for (vehicle, pickups) in assignments {
        for &index in pickups {
            if index >= size {
                return Err(InputError::IndexOutOfRange { index, size });
            }
            if index == depot || index == sink {
                return Err(InputError::AssignedTerminal(index));
            }
            if assigned[index] {
                return Err(InputError::DuplicateAssignment(index));
            }
            assigned[index] = true;
        }
        if pickups.is_empty() {
            debug!(vehicle = %vehicle.name, "skipping vehicle with no assigned pickups");
            continue;
        }
        let mut pickups = pickups.clone();
        pickups.sort_unstable();
        groups.push((*vehicle, pickups));
    }
    if groups.is_empty() {
        return Err(InputError::NoPickups);
    }

    let run = |(vehicle, pickups): &(&VehicleType, Vec<usize>)| {
        solve_pickups(matrix, demands, depot, sink, pickups, vehicle, options)
    };
    let outcomes: Vec<Outcome> = if options.parallel && groups.len() > 1 {
        groups.par_iter().map(run).collect::<Result<_, _>>()?
    } else {
        groups.iter().map(run).collect::<Result<_, _>>()?
    };

    let mut routes = Vec::with_capacity(outcomes.len());
    for (group, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Outcome::Solved(solution) => routes.push(solution),
            Outcome::Infeasible(infeasible) => {
                info!(group, reason = ?infeasible.reason, "assigned group could not be routed");
                return Ok(FleetOutcome::Infeasible(infeasible));
            }
        }
    }

    let fleet = FleetSolution::new(routes);
    info!(
        routes = fleet.routes.len(),
        total_cost = fleet.total_cost(),
        distance_m = fleet.total_distance_m,
        "fleet routed"
    );
    Ok(FleetOutcome::Solved(fleet))
}
