//! Routing solver for one vehicle.
//!
//! A tour is `depot -> pickups (any order) -> sink -> depot`. Small tours are
//! solved exactly with a dynamic program over pickup subsets. Larger ones get
//! a greedy tour, a bounded depth-first search when the greedy walk hits
//! unreachable arcs, then 2-opt, relocate, or-opt and swap moves until no
//! move helps or the time budget runs out.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::InputError;
use crate::matrix::{DistanceMatrix, UNREACHABLE_M};
use crate::model::{PickupDemand, Point, PointRole, VehicleType};
use crate::solution::{InfeasibleReason, Outcome, Solution};

/// Distances closer than this are treated as equal.
const DISTANCE_EPSILON: f64 = 1e-6;

/// Hard ceiling on `exact_pickup_limit`; the subset table grows as `2^k * k`.
const EXACT_PICKUP_CAP: usize = 16;

/// Longest run of consecutive pickups moved by or-opt.
const OR_OPT_MAX_SEGMENT: usize = 3;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Hard wall-clock budget per vehicle solve.
    pub time_budget: Duration,
    /// Maximum local search passes.
    pub max_iterations: usize,
    /// Tours with at most this many pickups are solved exactly.
    pub exact_pickup_limit: usize,
    /// Solve candidate vehicles on the rayon pool.
    pub parallel: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(5),
            max_iterations: 100,
            exact_pickup_limit: 12,
            parallel: true,
        }
    }
}

/// Per-index load in kg, aligned with the distance matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Demands {
    loads: Vec<f64>,
}

impl Demands {
    /// Wrap a raw load vector.
    pub fn from_loads(loads: Vec<f64>) -> Result<Self, InputError> {
        for (index, load) in loads.iter().enumerate() {
            if !load.is_finite() || *load < 0.0 {
                return Err(InputError::NonFiniteValue {
                    field: format!("load at index {index}"),
                });
            }
        }
        Ok(Self { loads })
    }

    /// Accumulate demand lines onto the point ordering used by the matrix.
    ///
    /// Lines sharing a point id add up.
    pub fn from_lines(points: &[Point], lines: &[PickupDemand]) -> Result<Self, InputError> {
        let mut loads = vec![0.0; points.len()];
        for line in lines {
            line.validate()?;
            let index = points
                .iter()
                .position(|p| p.id == line.point_id)
                .ok_or_else(|| InputError::UnknownPoint(line.point_id.clone()))?;
            if points[index].role != PointRole::Pickup {
                return Err(InputError::NotAPickup(line.point_id.clone()));
            }
            loads[index] += line.quantity_kg;
        }
        Ok(Self { loads })
    }

    pub fn load(&self, index: usize) -> f64 {
        self.loads.get(index).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.loads.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }
}

/// Indices and the matrix shared by every move evaluation.
struct Instance<'a> {
    matrix: &'a DistanceMatrix,
    depot: usize,
    sink: usize,
    pickups: &'a [usize],
}

impl Instance<'_> {
    /// Tour length for a pickup sequence, or `None` if it uses an unreachable arc.
    ///
    /// Capacity is checked once before the search: loads are non-negative,
    /// so no prefix of a tour carries more than the whole tour.
    fn evaluate(&self, pickups: &[usize]) -> Option<f64> {
        let mut distance = 0.0;
        let mut previous = self.depot;
        for &stop in pickups {
            distance += self.arc(previous, stop)?;
            previous = stop;
        }
        Some(distance + self.finish(previous)?)
    }

    fn arc(&self, from: usize, to: usize) -> Option<f64> {
        let distance = self.matrix.distance(from, to);
        (distance < UNREACHABLE_M).then_some(distance)
    }

    /// `last -> sink -> depot`.
    fn finish(&self, last: usize) -> Option<f64> {
        Some(self.arc(last, self.sink)? + self.arc(self.sink, self.depot)?)
    }

    fn full_order(&self, pickups: &[usize]) -> Vec<usize> {
        let mut order = Vec::with_capacity(pickups.len() + 3);
        order.push(self.depot);
        order.extend_from_slice(pickups);
        order.push(self.sink);
        order.push(self.depot);
        order
    }
}

/// Current best pickup sequence and its length.
#[derive(Debug, Clone)]
struct TourState {
    pickups: Vec<usize>,
    distance_m: f64,
}

impl TourState {
    /// Shorter wins; equal lengths fall back to the lexicographically smaller sequence.
    fn is_improved_by(&self, pickups: &[usize], distance_m: f64) -> bool {
        if distance_m < self.distance_m - DISTANCE_EPSILON {
            return true;
        }
        (distance_m - self.distance_m).abs() <= DISTANCE_EPSILON
            && pickups.cmp(&self.pickups) == Ordering::Less
    }

    /// Take `candidate` if every arc is reachable and it improves the tour.
    fn adopt(&mut self, instance: &Instance<'_>, candidate: Vec<usize>) -> bool {
        match instance.evaluate(&candidate) {
            Some(distance_m) if self.is_improved_by(&candidate, distance_m) => {
                self.pickups = candidate;
                self.distance_m = distance_m;
                true
            }
            _ => false,
        }
    }
}

/// Find the shortest feasible tour for `vehicle`.
pub fn solve(
    matrix: &DistanceMatrix,
    demands: &Demands,
    depot: usize,
    sink: usize,
    vehicle: &VehicleType,
    options: &SolveOptions,
) -> Result<Outcome, InputError> {
    validate_terminals(matrix, demands, depot, sink)?;
    let pickups: Vec<usize> = (0..matrix.size())
        .filter(|index| *index != depot && *index != sink)
        .collect();
    solve_pickups(matrix, demands, depot, sink, &pickups, vehicle, options)
}

/// Index and shape checks shared by every entry point taking raw indices.
pub(crate) fn validate_terminals(
    matrix: &DistanceMatrix,
    demands: &Demands,
    depot: usize,
    sink: usize,
) -> Result<(), InputError> {
    let size = matrix.size();
    for index in [depot, sink] {
        if index >= size {
            return Err(InputError::IndexOutOfRange { index, size });
        }
    }
    if depot == sink {
        return Err(InputError::DepotIsSink);
    }
    if demands.len() != size {
        return Err(InputError::DemandShape {
            len: demands.len(),
            expected: size,
        });
    }
    for index in [depot, sink] {
        if demands.load(index) != 0.0 {
            return Err(InputError::DemandOnTerminal(index));
        }
    }
    Ok(())
}

/// Solve a tour through `pickups` only. Terminals must already be validated.
pub(crate) fn solve_pickups(
    matrix: &DistanceMatrix,
    demands: &Demands,
    depot: usize,
    sink: usize,
    pickups: &[usize],
    vehicle: &VehicleType,
    options: &SolveOptions,
) -> Result<Outcome, InputError> {
    vehicle.validate()?;

    let load_kg: f64 = pickups.iter().map(|&index| demands.load(index)).sum();
    if load_kg > vehicle.capacity_kg {
        debug!(
            vehicle = %vehicle.name,
            demand_kg = load_kg,
            capacity_kg = vehicle.capacity_kg,
            "demand exceeds capacity"
        );
        return Ok(Outcome::infeasible(InfeasibleReason::CapacityExceeded));
    }

    let instance = Instance {
        matrix,
        depot,
        sink,
        pickups,
    };
    let started = Instant::now();
    // Budgets too large for the clock are capped at a day.
    let deadline = started
        .checked_add(options.time_budget)
        .unwrap_or(started + Duration::from_secs(86_400));

    let Some(tour) = search(&instance, deadline, options) else {
        debug!(vehicle = %vehicle.name, "no tour avoids unreachable arcs");
        return Ok(Outcome::infeasible(InfeasibleReason::Disconnected));
    };

    debug!(
        vehicle = %vehicle.name,
        pickups = pickups.len(),
        distance_m = tour.distance_m,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "vehicle solve finished"
    );
    Ok(Outcome::Solved(Solution::new(
        vehicle.clone(),
        instance.full_order(&tour.pickups),
        tour.distance_m,
    )))
}

/// Best tour within the budget, or `None` when no reachable order was found.
fn search(instance: &Instance<'_>, deadline: Instant, options: &SolveOptions) -> Option<TourState> {
    instance.arc(instance.sink, instance.depot)?;

    if instance.pickups.len() <= options.exact_pickup_limit.min(EXACT_PICKUP_CAP) {
        match exact_tour(instance, deadline) {
            Exact::Optimal(tour) => return Some(tour),
            Exact::Unreachable => return None,
            Exact::Expired => debug!("exact search out of budget, falling back to local search"),
        }
    }

    let mut tour = initial_tour(instance, deadline)?;
    local_search(instance, &mut tour, deadline, options);
    Some(tour)
}

// ============================================================================
// Exact search
// ============================================================================

enum Exact {
    Optimal(TourState),
    Unreachable,
    Expired,
}

/// Dynamic program over visited-pickup sets.
///
/// `cost[mask * k + last]` is the shortest way to finish the tour from pickup
/// `last` once every pickup in `mask` has been visited: the remaining
/// pickups, then the sink, then the depot. The tour is traced forwards,
/// taking the lowest matrix index among optimal continuations.
fn exact_tour(instance: &Instance<'_>, deadline: Instant) -> Exact {
    let stops = instance.pickups;
    let k = stops.len();
    if k == 0 {
        return match instance.evaluate(&[]) {
            Some(distance_m) => Exact::Optimal(TourState {
                pickups: Vec::new(),
                distance_m,
            }),
            None => Exact::Unreachable,
        };
    }

    let full = (1usize << k) - 1;
    let mut cost = vec![f64::INFINITY; (full + 1) * k];
    for (last, &stop) in stops.iter().enumerate() {
        cost[full * k + last] = instance.finish(stop).unwrap_or(f64::INFINITY);
    }
    for mask in (1..full).rev() {
        if Instant::now() >= deadline {
            return Exact::Expired;
        }
        for last in (0..k).filter(|last| mask & (1 << *last) != 0) {
            let mut best = f64::INFINITY;
            for next in (0..k).filter(|next| mask & (1 << *next) == 0) {
                if let Some(arc) = instance.arc(stops[last], stops[next]) {
                    best = best.min(arc + cost[(mask | 1 << next) * k + next]);
                }
            }
            cost[mask * k + last] = best;
        }
    }

    match trace_optimal(instance, &cost) {
        Some(pickups) => match instance.evaluate(&pickups) {
            Some(distance_m) => Exact::Optimal(TourState { pickups, distance_m }),
            None => Exact::Unreachable,
        },
        None => Exact::Unreachable,
    }
}

fn trace_optimal(instance: &Instance<'_>, cost: &[f64]) -> Option<Vec<usize>> {
    let stops = instance.pickups;
    let k = stops.len();
    let continuation = |current: usize, mask: usize, next: usize| {
        let arc = instance.arc(current, stops[next])?;
        let rest = cost[(mask | 1 << next) * k + next];
        rest.is_finite().then_some((arc + rest, rest))
    };

    let mut remaining = (0..k)
        .filter_map(|next| continuation(instance.depot, 0, next))
        .map(|(total, _)| total)
        .reduce(f64::min)?;

    let mut sequence = Vec::with_capacity(k);
    let mut current = instance.depot;
    let mut mask = 0usize;
    while sequence.len() < k {
        let (next, rest) = (0..k)
            .filter(|next| mask & (1 << *next) == 0)
            .filter_map(|next| {
                let (total, rest) = continuation(current, mask, next)?;
                (total <= remaining + DISTANCE_EPSILON).then_some((next, rest))
            })
            .min_by_key(|(next, _)| stops[*next])?;
        mask |= 1 << next;
        current = stops[next];
        remaining = rest;
        sequence.push(current);
    }
    Some(sequence)
}

// ============================================================================
// Construction
// ============================================================================

fn initial_tour(instance: &Instance<'_>, deadline: Instant) -> Option<TourState> {
    let pickups = instance.pickups;

    let sequence = match greedy_sequence(instance, pickups) {
        Some(sequence) => sequence,
        None => {
            debug!("greedy construction blocked, searching for a reachable order");
            let mut sequence = Vec::with_capacity(pickups.len());
            let mut visited = vec![false; instance.matrix.size()];
            let mut expired = false;
            if !extend_reachable(instance, pickups, &mut sequence, &mut visited, deadline, &mut expired) {
                if expired {
                    warn!("time budget expired before a reachable order was found");
                }
                return None;
            }
            sequence
        }
    };

    let distance_m = instance.evaluate(&sequence)?;
    Some(TourState {
        pickups: sequence,
        distance_m,
    })
}

/// Nearest reachable unvisited pickup at every step; sink is appended last.
fn greedy_sequence(instance: &Instance<'_>, pickups: &[usize]) -> Option<Vec<usize>> {
    let mut remaining = pickups.to_vec();
    let mut sequence = Vec::with_capacity(pickups.len());
    let mut current = instance.depot;

    while !remaining.is_empty() {
        let (position, _) = remaining
            .iter()
            .enumerate()
            .filter_map(|(position, &stop)| instance.arc(current, stop).map(|d| (position, d)))
            .min_by(|(a_pos, a), (b_pos, b)| {
                a.total_cmp(b)
                    .then_with(|| remaining[*a_pos].cmp(&remaining[*b_pos]))
            })?;
        current = remaining.remove(position);
        sequence.push(current);
    }

    instance.arc(current, instance.sink)?;
    Some(sequence)
}

/// Depth-first search for any pickup order whose arcs are all reachable.
fn extend_reachable(
    instance: &Instance<'_>,
    pickups: &[usize],
    sequence: &mut Vec<usize>,
    visited: &mut [bool],
    deadline: Instant,
    expired: &mut bool,
) -> bool {
    let current = sequence.last().copied().unwrap_or(instance.depot);
    if sequence.len() == pickups.len() {
        return instance.arc(current, instance.sink).is_some();
    }
    if Instant::now() >= deadline {
        *expired = true;
        return false;
    }

    let mut next: Vec<(usize, f64)> = pickups
        .iter()
        .filter(|stop| !visited[**stop])
        .filter_map(|&stop| instance.arc(current, stop).map(|d| (stop, d)))
        .collect();
    next.sort_by(|(a, da), (b, db)| da.total_cmp(db).then_with(|| a.cmp(b)));

    for (stop, _) in next {
        visited[stop] = true;
        sequence.push(stop);
        if extend_reachable(instance, pickups, sequence, visited, deadline, expired) {
            return true;
        }
        sequence.pop();
        visited[stop] = false;
        if *expired {
            return false;
        }
    }
    false
}

// ============================================================================
// Local Search Operators
// ============================================================================

/// 2-opt: reverse a segment of the pickup sequence.
/// Returns true if an improvement was made.
fn two_opt_improve(instance: &Instance<'_>, tour: &mut TourState, deadline: Instant) -> bool {
    let n = tour.pickups.len();
    if n < 2 {
        return false;
    }

    for i in 0..n - 1 {
        for j in i + 1..n {
            if Instant::now() >= deadline {
                return false;
            }
            let mut candidate = tour.pickups.clone();
            candidate[i..=j].reverse();
            if tour.adopt(instance, candidate) {
                return true;
            }
        }
    }

    false
}

/// Relocate: move one pickup to another position in the sequence.
/// Returns true if an improvement was made.
fn relocate_improve(instance: &Instance<'_>, tour: &mut TourState, deadline: Instant) -> bool {
    let n = tour.pickups.len();
    if n < 2 {
        return false;
    }

    for from in 0..n {
        for to in 0..n {
            if from == to {
                continue;
            }
            if Instant::now() >= deadline {
                return false;
            }
            let mut candidate = tour.pickups.clone();
            let stop = candidate.remove(from);
            candidate.insert(to, stop);
            if tour.adopt(instance, candidate) {
                return true;
            }
        }
    }

    false
}

/// Or-opt: move a run of consecutive pickups, keeping its direction.
/// Single pickups are left to relocate.
fn or_opt_improve(instance: &Instance<'_>, tour: &mut TourState, deadline: Instant) -> bool {
    let n = tour.pickups.len();

    for len in 2..=OR_OPT_MAX_SEGMENT.min(n.saturating_sub(1)) {
        for from in 0..=n - len {
            for to in 0..=n - len {
                if from == to {
                    continue;
                }
                if Instant::now() >= deadline {
                    return false;
                }
                let mut candidate = tour.pickups.clone();
                let segment: Vec<usize> = candidate.drain(from..from + len).collect();
                candidate.splice(to..to, segment);
                if tour.adopt(instance, candidate) {
                    return true;
                }
            }
        }
    }

    false
}

/// Swap: exchange two non-adjacent pickups.
fn swap_improve(instance: &Instance<'_>, tour: &mut TourState, deadline: Instant) -> bool {
    let n = tour.pickups.len();

    for i in 0..n.saturating_sub(2) {
        for j in i + 2..n {
            if Instant::now() >= deadline {
                return false;
            }
            let mut candidate = tour.pickups.clone();
            candidate.swap(i, j);
            if tour.adopt(instance, candidate) {
                return true;
            }
        }
    }

    false
}

/// Run local search until no more improvements, max iterations, or the deadline.
fn local_search(instance: &Instance<'_>, tour: &mut TourState, deadline: Instant, options: &SolveOptions) {
    for pass in 0..options.max_iterations {
        if Instant::now() >= deadline {
            warn!(pass, distance_m = tour.distance_m, "local search budget expired");
            return;
        }

        let mut improved = two_opt_improve(instance, tour, deadline);
        improved |= relocate_improve(instance, tour, deadline);
        improved |= or_opt_improve(instance, tour, deadline);
        improved |= swap_improve(instance, tour, deadline);

        if !improved {
            debug!(pass, "local search converged");
            return;
        }
    }
}
