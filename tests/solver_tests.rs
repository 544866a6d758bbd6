//! Routing solver tests over small road networks and hand-built matrices.

mod fixtures;

use std::time::{Duration, Instant};

use pickup_planner::{
    Demands, DistanceMatrix, InfeasibleReason, InputError, Outcome, SolveOptions, UNREACHABLE_M,
    VehicleType, build_matrix, solve,
};

use fixtures::{cycle_network, demand_lines, island_network, points, truck};

fn cycle_demands() -> Demands {
    Demands::from_lines(&points(), &demand_lines()).unwrap()
}

/// Matrix of absolute differences between positions along a line, in km.
fn line_matrix(positions: &[f64]) -> DistanceMatrix {
    let rows = positions
        .iter()
        .map(|a| positions.iter().map(|b| (a - b).abs() * 1000.0).collect())
        .collect();
    DistanceMatrix::from_rows(rows).unwrap()
}

/// The scenario C matrix: P1 cannot reach P2, so greedy has to back out.
fn gap_matrix() -> DistanceMatrix {
    let gap = UNREACHABLE_M;
    DistanceMatrix::from_rows(vec![
        vec![0.0, 1000.0, 2000.0, 1000.0],
        vec![1000.0, 0.0, gap, 2000.0],
        vec![2000.0, 1000.0, 0.0, 1000.0],
        vec![1000.0, 2000.0, 1000.0, 0.0],
    ])
    .unwrap()
}

// ============================================================================
// Scenario tests
// ============================================================================

#[test]
fn test_cycle_route_visits_sink_last() {
    let (network, _) = cycle_network();
    let matrix = build_matrix(&network, &points()).unwrap();

    let outcome = solve(
        &matrix,
        &cycle_demands(),
        0,
        3,
        &truck(1000.0),
        &SolveOptions::default(),
    )
    .unwrap();

    let solution = outcome.solution().expect("800 kg fits a 1000 kg truck");
    assert_eq!(solution.visiting_order, vec![0, 1, 2, 3, 0]);
    assert_eq!(solution.point_ids(&["D", "P1", "P2", "S"]), vec!["D", "P1", "P2", "S", "D"]);
    assert!((solution.total_distance_m - 4000.0).abs() < 1e-9);
    assert!((solution.total_cost() - 1200.0).abs() < 1e-9);
    assert!((solution.cost.fixed - 1000.0).abs() < 1e-9);
    assert!((solution.cost.variable - 200.0).abs() < 1e-9);
}

#[test]
fn test_small_truck_exceeds_capacity() {
    let (network, _) = cycle_network();
    let matrix = build_matrix(&network, &points()).unwrap();

    let outcome = solve(
        &matrix,
        &cycle_demands(),
        0,
        3,
        &truck(700.0),
        &SolveOptions::default(),
    )
    .unwrap();

    assert_eq!(outcome, Outcome::infeasible(InfeasibleReason::CapacityExceeded));
}

#[test]
fn test_unreachable_arc_is_routed_around() {
    let matrix = gap_matrix();
    assert!(!matrix.is_reachable(1, 2));

    // Exact search and the greedy-then-backtrack path agree.
    for exact_pickup_limit in [12, 0] {
        let options = SolveOptions {
            exact_pickup_limit,
            ..SolveOptions::default()
        };
        let outcome = solve(&matrix, &cycle_demands(), 0, 3, &truck(1000.0), &options).unwrap();

        let solution = outcome.solution().expect("D-P2-P1-S-D avoids the missing arc");
        assert_eq!(solution.visiting_order, vec![0, 2, 1, 3, 0]);
        assert!((solution.total_distance_m - 6000.0).abs() < 1e-9);
    }
}

#[test]
fn test_load_equal_to_capacity_is_solved() {
    // The 0.1 kg pickup is nearest the depot, so the tour adds 0.1 + 0.2 + 0.3,
    // which rounds above 0.6 even though the index-order total is exactly 0.6.
    let matrix = line_matrix(&[0.0, 3.0, 2.0, 1.0, 4.0]);
    let demands = Demands::from_loads(vec![0.0, 0.3, 0.2, 0.1, 0.0]).unwrap();
    assert_eq!(demands.total(), 0.6);

    let outcome = solve(&matrix, &demands, 0, 4, &truck(0.6), &SolveOptions::default()).unwrap();
    let solution = outcome.solution().expect("fully connected and total == capacity");
    assert_eq!(solution.visiting_order, vec![0, 3, 2, 1, 4, 0]);
    assert!((solution.total_distance_m - 8000.0).abs() < 1e-9);

    let over = Demands::from_loads(vec![0.0, 0.3, 0.2, 0.1 + 1e-9, 0.0]).unwrap();
    let outcome = solve(&matrix, &over, 0, 4, &truck(0.6), &SolveOptions::default()).unwrap();
    assert_eq!(outcome, Outcome::infeasible(InfeasibleReason::CapacityExceeded));
}

#[test]
fn test_island_pickup_is_disconnected() {
    let network = island_network();
    let matrix = build_matrix(&network, &points()).unwrap();
    assert_eq!(matrix.distance(1, 2), UNREACHABLE_M);
    assert_eq!(matrix.distance(2, 0), UNREACHABLE_M);

    let outcome = solve(
        &matrix,
        &cycle_demands(),
        0,
        3,
        &truck(1000.0),
        &SolveOptions::default(),
    )
    .unwrap();

    assert_eq!(outcome, Outcome::infeasible(InfeasibleReason::Disconnected));
}

#[test]
fn test_sink_cannot_return_to_depot() {
    let matrix = DistanceMatrix::from_rows(vec![
        vec![0.0, 100.0, 100.0],
        vec![100.0, 0.0, 100.0],
        vec![UNREACHABLE_M, 100.0, 0.0],
    ])
    .unwrap();
    let demands = Demands::from_loads(vec![0.0, 10.0, 0.0]).unwrap();
    let outcome = solve(&matrix, &demands, 0, 2, &truck(100.0), &SolveOptions::default()).unwrap();
    assert_eq!(outcome, Outcome::infeasible(InfeasibleReason::Disconnected));
}

// ============================================================================
// Search behaviour
// ============================================================================

#[test]
fn test_local_search_beats_greedy_order() {
    // Pickups on a line; greedy goes to the nearest first and has to double back.
    let xs = [0.0_f64, 1.0, -1.5, 4.0, 0.0];
    let rows: Vec<Vec<f64>> = xs
        .iter()
        .map(|a| xs.iter().map(|b| (a - b).abs() * 1000.0).collect())
        .collect();
    let matrix = DistanceMatrix::from_rows(rows).unwrap();
    let demands = Demands::from_loads(vec![0.0, 10.0, 10.0, 10.0, 0.0]).unwrap();

    let solution = solve(&matrix, &demands, 0, 4, &truck(100.0), &SolveOptions::default())
        .unwrap()
        .into_solution()
        .unwrap();

    // Optimal sweeps one way then the other: 1.5 + 5.5 + 4 = 11 km.
    assert!((solution.total_distance_m - 11_000.0).abs() < 1e-6);
    assert_eq!(solution.visiting_order.first(), Some(&0));
    assert_eq!(solution.visiting_order.last(), Some(&0));
    assert_eq!(solution.visiting_order[solution.visiting_order.len() - 2], 4);
}

#[test]
fn test_local_search_reaches_optimum_beyond_exact_limit() {
    // Depot at 0, pickups at -1.5 and 1..=13 km, sink at 13.5 km.
    let mut positions = vec![0.0_f64, -1.5];
    positions.extend((1..=13).map(f64::from));
    positions.push(13.5);
    let matrix = line_matrix(&positions);
    let sink = positions.len() - 1;
    let mut loads = vec![1.0; positions.len()];
    loads[0] = 0.0;
    loads[sink] = 0.0;
    let demands = Demands::from_loads(loads).unwrap();
    let options = SolveOptions::default();
    assert!(sink - 1 > options.exact_pickup_limit);

    let solution = solve(&matrix, &demands, 0, sink, &truck(100.0), &options)
        .unwrap()
        .into_solution()
        .unwrap();

    // Greedy sweeps 1..=13 first and has to come back for -1.5: 56 km.
    // Visiting -1.5 first is 1.5 + 15 + 13.5 = 30 km.
    assert!((solution.total_distance_m - 30_000.0).abs() < 1e-6);
    assert_eq!(solution.visiting_order[1], 1);
    assert_eq!(solution.visiting_order[solution.visiting_order.len() - 2], sink);
}

#[test]
fn test_budget_expiry_during_local_search_returns_a_tour() {
    // 300 pickups scattered pseudo-randomly on a 50 km line.
    let mut state = 0x2545_f491_u64;
    let mut positions = vec![0.0_f64];
    positions.extend((0..300).map(|_| {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        (state >> 33) as f64 / f64::from(1u32 << 31) * 50.0
    }));
    positions.push(25.0);
    let matrix = line_matrix(&positions);
    let sink = positions.len() - 1;
    let mut loads = vec![1.0; positions.len()];
    loads[0] = 0.0;
    loads[sink] = 0.0;
    let demands = Demands::from_loads(loads).unwrap();

    let budget = Duration::from_millis(20);
    let options = SolveOptions {
        time_budget: budget,
        max_iterations: usize::MAX,
        ..SolveOptions::default()
    };
    let started = Instant::now();
    let outcome = solve(&matrix, &demands, 0, sink, &truck(1000.0), &options).unwrap();
    let elapsed = started.elapsed();

    let solution = outcome.solution().expect("a line is fully connected");
    assert_eq!(solution.visiting_order.len(), positions.len() + 1);
    assert_eq!(solution.visiting_order[solution.visiting_order.len() - 2], sink);
    let mut visited = solution.visiting_order[1..=sink].to_vec();
    visited.sort_unstable();
    assert_eq!(visited, (1..=sink).collect::<Vec<_>>());
    assert!(elapsed < budget * 25, "solve took {elapsed:?} on a {budget:?} budget");
}

#[test]
fn test_budget_expiry_during_fallback_search_is_disconnected() {
    let options = SolveOptions {
        time_budget: Duration::ZERO,
        ..SolveOptions::default()
    };
    // Solvable, but greedy is blocked and no time is left to back out.
    let outcome = solve(&gap_matrix(), &cycle_demands(), 0, 3, &truck(1000.0), &options).unwrap();
    assert_eq!(outcome, Outcome::infeasible(InfeasibleReason::Disconnected));
}

#[test]
fn test_zero_budget_still_returns_a_tour() {
    let (network, _) = cycle_network();
    let matrix = build_matrix(&network, &points()).unwrap();
    let options = SolveOptions {
        time_budget: Duration::ZERO,
        ..SolveOptions::default()
    };

    let outcome = solve(&matrix, &cycle_demands(), 0, 3, &truck(1000.0), &options).unwrap();
    let solution = outcome.solution().expect("greedy tour survives an expired budget");
    assert_eq!(solution.visiting_order, vec![0, 1, 2, 3, 0]);
}

#[test]
fn test_solve_is_deterministic() {
    let (network, _) = cycle_network();
    let matrix = build_matrix(&network, &points()).unwrap();
    let first = solve(&matrix, &cycle_demands(), 0, 3, &truck(1000.0), &SolveOptions::default()).unwrap();
    let second = solve(&matrix, &cycle_demands(), 0, 3, &truck(1000.0), &SolveOptions::default()).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Input validation
// ============================================================================

#[test]
fn test_rejects_bad_indices_and_shapes() {
    let (network, _) = cycle_network();
    let matrix = build_matrix(&network, &points()).unwrap();
    let demands = cycle_demands();
    let options = SolveOptions::default();
    let vehicle = truck(1000.0);

    assert_eq!(
        solve(&matrix, &demands, 0, 9, &vehicle, &options),
        Err(InputError::IndexOutOfRange { index: 9, size: 4 })
    );
    assert_eq!(
        solve(&matrix, &demands, 3, 3, &vehicle, &options),
        Err(InputError::DepotIsSink)
    );

    let short = Demands::from_loads(vec![0.0, 1.0]).unwrap();
    assert_eq!(
        solve(&matrix, &short, 0, 3, &vehicle, &options),
        Err(InputError::DemandShape { len: 2, expected: 4 })
    );

    let on_sink = Demands::from_loads(vec![0.0, 1.0, 1.0, 5.0]).unwrap();
    assert_eq!(
        solve(&matrix, &on_sink, 0, 3, &vehicle, &options),
        Err(InputError::DemandOnTerminal(3))
    );

    let broken = VehicleType::new("broken", 0.0, 0.0, 0.0);
    assert!(matches!(
        solve(&matrix, &demands, 0, 3, &broken, &options),
        Err(InputError::NonPositiveCapacity { .. })
    ));
}
