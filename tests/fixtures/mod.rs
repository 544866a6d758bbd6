//! Test fixtures for pickup-planner.
//!
//! Small road networks with points sitting exactly on their nodes, so
//! connector distances are zero and matrix entries equal path lengths.

#![allow(dead_code)]

use pickup_planner::{
    CompatibilityTable, NodeId, PickupDemand, PlanRequest, Point, RoadNetwork, VehicleCatalog,
    VehicleType,
};

pub const D: (f64, f64) = (35.000, 139.000);
pub const P1: (f64, f64) = (35.000, 139.010);
pub const P2: (f64, f64) = (35.010, 139.010);
pub const S: (f64, f64) = (35.010, 139.000);

/// Two-way cycle D–P1–P2–S–D with every road 1000 m long.
pub fn cycle_network() -> (RoadNetwork, [NodeId; 4]) {
    let mut network = RoadNetwork::new();
    let ids = [D, P1, P2, S].map(|(lat, lon)| network.add_node(lat, lon).unwrap());
    for i in 0..4 {
        network.add_road(ids[i], ids[(i + 1) % 4], 1000.0).unwrap();
    }
    (network, ids)
}

/// D–P1–S–D triangle plus P2 on its own island.
pub fn island_network() -> RoadNetwork {
    let mut network = RoadNetwork::new();
    let d = network.add_node(D.0, D.1).unwrap();
    let p1 = network.add_node(P1.0, P1.1).unwrap();
    let s = network.add_node(S.0, S.1).unwrap();
    let p2 = network.add_node(P2.0, P2.1).unwrap();
    let beyond = network.add_node(P2.0 + 0.01, P2.1).unwrap();
    network.add_road(d, p1, 1000.0).unwrap();
    network.add_road(p1, s, 1400.0).unwrap();
    network.add_road(s, d, 1000.0).unwrap();
    network.add_road(p2, beyond, 1000.0).unwrap();
    network
}

/// Canonically ordered `[D, P1, P2, S]`.
pub fn points() -> Vec<Point> {
    vec![
        Point::depot("D", D.0, D.1),
        Point::pickup("P1", P1.0, P1.1),
        Point::pickup("P2", P2.0, P2.1),
        Point::sink("S", S.0, S.1),
    ]
}

/// P1 500 kg, P2 300 kg.
pub fn demand_lines() -> Vec<PickupDemand> {
    vec![
        PickupDemand::new("P1", 500.0, "wood"),
        PickupDemand::new("P2", 300.0, "wood"),
    ]
}

pub fn truck(capacity_kg: f64) -> VehicleType {
    VehicleType::new("truck", capacity_kg, 1000.0, 50.0)
}

pub fn request(fleet: Vec<VehicleType>) -> PlanRequest {
    PlanRequest::new(
        points(),
        demand_lines(),
        VehicleCatalog::try_from(fleet).unwrap(),
        CompatibilityTable::new(),
    )
}
