//! Offline parsing of Overpass responses into road networks.

use pickup_planner::overpass::{OverpassResponse, network_from_overpass};
use pickup_planner::{GraphLoadError, RoadGraph};

fn parse(json: &str) -> OverpassResponse {
    serde_json::from_str(json).unwrap()
}

const SAMPLE: &str = r#"{
    "version": 0.6,
    "generator": "Overpass API",
    "elements": [
        {"type": "node", "id": 101, "lat": 35.0000, "lon": 139.0000},
        {"type": "node", "id": 102, "lat": 35.0000, "lon": 139.0010},
        {"type": "node", "id": 103, "lat": 35.0010, "lon": 139.0010},
        {"type": "node", "id": 104, "lat": 35.0010, "lon": 139.0000, "tags": {"highway": "traffic_signals"}},
        {"type": "way", "id": 1, "nodes": [101, 102, 103], "tags": {"highway": "residential"}},
        {"type": "way", "id": 2, "nodes": [103, 104], "tags": {"highway": "primary", "oneway": "yes"}},
        {"type": "way", "id": 3, "nodes": [101, 104], "tags": {"highway": "service", "oneway": "-1"}},
        {"type": "relation", "id": 9, "members": []}
    ]
}"#;

#[test]
fn test_parses_nodes_and_directed_ways() {
    let network = network_from_overpass(&parse(SAMPLE)).unwrap();
    assert_eq!(network.node_count(), 4);
    // way 1: two two-way segments; way 2: one; way 3: one reversed
    assert_eq!(network.edge_count(), 6);

    let a = network.nearest_node(35.0, 139.0).unwrap().node;
    let c = network.nearest_node(35.001, 139.001).unwrap().node;
    let d = network.nearest_node(35.001, 139.0).unwrap().node;

    // 103 -> 104 is one-way, 104 -> 101 comes from the reversed service road.
    assert!(network.path_length(c, d).is_some());
    assert!(network.path_length(d, a).is_some());
    let back = network.shortest_path(a, d).unwrap();
    assert_eq!(back.len(), 4, "a reaches d only around the block");
}

#[test]
fn test_roundabout_is_one_way() {
    let json = r#"{"elements": [
        {"type": "node", "id": 1, "lat": 35.0, "lon": 139.0},
        {"type": "node", "id": 2, "lat": 35.0, "lon": 139.001},
        {"type": "way", "id": 7, "nodes": [1, 2], "tags": {"highway": "primary", "junction": "roundabout"}}
    ]}"#;
    let network = network_from_overpass(&parse(json)).unwrap();
    assert_eq!(network.edge_count(), 1);
    let a = network.nearest_node(35.0, 139.0).unwrap().node;
    let b = network.nearest_node(35.0, 139.001).unwrap().node;
    assert!(network.path_length(a, b).is_some());
    assert!(network.path_length(b, a).is_none());
}

#[test]
fn test_missing_node_reference_is_skipped() {
    let json = r#"{"elements": [
        {"type": "node", "id": 1, "lat": 35.0, "lon": 139.0},
        {"type": "node", "id": 2, "lat": 35.0, "lon": 139.001},
        {"type": "way", "id": 7, "nodes": [1, 2, 99], "tags": {"highway": "residential"}}
    ]}"#;
    let network = network_from_overpass(&parse(json)).unwrap();
    assert_eq!(network.edge_count(), 2);
}

#[test]
fn test_edge_lengths_are_great_circle() {
    let json = r#"{"elements": [
        {"type": "node", "id": 1, "lat": 35.0, "lon": 139.0},
        {"type": "node", "id": 2, "lat": 35.001, "lon": 139.0},
        {"type": "way", "id": 7, "nodes": [1, 2], "tags": {"highway": "residential"}}
    ]}"#;
    let network = network_from_overpass(&parse(json)).unwrap();
    let a = network.nearest_node(35.0, 139.0).unwrap().node;
    let b = network.nearest_node(35.001, 139.0).unwrap().node;
    let length = network.path_length(a, b).unwrap();
    assert!((length - 111.2).abs() < 0.5, "got {length}");
}

#[test]
fn test_no_ways_is_empty_response() {
    let json = r#"{"elements": [{"type": "node", "id": 1, "lat": 35.0, "lon": 139.0}]}"#;
    assert!(matches!(
        network_from_overpass(&parse(json)),
        Err(GraphLoadError::EmptyResponse)
    ));
}

#[test]
fn test_invalid_coordinate_is_rejected() {
    let json = r#"{"elements": [
        {"type": "node", "id": 1, "lat": 95.0, "lon": 139.0},
        {"type": "way", "id": 7, "nodes": [1], "tags": {}}
    ]}"#;
    assert!(matches!(
        network_from_overpass(&parse(json)),
        Err(GraphLoadError::InvalidElement(_))
    ));
}
