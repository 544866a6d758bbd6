//! Overpass HTTP adapter for OpenStreetMap road networks.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::GraphLoadError;
use crate::network::RoadNetwork;
use crate::traits::NodeId;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverpassConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// OSM `highway` values treated as drivable.
    pub highway_classes: Vec<String>,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        let highway_classes = [
            "motorway",
            "motorway_link",
            "trunk",
            "trunk_link",
            "primary",
            "primary_link",
            "secondary",
            "secondary_link",
            "tertiary",
            "tertiary_link",
            "unclassified",
            "residential",
            "living_street",
            "service",
        ];
        Self {
            base_url: "https://overpass-api.de/api/interpreter".to_string(),
            timeout_secs: 60,
            user_agent: concat!("pickup-planner/", env!("CARGO_PKG_VERSION")).to_string(),
            highway_classes: highway_classes.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverpassClient {
    config: OverpassConfig,
    client: reqwest::blocking::Client,
}

impl OverpassClient {
    pub fn new(config: OverpassConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    /// Query for drivable ways inside the box, plus the nodes they reference.
    pub fn query(&self, south: f64, west: f64, north: f64, east: f64) -> String {
        format!(
            "[out:json][timeout:{timeout}];way[\"highway\"~\"^({classes})$\"]({south},{west},{north},{east});(._;>;);out body;",
            timeout = self.config.timeout_secs,
            classes = self.config.highway_classes.join("|"),
        )
    }

    /// Fetch the drivable network inside a bounding box.
    pub fn fetch_network(
        &self,
        south: f64,
        west: f64,
        north: f64,
        east: f64,
    ) -> Result<RoadNetwork, GraphLoadError> {
        let valid = [south, west, north, east].iter().all(|v| v.is_finite())
            && (-90.0..=90.0).contains(&south)
            && (-90.0..=90.0).contains(&north)
            && (-180.0..=180.0).contains(&west)
            && (-180.0..=180.0).contains(&east)
            && south < north
            && west < east;
        if !valid {
            return Err(GraphLoadError::InvalidBoundingBox {
                south,
                west,
                north,
                east,
            });
        }

        debug!(south, west, north, east, url = %self.config.base_url, "requesting overpass data");
        let body = self
            .client
            .post(&self.config.base_url)
            .form(&[("data", self.query(south, west, north, east))])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OverpassResponse>())?;

        let network = network_from_overpass(&body)?;
        info!(
            nodes = network.node_count(),
            edges = network.edge_count(),
            "road network loaded"
        );
        Ok(network)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OverpassElement {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
    },
    Way {
        id: i64,
        #[serde(default)]
        nodes: Vec<i64>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Both,
    Forward,
    Backward,
}

fn direction(tags: &HashMap<String, String>) -> Direction {
    match tags.get("oneway").map(String::as_str) {
        Some("yes" | "true" | "1") => Direction::Forward,
        Some("-1" | "reverse") => Direction::Backward,
        Some("no" | "false" | "0") => Direction::Both,
        _ if tags.get("junction").map(String::as_str) == Some("roundabout") => Direction::Forward,
        _ => Direction::Both,
    }
}

/// Build a [`RoadNetwork`] from an Overpass JSON response.
///
/// Edge lengths are great-circle distances between consecutive way nodes.
pub fn network_from_overpass(response: &OverpassResponse) -> Result<RoadNetwork, GraphLoadError> {
    let mut network = RoadNetwork::new();
    let mut ids: HashMap<i64, NodeId> = HashMap::new();

    for element in &response.elements {
        if let OverpassElement::Node { id, lat, lon } = element {
            if ids.contains_key(id) {
                continue;
            }
            let node = network.add_node(*lat, *lon)?;
            ids.insert(*id, node);
        }
    }

    for element in &response.elements {
        let OverpassElement::Way { id, nodes, tags } = element else {
            continue;
        };
        let direction = direction(tags);
        for pair in nodes.windows(2) {
            let (Some(&a), Some(&b)) = (ids.get(&pair[0]), ids.get(&pair[1])) else {
                warn!(way = id, "way references a node missing from the response");
                continue;
            };
            if a == b {
                continue;
            }
            match direction {
                Direction::Both => network.add_road_auto(a, b)?,
                Direction::Forward => network.add_edge_auto(a, b)?,
                Direction::Backward => network.add_edge_auto(b, a)?,
            }
        }
    }

    if network.edge_count() == 0 {
        return Err(GraphLoadError::EmptyResponse);
    }
    Ok(network)
}
