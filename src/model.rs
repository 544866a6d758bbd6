//! Plain input data handed to the planner by the calling layer.

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Role of a point within a collection problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointRole {
    Depot,
    Pickup,
    Sink,
}

/// A geographic point supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub role: PointRole,
}

impl Point {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64, role: PointRole) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            role,
        }
    }

    pub fn depot(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self::new(id, lat, lon, PointRole::Depot)
    }

    pub fn pickup(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self::new(id, lat, lon, PointRole::Pickup)
    }

    pub fn sink(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self::new(id, lat, lon, PointRole::Sink)
    }

    /// Location as (lat, lon).
    pub fn location(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    pub(crate) fn validate(&self) -> Result<(), InputError> {
        let in_range = self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon);
        if in_range {
            Ok(())
        } else {
            Err(InputError::InvalidCoordinate {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }
}

/// One demand line at a pickup point. Several lines may share a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupDemand {
    pub point_id: String,
    pub quantity_kg: f64,
    pub resource_kind: String,
}

impl PickupDemand {
    pub fn new(point_id: impl Into<String>, quantity_kg: f64, resource_kind: impl Into<String>) -> Self {
        Self {
            point_id: point_id.into(),
            quantity_kg,
            resource_kind: resource_kind.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), InputError> {
        if !self.quantity_kg.is_finite() {
            return Err(InputError::NonFiniteValue {
                field: format!("quantity_kg of {}", self.point_id),
            });
        }
        if self.quantity_kg <= 0.0 {
            return Err(InputError::NonPositiveDemand {
                point_id: self.point_id.clone(),
                quantity_kg: self.quantity_kg,
            });
        }
        Ok(())
    }
}

/// A candidate vehicle type registered in the fleet catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleType {
    pub name: String,
    pub capacity_kg: f64,
    /// Cost charged once per tour.
    pub fixed_cost: f64,
    /// Variable cost per kilometre driven.
    pub per_km_cost: f64,
    /// Depreciation-style fixed cost that still scales with distance.
    #[serde(default)]
    pub fixed_cost_per_km: f64,
    #[serde(default)]
    pub energy_kwh_per_km: f64,
}

impl VehicleType {
    pub fn new(name: impl Into<String>, capacity_kg: f64, fixed_cost: f64, per_km_cost: f64) -> Self {
        Self {
            name: name.into(),
            capacity_kg,
            fixed_cost,
            per_km_cost,
            fixed_cost_per_km: 0.0,
            energy_kwh_per_km: 0.0,
        }
    }

    pub fn with_fixed_cost_per_km(mut self, cost: f64) -> Self {
        self.fixed_cost_per_km = cost;
        self
    }

    pub fn with_energy_kwh_per_km(mut self, kwh: f64) -> Self {
        self.energy_kwh_per_km = kwh;
        self
    }

    pub fn validate(&self) -> Result<(), InputError> {
        let numbers = [
            ("capacity_kg", self.capacity_kg),
            ("fixed_cost", self.fixed_cost),
            ("per_km_cost", self.per_km_cost),
            ("fixed_cost_per_km", self.fixed_cost_per_km),
            ("energy_kwh_per_km", self.energy_kwh_per_km),
        ];
        for (field, value) in numbers {
            if !value.is_finite() {
                return Err(InputError::NonFiniteValue {
                    field: format!("{field} of {}", self.name),
                });
            }
        }
        if self.capacity_kg <= 0.0 {
            return Err(InputError::NonPositiveCapacity {
                vehicle: self.name.clone(),
                capacity_kg: self.capacity_kg,
            });
        }
        let costs = [
            ("fixed_cost", self.fixed_cost),
            ("per_km_cost", self.per_km_cost),
            ("fixed_cost_per_km", self.fixed_cost_per_km),
            ("energy_kwh_per_km", self.energy_kwh_per_km),
        ];
        for (field, value) in costs {
            if value < 0.0 {
                return Err(InputError::NegativeCost {
                    vehicle: self.name.clone(),
                    field,
                });
            }
        }
        Ok(())
    }
}

/// Whether a vehicle can carry a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compatibility {
    Supported,
    Unsupported,
    /// No information recorded; treated as permissive.
    #[default]
    Unknown,
}

impl Compatibility {
    pub fn permits(self) -> bool {
        !matches!(self, Compatibility::Unsupported)
    }
}

impl From<Option<bool>> for Compatibility {
    fn from(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Compatibility::Supported,
            Some(false) => Compatibility::Unsupported,
            None => Compatibility::Unknown,
        }
    }
}
