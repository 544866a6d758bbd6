//! Fleet catalog, compatibility table and the vehicle candidate filter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InputError;
use crate::model::{Compatibility, VehicleType};

/// Registered vehicle types in registration order.
///
/// Re-registering a name replaces the definition but keeps its position, so
/// catalog order stays a stable tie-break.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleCatalog {
    vehicles: Vec<VehicleType>,
}

impl VehicleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a vehicle definition.
    pub fn add(&mut self, vehicle: VehicleType) -> Result<&VehicleType, InputError> {
        vehicle.validate()?;
        let position = match self.vehicles.iter().position(|v| v.name == vehicle.name) {
            Some(position) => {
                self.vehicles[position] = vehicle;
                position
            }
            None => {
                self.vehicles.push(vehicle);
                self.vehicles.len() - 1
            }
        };
        Ok(&self.vehicles[position])
    }

    pub fn remove(&mut self, name: &str) -> Option<VehicleType> {
        let position = self.vehicles.iter().position(|v| v.name == name)?;
        Some(self.vehicles.remove(position))
    }

    pub fn get(&self, name: &str) -> Option<&VehicleType> {
        self.vehicles.iter().find(|v| v.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VehicleType> {
        self.vehicles.iter()
    }

    pub fn as_slice(&self) -> &[VehicleType] {
        &self.vehicles
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Vehicles whose capacity covers `total_demand_kg`, in catalog order.
    pub fn valid_for_demand(&self, total_demand_kg: f64) -> Vec<&VehicleType> {
        self.vehicles
            .iter()
            .filter(|v| v.capacity_kg >= total_demand_kg)
            .collect()
    }
}

impl TryFrom<Vec<VehicleType>> for VehicleCatalog {
    type Error = InputError;

    fn try_from(vehicles: Vec<VehicleType>) -> Result<Self, Self::Error> {
        let mut catalog = Self::new();
        for vehicle in vehicles {
            if catalog.get(&vehicle.name).is_some() {
                return Err(InputError::DuplicateVehicle(vehicle.name));
            }
            catalog.add(vehicle)?;
        }
        Ok(catalog)
    }
}

/// Vehicle × resource kind → compatibility.
///
/// Absent vehicles and absent kinds read as [`Compatibility::Unknown`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityTable {
    entries: HashMap<String, HashMap<String, Compatibility>>,
}

impl CompatibilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        vehicle: impl Into<String>,
        resource_kind: impl Into<String>,
        compatibility: Compatibility,
    ) -> &mut Self {
        self.entries
            .entry(vehicle.into())
            .or_default()
            .insert(resource_kind.into(), compatibility);
        self
    }

    pub fn with(
        mut self,
        vehicle: impl Into<String>,
        resource_kind: impl Into<String>,
        compatibility: Compatibility,
    ) -> Self {
        self.set(vehicle, resource_kind, compatibility);
        self
    }

    pub fn get(&self, vehicle: &str, resource_kind: &str) -> Compatibility {
        self.entries
            .get(vehicle)
            .and_then(|kinds| kinds.get(resource_kind))
            .copied()
            .unwrap_or_default()
    }

    /// True when no required kind is explicitly unsupported. Empty kinds impose nothing.
    pub fn supports_all<S: AsRef<str>>(&self, vehicle: &str, kinds: &[S]) -> bool {
        kinds
            .iter()
            .map(AsRef::as_ref)
            .filter(|kind| !kind.is_empty())
            .all(|kind| self.get(vehicle, kind).permits())
    }
}

/// Narrow `fleet` to vehicles that carry every required kind and hold `total_demand_kg`.
///
/// Returns candidates in catalog order. An empty result with a multi-kind
/// requirement may mean a multi-vehicle split is needed; that allocation is
/// left to the caller.
pub fn filter_candidates<'a, S: AsRef<str>>(
    fleet: &'a [VehicleType],
    required_kinds: &[S],
    total_demand_kg: f64,
    compatibility: &CompatibilityTable,
) -> Result<Vec<&'a VehicleType>, InputError> {
    if !total_demand_kg.is_finite() || total_demand_kg < 0.0 {
        return Err(InputError::NonFiniteValue {
            field: "total_demand_kg".to_string(),
        });
    }

    let mut candidates = Vec::new();
    for vehicle in fleet {
        vehicle.validate()?;
        let compatible = compatibility.supports_all(&vehicle.name, required_kinds);
        let fits = vehicle.capacity_kg >= total_demand_kg;
        debug!(vehicle = %vehicle.name, compatible, fits, "vehicle candidate check");
        if compatible && fits {
            candidates.push(vehicle);
        }
    }
    Ok(candidates)
}
