//! Zones represent the geographical areas in which capacity is built and demand must be met.
use crate::id::{define_id_getter, define_id_type};
use crate::technology::TechnologyID;
use crate::units::{Area, Capacity, Dimensionless};
use indexmap::IndexMap;

define_id_type! {ZoneID}

/// A map of [`Zone`]s, keyed by zone ID
pub type ZoneMap = IndexMap<ZoneID, Zone>;

/// Represents a zone with its land, load and existing fleet
#[derive(Debug, PartialEq, Clone)]
pub struct Zone {
    /// A unique identifier for a zone (e.g. "north")
    pub id: ZoneID,
    /// Land available for new generation
    pub available_land: Area,
    /// Current peak load
    pub peak_load: Capacity,
    /// Compound annual growth rate of peak load, as a fraction (e.g. 0.05 for 5%)
    pub demand_growth: Dimensionless,
    /// Capacity already installed, by technology
    pub existing_capacity: IndexMap<TechnologyID, Capacity>,
    /// Capacity which can be imported over transmission links
    pub transmission_capacity: Capacity,
    /// Minimum share of renewable capacity
    pub rps_target: Dimensionless,
}
define_id_getter! {Zone, ZoneID}

impl Zone {
    /// Projected peak demand in the given year of the horizon.
    ///
    /// Year 0 is the start of the horizon, where demand equals the current peak load.
    pub fn projected_demand(&self, year_index: usize) -> Capacity {
        let growth = (Dimensionless(1.0) + self.demand_growth).powf(year_index as f64);
        self.peak_load * growth
    }

    /// Capacity of the given technology already installed in this zone
    pub fn existing_capacity_for(&self, technology_id: &TechnologyID) -> Capacity {
        self.existing_capacity
            .get(technology_id)
            .copied()
            .unwrap_or_default()
    }
}
