//! Materials are the raw inputs (lithium, copper, neodymium, etc.) from which components and
//! technologies are made.
use crate::id::{define_id_getter, define_id_type};
use crate::units::{Dimensionless, Mass, MoneyPerMass};
use indexmap::IndexMap;
use serde_string_enum::DeserializeLabeledStringEnum;

define_id_type! {MaterialID}

/// A map of [`Material`]s, keyed by material ID
pub type MaterialMap = IndexMap<MaterialID, Material>;

/// Represents a material supply chain
#[derive(PartialEq, Debug, Clone)]
pub struct Material {
    /// A unique identifier for the material (e.g. "lithium")
    pub id: MaterialID,
    /// The category of material
    pub kind: MaterialType,
    /// Tonnes of new material available each year
    pub primary_supply: Mass,
    /// The fraction of material embodied in retiring capacity which is recovered
    pub recovery_rate: Dimensionless,
    /// Tonnes held in stock at the start of the horizon
    pub stock: Mass,
    /// Cost per tonne
    pub cost_per_tonne: MoneyPerMass,
    /// Geopolitical supply risk, from 0 (none) to 1 (severe)
    pub geopolitical_risk: Dimensionless,
    /// Fraction of supply which is sourced domestically
    pub domestic_availability: Dimensionless,
}
define_id_getter! {Material, MaterialID}

impl Material {
    /// Tonnes available in a year given the stock carried into it
    pub fn available(&self, stock: Mass) -> Mass {
        self.primary_supply + stock
    }
}

/// The category of a [`Material`]
#[derive(PartialEq, Eq, Debug, Clone, Copy, DeserializeLabeledStringEnum, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MaterialType {
    /// A material whose supply is critical to the energy transition
    #[string = "critical"]
    Critical,
    /// A widely available bulk material
    #[string = "standard"]
    Standard,
    /// A rare-earth element
    #[string = "rare_earth"]
    RareEarth,
}
