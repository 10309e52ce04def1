//! Scenarios are named variations of a configuration (e.g. a supply shock or faster demand
//! growth). Each scenario is applied as an overlay on a private copy of the base configuration.
use crate::configuration::ConstraintConfiguration;
use crate::id::{define_id_getter, define_id_type};
use crate::material::MaterialID;
use crate::units::Dimensionless;
use indexmap::IndexMap;

define_id_type! {ScenarioID}

/// A map of [`Scenario`]s, keyed by scenario ID
pub type ScenarioMap = IndexMap<ScenarioID, Scenario>;

/// A set of scale factors applied on top of the base configuration
#[derive(PartialEq, Debug, Clone)]
pub struct Scenario {
    /// A unique identifier for the scenario (e.g. "lithium_shock")
    pub id: ScenarioID,
    /// A text description of the scenario
    pub description: String,
    /// Scale factor for the primary supply of every material
    pub supply_scale: Dimensionless,
    /// Additional scale factors for the primary supply of individual materials
    pub material_supply: IndexMap<MaterialID, Dimensionless>,
    /// Scale factor for the peak load of every zone
    pub demand_scale: Dimensionless,
    /// Scale factor for the available land of every zone
    pub land_scale: Dimensionless,
    /// Scale factor for the capital cost of every technology
    pub capital_cost_scale: Dimensionless,
}
define_id_getter! {Scenario, ScenarioID}

impl Scenario {
    /// A scenario which leaves the configuration unchanged
    pub fn identity(id: &str) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            supply_scale: Dimensionless(1.0),
            material_supply: IndexMap::new(),
            demand_scale: Dimensionless(1.0),
            land_scale: Dimensionless(1.0),
            capital_cost_scale: Dimensionless(1.0),
        }
    }

    /// Create a copy of `config` with this scenario's scale factors applied
    pub fn apply(&self, config: &ConstraintConfiguration) -> ConstraintConfiguration {
        let mut config = config.clone();

        for material in config.materials.values_mut() {
            let extra = self
                .material_supply
                .get(&material.id)
                .copied()
                .unwrap_or(Dimensionless(1.0));
            material.primary_supply = material.primary_supply * self.supply_scale * extra;
        }

        for zone in config.zones.values_mut() {
            zone.peak_load = zone.peak_load * self.demand_scale;
            zone.available_land = zone.available_land * self.land_scale;
        }

        for technology in config.technologies.values_mut() {
            technology.capital_cost = technology.capital_cost * self.capital_cost_scale;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::supply_chain_configuration;
    use crate::units::{Area, Capacity, Mass, MoneyPerCapacity};
    use rstest::rstest;

    #[rstest]
    fn test_identity_leaves_config_unchanged(supply_chain_configuration: ConstraintConfiguration) {
        let scenario = Scenario::identity("base");
        assert_eq!(
            scenario.apply(&supply_chain_configuration),
            supply_chain_configuration
        );
    }

    #[rstest]
    fn test_apply(supply_chain_configuration: ConstraintConfiguration) {
        let scenario = Scenario {
            supply_scale: Dimensionless(0.5),
            material_supply: [("silicon".into(), Dimensionless(0.5))]
                .into_iter()
                .collect(),
            demand_scale: Dimensionless(2.0),
            land_scale: Dimensionless(0.1),
            capital_cost_scale: Dimensionless(1.5),
            ..Scenario::identity("shock")
        };
        let config = scenario.apply(&supply_chain_configuration);

        let base_silicon = &supply_chain_configuration.materials["silicon"];
        assert_eq!(
            config.materials["silicon"].primary_supply,
            base_silicon.primary_supply * Dimensionless(0.25)
        );
        assert_eq!(
            config.materials["lithium"].primary_supply,
            supply_chain_configuration.materials["lithium"].primary_supply * Dimensionless(0.5)
        );
        // Stock is not a supply rate, so is left alone
        assert_eq!(config.materials["silicon"].stock, base_silicon.stock);
        assert_eq!(config.materials["silicon"].stock, Mass(0.0));

        let zone = &config.zones["north"];
        assert_eq!(zone.peak_load, Capacity(2000.0));
        assert_eq!(zone.available_land, Area(1000.0));
        assert_eq!(
            config.technologies["gas_ccgt"].capital_cost,
            MoneyPerCapacity(1_500_000.0)
        );
    }
}
