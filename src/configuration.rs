//! The configuration describes everything a solve needs: the supply chain, the zones, the planning
//! horizon, system-wide targets and the solver's own parameters.
use crate::component::ComponentMap;
use crate::id::IDCollection;
use crate::material::MaterialMap;
use crate::scenario::ScenarioMap;
use crate::technology::TechnologyMap;
use crate::units::{Area, Capacity, CapacityPerArea, Dimensionless};
use crate::zone::ZoneMap;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::ops::Range;

pub mod parameters;
pub use parameters::{SearchMethod, SolverParameters};

/// The years over which capacity expansion is planned
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct PlanningHorizon {
    /// The first calendar year of the horizon
    pub start_year: u32,
    /// Number of years in the horizon
    pub years: u32,
}

impl PlanningHorizon {
    /// Number of years in the horizon
    pub fn len(&self) -> usize {
        self.years as usize
    }

    /// Whether the horizon contains no years
    pub fn is_empty(&self) -> bool {
        self.years == 0
    }

    /// The indices of every year in the horizon
    pub fn indices(&self) -> Range<usize> {
        0..self.len()
    }

    /// The calendar year for the given year index
    pub fn year(&self, year_index: usize) -> u32 {
        self.start_year + year_index as u32
    }
}

/// A system-wide renewable portfolio standard, which applies from `year` onwards
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
pub struct RpsTarget {
    /// The calendar year from which the target applies
    pub year: u32,
    /// The minimum share of renewable capacity
    pub share: Dimensionless,
}

/// The complete input to a solve
#[derive(Debug, PartialEq, Clone)]
pub struct ConstraintConfiguration {
    /// Materials used by components and technologies
    pub materials: MaterialMap,
    /// Manufactured components
    pub components: ComponentMap,
    /// Technologies which can be built
    pub technologies: TechnologyMap,
    /// Zones in which technologies are built
    pub zones: ZoneMap,
    /// The planning horizon
    pub horizon: PlanningHorizon,
    /// Required margin of firm capacity above peak demand, as a fraction
    pub reserve_margin: Dimensionless,
    /// System-wide renewable targets, sorted by year
    pub rps_targets: Vec<RpsTarget>,
    /// Parameters for the solver
    pub parameters: SolverParameters,
    /// Named scenarios which can be applied to this configuration
    pub scenarios: ScenarioMap,
}

/// Check that a value is a proportion in the range [0, 1]
fn check_proportion(value: Dimensionless) -> bool {
    (0.0..=1.0).contains(&value.value())
}

/// Check that a value is finite and non-negative
fn check_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

impl ConstraintConfiguration {
    /// The RPS target which applies to a zone in the given year.
    ///
    /// This is the larger of the zone's own target and the latest system-wide target in force.
    pub fn rps_target(&self, zone_target: Dimensionless, year_index: usize) -> Dimensionless {
        let year = self.horizon.year(year_index);
        let system_target = self
            .rps_targets
            .iter()
            .rev()
            .find(|target| target.year <= year)
            .map_or(Dimensionless(0.0), |target| target.share);

        if system_target > zone_target {
            system_target
        } else {
            zone_target
        }
    }

    /// Check that the configuration is structurally valid
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.horizon.is_empty(), "Planning horizon cannot be empty");
        ensure!(
            !self.technologies.is_empty(),
            "At least one technology must be defined"
        );
        ensure!(!self.zones.is_empty(), "At least one zone must be defined");
        ensure!(
            check_non_negative(self.reserve_margin.value()),
            "Reserve margin must be a finite number greater than or equal to zero"
        );
        for target in &self.rps_targets {
            ensure!(
                check_proportion(target.share),
                "RPS target for {} must be between 0 and 1",
                target.year
            );
        }
        ensure!(
            self.rps_targets.is_sorted_by_key(|target| target.year),
            "RPS targets must be sorted by year"
        );

        self.validate_materials()?;
        self.validate_components()?;
        self.validate_technologies()?;
        self.validate_zones()?;
        self.validate_scenarios()?;

        self.parameters
            .validate()
            .context("Invalid solver parameters")?;
        for id in &self.parameters.sensitivity_materials {
            self.materials
                .get_id(id)
                .context("Invalid material for sensitivity analysis")?;
        }

        Ok(())
    }

    fn validate_materials(&self) -> Result<()> {
        for material in self.materials.values() {
            let id = &material.id;
            ensure!(
                check_non_negative(material.primary_supply.value())
                    && check_non_negative(material.stock.value()),
                "Supply and stock for material {id} must be non-negative"
            );
            ensure!(
                check_non_negative(material.cost_per_tonne.value()),
                "Cost for material {id} must be non-negative"
            );
            ensure!(
                check_proportion(material.recovery_rate)
                    && check_proportion(material.geopolitical_risk)
                    && check_proportion(material.domestic_availability),
                "Recovery rate, geopolitical risk and domestic availability for material {id} \
                must be between 0 and 1"
            );
        }

        Ok(())
    }

    fn validate_components(&self) -> Result<()> {
        for component in self.components.values() {
            let id = &component.id;
            ensure!(
                check_non_negative(component.production_capacity.value()),
                "Production capacity for component {id} must be non-negative"
            );
            for (material_id, demand) in &component.material_demand {
                self.materials
                    .get_id(material_id)
                    .with_context(|| format!("Invalid material demand for component {id}"))?;
                ensure!(
                    check_non_negative(demand.value()),
                    "Material demand for component {id} must be non-negative"
                );
            }
        }

        Ok(())
    }

    fn validate_technologies(&self) -> Result<()> {
        for technology in self.technologies.values() {
            let id = &technology.id;
            ensure!(
                technology.capacity_density.is_finite()
                    && technology.capacity_density > CapacityPerArea(0.0),
                "Capacity density for technology {id} must be greater than zero"
            );
            ensure!(
                technology.lifetime > 0,
                "Lifetime for technology {id} must be greater than zero"
            );
            ensure!(
                check_non_negative(technology.capital_cost.value())
                    && check_non_negative(technology.variable_cost.value()),
                "Costs for technology {id} must be non-negative"
            );
            ensure!(
                check_proportion(technology.elcc),
                "ELCC for technology {id} must be between 0 and 1"
            );
            ensure!(
                check_non_negative(technology.manufacturing_capacity.value()),
                "Manufacturing capacity for technology {id} must be non-negative"
            );
            for (component_id, demand) in &technology.component_demand {
                self.components
                    .get_id(component_id)
                    .with_context(|| format!("Invalid component demand for technology {id}"))?;
                ensure!(
                    check_non_negative(demand.value()),
                    "Component demand for technology {id} must be non-negative"
                );
            }
            for (material_id, intensity) in &technology.material_intensity {
                self.materials
                    .get_id(material_id)
                    .with_context(|| format!("Invalid material intensity for technology {id}"))?;
                ensure!(
                    check_non_negative(intensity.value()),
                    "Material intensity for technology {id} must be non-negative"
                );
            }
        }

        Ok(())
    }

    fn validate_zones(&self) -> Result<()> {
        for zone in self.zones.values() {
            let id = &zone.id;
            ensure!(
                zone.available_land.is_finite() && zone.available_land >= Area(0.0),
                "Available land for zone {id} must be non-negative"
            );
            ensure!(
                zone.peak_load.is_finite() && zone.peak_load > Capacity(0.0),
                "Peak load for zone {id} must be greater than zero"
            );
            ensure!(
                zone.demand_growth.is_finite() && zone.demand_growth > Dimensionless(-1.0),
                "Demand growth for zone {id} must be greater than -1"
            );
            ensure!(
                check_non_negative(zone.transmission_capacity.value()),
                "Transmission capacity for zone {id} must be non-negative"
            );
            ensure!(
                check_proportion(zone.rps_target),
                "RPS target for zone {id} must be between 0 and 1"
            );
            for (technology_id, capacity) in &zone.existing_capacity {
                self.technologies
                    .get_id(technology_id)
                    .with_context(|| format!("Invalid existing capacity for zone {id}"))?;
                ensure!(
                    check_non_negative(capacity.value()),
                    "Existing capacity for zone {id} must be non-negative"
                );
            }
        }

        Ok(())
    }

    fn validate_scenarios(&self) -> Result<()> {
        for scenario in self.scenarios.values() {
            let id = &scenario.id;
            let scales = [
                scenario.supply_scale,
                scenario.demand_scale,
                scenario.land_scale,
                scenario.capital_cost_scale,
            ];
            ensure!(
                scales.iter().all(|scale| check_non_negative(scale.value())),
                "Scale factors for scenario {id} must be non-negative"
            );
            ensure!(
                scenario.demand_scale > Dimensionless(0.0),
                "Demand scale for scenario {id} must be greater than zero"
            );
            for (material_id, scale) in &scenario.material_supply {
                self.materials
                    .get_id(material_id)
                    .with_context(|| format!("Invalid material supply for scenario {id}"))?;
                ensure!(
                    check_non_negative(scale.value()),
                    "Scale factors for scenario {id} must be non-negative"
                );
            }
        }

        Ok(())
    }
}
