//! Feasibility checks for a plan.
//!
//! Checks never fail: they return a [`ValidationReport`] listing every violated constraint along
//! with how badly it is violated.
use crate::component::ComponentID;
use crate::configuration::ConstraintConfiguration;
use crate::material::MaterialID;
use crate::technology::TechnologyID;
use crate::units::{Area, Capacity, ComponentCount, Mass};
use crate::variables::{DecisionVariables, PlanKey};
use crate::zone::ZoneID;
use std::fmt;

/// Amount by which a constraint may be exceeded before it counts as violated
const TOLERANCE: f64 = 1e-6;

/// A violated constraint
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// More material used in a year than is available from supply and stock
    MaterialSupply {
        /// The material
        material: MaterialID,
        /// Index of the year
        year: usize,
        /// Tonnes used beyond what is available
        excess: Mass,
    },
    /// More units of a component needed in a year than can be produced
    ComponentProduction {
        /// The component
        component: ComponentID,
        /// Index of the year
        year: usize,
        /// Units needed beyond production capacity
        excess: ComponentCount,
    },
    /// A technology built before its lead time has elapsed
    LeadTime {
        /// The technology
        technology: TechnologyID,
        /// The zone it is built in
        zone: ZoneID,
        /// Index of the year
        year: usize,
    },
    /// A technology built before one of its components can be delivered
    ComponentLeadTime {
        /// The technology
        technology: TechnologyID,
        /// The zone it is built in
        zone: ZoneID,
        /// Index of the year
        year: usize,
        /// The slowest component
        component: ComponentID,
    },
    /// More of a technology built across all zones in a year than can be manufactured
    ManufacturingCapacity {
        /// The technology
        technology: TechnologyID,
        /// Index of the year
        year: usize,
        /// MW built beyond manufacturing capacity
        excess: Capacity,
    },
    /// Operational capacity needs more land than is allocated to it
    Land {
        /// The technology
        technology: TechnologyID,
        /// The zone
        zone: ZoneID,
        /// Index of the year
        year: usize,
        /// km² needed beyond the allocation
        excess: Area,
    },
    /// More land allocated than the zone has available
    LandAllocation {
        /// The technology
        technology: TechnologyID,
        /// The zone
        zone: ZoneID,
        /// Index of the year
        year: usize,
        /// km² allocated beyond what is available
        excess: Area,
    },
}

impl Violation {
    /// Index of the year in which the violation occurs
    pub fn year(&self) -> usize {
        match self {
            Self::MaterialSupply { year, .. }
            | Self::ComponentProduction { year, .. }
            | Self::LeadTime { year, .. }
            | Self::ComponentLeadTime { year, .. }
            | Self::ManufacturingCapacity { year, .. }
            | Self::Land { year, .. }
            | Self::LandAllocation { year, .. } => *year,
        }
    }

    /// How badly the constraint is violated, in the constraint's own units.
    ///
    /// Lead time violations have no natural magnitude and count as one.
    pub fn magnitude(&self) -> f64 {
        match self {
            Self::MaterialSupply { excess, .. } => excess.value(),
            Self::ComponentProduction { excess, .. } => excess.value(),
            Self::LeadTime { .. } | Self::ComponentLeadTime { .. } => 1.0,
            Self::ManufacturingCapacity { excess, .. } => excess.value(),
            Self::Land { excess, .. } | Self::LandAllocation { excess, .. } => excess.value(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaterialSupply {
                material,
                year,
                excess,
            } => write!(
                f,
                "Demand for material {material} exceeds supply by {} t in year {year}",
                excess.value()
            ),
            Self::ComponentProduction {
                component,
                year,
                excess,
            } => write!(
                f,
                "Demand for component {component} exceeds production capacity by {} units in \
                year {year}",
                excess.value()
            ),
            Self::LeadTime {
                technology,
                zone,
                year,
            } => write!(
                f,
                "Technology {technology} built in zone {zone} in year {year}, before its lead time"
            ),
            Self::ComponentLeadTime {
                technology,
                zone,
                year,
                component,
            } => write!(
                f,
                "Technology {technology} built in zone {zone} in year {year}, before component \
                {component} can be delivered"
            ),
            Self::ManufacturingCapacity {
                technology,
                year,
                excess,
            } => write!(
                f,
                "Build of technology {technology} exceeds manufacturing capacity by {} MW in \
                year {year}",
                excess.value()
            ),
            Self::Land {
                technology,
                zone,
                year,
                excess,
            } => write!(
                f,
                "Technology {technology} in zone {zone} needs {} km² more land than allocated in \
                year {year}",
                excess.value()
            ),
            Self::LandAllocation {
                technology,
                zone,
                year,
                excess,
            } => write!(
                f,
                "Land allocated to technology {technology} in zone {zone} exceeds what is \
                available by {} km² in year {year}",
                excess.value()
            ),
        }
    }
}

/// The result of checking a plan's feasibility
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    /// Whether no constraint is violated
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }

    /// The violated constraints
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consume the report, returning the violated constraints
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Combine two reports. The result is feasible only if both reports are.
    pub fn merge(mut self, other: ValidationReport) -> ValidationReport {
        self.violations.extend(other.violations);
        self
    }

    /// Sum of the magnitudes of every violation
    pub fn total_magnitude(&self) -> f64 {
        self.violations.iter().map(Violation::magnitude).sum()
    }
}

/// Check material supply, component production, lead times and manufacturing capacity
pub fn validate_supply_chain(
    variables: &DecisionVariables,
    config: &ConstraintConfiguration,
) -> ValidationReport {
    let mut violations = Vec::new();
    let years = config.horizon.indices();

    for (m, material) in config.materials.values().enumerate() {
        for year in years.clone() {
            let available = material.available(variables.stock(m, year));
            let excess = variables.utilisation(m, year) - available;
            if excess.value() > TOLERANCE {
                violations.push(Violation::MaterialSupply {
                    material: material.id.clone(),
                    year,
                    excess,
                });
            }
        }
    }

    for (c, component) in config.components.values().enumerate() {
        for year in years.clone() {
            let excess = variables.production(c, year) - component.production_capacity;
            if excess.value() > TOLERANCE {
                violations.push(Violation::ComponentProduction {
                    component: component.id.clone(),
                    year,
                    excess,
                });
            }
        }
    }

    for (t, technology) in config.technologies.values().enumerate() {
        let lead_time = technology.lead_time as usize;
        let slowest_component = technology
            .component_demand
            .keys()
            .filter_map(|id| config.components.get(id))
            .max_by_key(|component| component.lead_time);

        for year in years.clone() {
            for (z, zone) in config.zones.values().enumerate() {
                if !variables.is_built(PlanKey::new(t, z, year)) {
                    continue;
                }

                if year < lead_time {
                    violations.push(Violation::LeadTime {
                        technology: technology.id.clone(),
                        zone: zone.id.clone(),
                        year,
                    });
                } else if let Some(component) = slowest_component
                    && year < component.lead_time as usize
                {
                    violations.push(Violation::ComponentLeadTime {
                        technology: technology.id.clone(),
                        zone: zone.id.clone(),
                        year,
                        component: component.id.clone(),
                    });
                }
            }

            let built: Capacity = (0..config.zones.len())
                .map(|z| variables.investment(PlanKey::new(t, z, year)))
                .sum();
            let excess = built - technology.manufacturing_capacity;
            if excess.value() > TOLERANCE {
                violations.push(Violation::ManufacturingCapacity {
                    technology: technology.id.clone(),
                    year,
                    excess,
                });
            }
        }
    }

    ValidationReport { violations }
}

/// Check that operational capacity fits on its allocated land, and that allocations fit in zones
pub fn validate_spatial(
    variables: &DecisionVariables,
    config: &ConstraintConfiguration,
) -> ValidationReport {
    let mut violations = Vec::new();

    for key in variables.keys() {
        let technology = &config.technologies[key.technology];
        let zone = &config.zones[key.zone];
        let allocated = variables.land(key);

        let required = variables.operational(key) / technology.capacity_density;
        let excess = required - allocated;
        if excess.value() > TOLERANCE {
            violations.push(Violation::Land {
                technology: technology.id.clone(),
                zone: zone.id.clone(),
                year: key.year,
                excess,
            });
        }

        let excess = allocated - zone.available_land;
        if excess.value() > TOLERANCE {
            violations.push(Violation::LandAllocation {
                technology: technology.id.clone(),
                zone: zone.id.clone(),
                year: key.year,
                excess,
            });
        }
    }

    ValidationReport { violations }
}

/// Run every feasibility check
pub fn validate(
    variables: &DecisionVariables,
    config: &ConstraintConfiguration,
) -> ValidationReport {
    validate_supply_chain(variables, config).merge(validate_spatial(variables, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::supply_chain_configuration;
    use crate::units::Dimensionless;
    use rstest::{fixture, rstest};

    const GAS: usize = 0;
    const SOLAR: usize = 1;

    /// 100 MW of solar in year 3 and 50 MW of gas in year 2
    #[fixture]
    fn plan(supply_chain_configuration: ConstraintConfiguration) -> DecisionVariables {
        let mut vars = DecisionVariables::new(&supply_chain_configuration);
        vars.set_investment(PlanKey::new(SOLAR, 0, 3), Capacity(100.0));
        vars.set_investment(PlanKey::new(GAS, 0, 2), Capacity(50.0));
        vars.refresh(&supply_chain_configuration);
        vars
    }

    #[rstest]
    fn test_feasible(supply_chain_configuration: ConstraintConfiguration, plan: DecisionVariables) {
        let report = validate(&plan, &supply_chain_configuration);
        assert!(report.is_feasible());
        assert_eq!(report.total_magnitude(), 0.0);
    }

    #[rstest]
    fn test_material_supply(
        mut supply_chain_configuration: ConstraintConfiguration,
        mut plan: DecisionVariables,
    ) {
        let config = &mut supply_chain_configuration;
        config.materials["silicon"].primary_supply = Mass(10.0);
        plan.refresh(config);

        // 125 t needed with 30 t in stock plus 10 t of supply
        let report = validate_supply_chain(&plan, config);
        assert_eq!(
            report.violations(),
            [Violation::MaterialSupply {
                material: "silicon".into(),
                year: 3,
                excess: Mass(85.0),
            }]
        );
        assert!(!report.is_feasible());
        assert_eq!(report.total_magnitude(), 85.0);
    }

    #[rstest]
    fn test_component_production(
        mut supply_chain_configuration: ConstraintConfiguration,
        plan: DecisionVariables,
    ) {
        let config = &mut supply_chain_configuration;
        config.components["pv_module"].production_capacity = ComponentCount(150.0);

        let report = validate_supply_chain(&plan, config);
        assert_eq!(
            report.violations(),
            [Violation::ComponentProduction {
                component: "pv_module".into(),
                year: 3,
                excess: ComponentCount(50.0),
            }]
        );
    }

    #[rstest]
    fn test_lead_time(supply_chain_configuration: ConstraintConfiguration) {
        let config = &supply_chain_configuration;
        let mut vars = DecisionVariables::new(config);
        vars.set_investment(PlanKey::new(GAS, 0, 1), Capacity(10.0));
        vars.set_investment(PlanKey::new(SOLAR, 0, 2), Capacity(10.0));
        vars.refresh(config);

        let report = validate_supply_chain(&vars, config);
        assert_eq!(
            report.violations(),
            [
                Violation::LeadTime {
                    technology: "gas_ccgt".into(),
                    zone: "north".into(),
                    year: 1,
                },
                Violation::ComponentLeadTime {
                    technology: "solar_pv".into(),
                    zone: "north".into(),
                    year: 2,
                    component: "pv_module".into(),
                }
            ]
        );
    }

    #[rstest]
    fn test_manufacturing_capacity(
        mut supply_chain_configuration: ConstraintConfiguration,
        plan: DecisionVariables,
    ) {
        let config = &mut supply_chain_configuration;
        config.technologies["gas_ccgt"].manufacturing_capacity = Capacity(20.0);

        let report = validate_supply_chain(&plan, config);
        assert_eq!(
            report.violations(),
            [Violation::ManufacturingCapacity {
                technology: "gas_ccgt".into(),
                year: 2,
                excess: Capacity(30.0),
            }]
        );
    }

    #[rstest]
    fn test_land(supply_chain_configuration: ConstraintConfiguration, mut plan: DecisionVariables) {
        // Existing 2000 MW of gas needs 20 km²
        let key = PlanKey::new(GAS, 0, 0);
        plan.set_land(key, Area(15.0));
        let report = validate_spatial(&plan, &supply_chain_configuration);
        assert_eq!(
            report.violations(),
            [Violation::Land {
                technology: "gas_ccgt".into(),
                zone: "north".into(),
                year: 0,
                excess: Area(5.0),
            }]
        );

        plan.set_land(key, Area(12_000.0));
        let report = validate_spatial(&plan, &supply_chain_configuration);
        assert_eq!(
            report.violations(),
            [Violation::LandAllocation {
                technology: "gas_ccgt".into(),
                zone: "north".into(),
                year: 0,
                excess: Area(2000.0),
            }]
        );
    }

    #[rstest]
    fn test_merge(
        mut supply_chain_configuration: ConstraintConfiguration,
        mut plan: DecisionVariables,
    ) {
        let config = &mut supply_chain_configuration;
        config.technologies["gas_ccgt"].manufacturing_capacity = Capacity(20.0);
        plan.set_land(PlanKey::new(GAS, 0, 0), Area(15.0));

        let supply_chain = validate_supply_chain(&plan, config);
        let spatial = validate_spatial(&plan, config);
        assert!(!supply_chain.is_feasible());
        assert!(!spatial.is_feasible());

        let merged = supply_chain.merge(spatial);
        assert_eq!(merged.violations().len(), 2);
        assert!(!merged.is_feasible());
        assert!(
            ValidationReport::default()
                .merge(ValidationReport::default())
                .is_feasible()
        );
    }

    #[rstest]
    fn test_more_supply_and_land_stays_feasible(
        supply_chain_configuration: ConstraintConfiguration,
        plan: DecisionVariables,
    ) {
        assert!(validate(&plan, &supply_chain_configuration).is_feasible());

        let mut relaxed = supply_chain_configuration.clone();
        for material in relaxed.materials.values_mut() {
            material.primary_supply = material.primary_supply * Dimensionless(2.0);
        }
        for zone in relaxed.zones.values_mut() {
            zone.available_land = zone.available_land * Dimensionless(2.0);
        }
        let mut plan = plan;
        plan.refresh(&relaxed);
        assert!(validate(&plan, &relaxed).is_feasible());
    }

    #[test]
    fn test_display() {
        let violation = Violation::ManufacturingCapacity {
            technology: "solar_pv".into(),
            year: 3,
            excess: Capacity(12.5),
        };
        assert_eq!(
            violation.to_string(),
            "Build of technology solar_pv exceeds manufacturing capacity by 12.5 MW in year 3"
        );
        assert_eq!(violation.magnitude(), 12.5);
        assert_eq!(violation.year(), 3);
    }
}
