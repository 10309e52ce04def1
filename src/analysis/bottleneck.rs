//! Identification of the materials and land which limit a plan, and of technologies whose
//! construction is delayed.
use super::Severity;
use crate::configuration::ConstraintConfiguration;
use crate::material::MaterialID;
use crate::technology::TechnologyID;
use crate::variables::{DecisionVariables, PlanKey};
use crate::zone::ZoneID;
use std::fmt;

/// Materials used above this fraction of their availability are constrained
const MATERIAL_THRESHOLD: f64 = 0.90;

/// Land used above this fraction of its allocation is constrained
const LAND_THRESHOLD: f64 = 0.95;

/// A resource which can limit a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// Supply of a material
    Material(MaterialID),
    /// Land for a technology in a zone
    Land {
        /// The zone
        zone: ZoneID,
        /// The technology using the land
        technology: TechnologyID,
    },
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Material(id) => write!(f, "material {id}"),
            Self::Land { zone, technology } => {
                write!(f, "land for {technology} in zone {zone}")
            }
        }
    }
}

/// Peak utilisation of a resource over the planning horizon
#[derive(Debug, Clone, PartialEq)]
pub struct BottleneckRecord {
    /// The resource
    pub resource: Resource,
    /// Highest fraction of the resource used in any year
    pub utilisation: f64,
    /// The calendar year in which utilisation peaks
    pub peak_year: u32,
    /// How close the resource came to being exhausted
    pub severity: Severity,
    /// Whether the resource constrains the plan
    pub constrained: bool,
}

impl BottleneckRecord {
    fn new(resource: Resource, utilisation: f64, peak_year: u32, threshold: f64) -> Self {
        Self {
            resource,
            utilisation,
            peak_year,
            severity: Severity::from_utilisation(utilisation),
            constrained: utilisation > threshold,
        }
    }
}

impl fmt::Display for BottleneckRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is {:.1}% used in {} ({})",
            self.resource,
            self.utilisation * 100.0,
            self.peak_year,
            self.severity
        )
    }
}

/// The difference between when a technology was needed in a zone and when it was first built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechnologyDelay {
    /// The technology
    pub technology: TechnologyID,
    /// The zone
    pub zone: ZoneID,
    /// The first year in which demand triggered new capacity
    pub planned_year: u32,
    /// The first year in which the technology was built, if at all
    pub actual_year: Option<u32>,
}

impl TechnologyDelay {
    /// Number of years between the trigger and the first build, if the technology was built
    pub fn delay(&self) -> Option<u32> {
        self.actual_year.map(|actual| actual.saturating_sub(self.planned_year))
    }

    /// Whether the technology was built late or not at all
    pub fn is_delayed(&self) -> bool {
        self.delay().is_none_or(|delay| delay > 0)
    }
}

impl fmt::Display for TechnologyDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.actual_year {
            Some(actual) => write!(
                f,
                "{} in zone {} needed from {} but first built in {actual}",
                self.technology, self.zone, self.planned_year
            ),
            None => write!(
                f,
                "{} in zone {} needed from {} but never built",
                self.technology, self.zone, self.planned_year
            ),
        }
    }
}

/// The constraining resources and delays in a plan
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BottleneckReport {
    /// One record per material
    pub material_bottlenecks: Vec<BottleneckRecord>,
    /// One record per (zone, technology) pair
    pub spatial_constraints: Vec<BottleneckRecord>,
    /// One entry per (technology, zone) pair in which demand triggered new capacity
    pub technology_delays: Vec<TechnologyDelay>,
}

impl BottleneckReport {
    /// All records for resources which constrain the plan
    pub fn constrained(&self) -> impl Iterator<Item = &BottleneckRecord> {
        self.material_bottlenecks
            .iter()
            .chain(&self.spatial_constraints)
            .filter(|record| record.constrained)
    }
}

/// Fraction of a resource used, treating any use of an absent resource as infinite
fn ratio(used: f64, available: f64) -> f64 {
    if used <= 0.0 {
        0.0
    } else if available <= 0.0 {
        f64::INFINITY
    } else {
        used / available
    }
}

/// The largest value and its year index, with ties going to the earliest year
fn peak(values: impl Iterator<Item = f64>) -> (f64, usize) {
    values
        .enumerate()
        .fold((0.0, 0), |(best, best_year), (year, value)| {
            if value > best {
                (value, year)
            } else {
                (best, best_year)
            }
        })
}

fn material_bottlenecks(
    variables: &DecisionVariables,
    config: &ConstraintConfiguration,
) -> Vec<BottleneckRecord> {
    config
        .materials
        .values()
        .enumerate()
        .map(|(m, material)| {
            let (utilisation, year) = peak(config.horizon.indices().map(|year| {
                let available = material.available(variables.stock(m, year));
                ratio(variables.utilisation(m, year).value(), available.value())
            }));
            BottleneckRecord::new(
                Resource::Material(material.id.clone()),
                utilisation,
                config.horizon.year(year),
                MATERIAL_THRESHOLD,
            )
        })
        .collect()
}

fn spatial_constraints(
    variables: &DecisionVariables,
    config: &ConstraintConfiguration,
) -> Vec<BottleneckRecord> {
    let mut records = Vec::new();
    for (z, zone) in config.zones.values().enumerate() {
        for (t, technology) in config.technologies.values().enumerate() {
            let (utilisation, year) = peak(config.horizon.indices().map(|year| {
                let key = PlanKey::new(t, z, year);
                let required = variables.operational(key) / technology.capacity_density;
                ratio(required.value(), variables.land(key).value())
            }));
            records.push(BottleneckRecord::new(
                Resource::Land {
                    zone: zone.id.clone(),
                    technology: technology.id.clone(),
                },
                utilisation,
                config.horizon.year(year),
                LAND_THRESHOLD,
            ));
        }
    }

    records
}

fn technology_delays(
    variables: &DecisionVariables,
    config: &ConstraintConfiguration,
) -> Vec<TechnologyDelay> {
    let trigger = config.parameters.demand_trigger;
    let mut delays = Vec::new();
    for (z, zone) in config.zones.values().enumerate() {
        let Some(planned) = config
            .horizon
            .indices()
            .find(|year| zone.projected_demand(*year) > zone.peak_load * trigger)
        else {
            continue;
        };

        for (t, technology) in config.technologies.values().enumerate() {
            let actual = config
                .horizon
                .indices()
                .find(|year| variables.is_built(PlanKey::new(t, z, *year)));
            delays.push(TechnologyDelay {
                technology: technology.id.clone(),
                zone: zone.id.clone(),
                planned_year: config.horizon.year(planned),
                actual_year: actual.map(|year| config.horizon.year(year)),
            });
        }
    }

    delays
}

/// Find the resources which constrain a plan and the technologies built late
pub fn analyse_bottlenecks(
    variables: &DecisionVariables,
    config: &ConstraintConfiguration,
) -> BottleneckReport {
    BottleneckReport {
        material_bottlenecks: material_bottlenecks(variables, config),
        spatial_constraints: spatial_constraints(variables, config),
        technology_delays: technology_delays(variables, config),
    }
}

/// Whether a delayed technology depends on the given resource
fn depends_on(
    delay: &TechnologyDelay,
    resource: &Resource,
    config: &ConstraintConfiguration,
) -> bool {
    match resource {
        Resource::Material(material) => config
            .technologies
            .get(&delay.technology)
            .is_some_and(|technology| technology.uses_material(material, &config.components)),
        Resource::Land { zone, technology } => {
            *zone == delay.zone && *technology == delay.technology
        }
    }
}

/// Describe the chain of constraints which hold the plan back.
///
/// Constrained resources come first, most severe first, each followed by the delayed
/// technologies which depend on it. Any other delays come last.
pub fn critical_path(report: &BottleneckReport, config: &ConstraintConfiguration) -> Vec<String> {
    let mut constrained: Vec<_> = report.constrained().collect();
    constrained.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.utilisation.total_cmp(&a.utilisation))
    });

    let delayed: Vec<_> = report
        .technology_delays
        .iter()
        .filter(|delay| delay.is_delayed())
        .collect();
    let mut explained = vec![false; delayed.len()];

    let mut path = Vec::new();
    for record in constrained {
        path.push(record.to_string());
        for (delay, explained) in delayed.iter().zip(explained.iter_mut()) {
            if depends_on(delay, &record.resource, config) {
                path.push(format!("  {delay}"));
                *explained = true;
            }
        }
    }

    path.extend(
        delayed
            .iter()
            .zip(&explained)
            .filter(|(_, explained)| !**explained)
            .map(|(delay, _)| delay.to_string()),
    );

    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{configuration, supply_chain_configuration};
    use crate::units::{Area, Capacity, Mass};
    use rstest::rstest;

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(0.0, 0.0), 0.0);
        assert_eq!(ratio(1.0, 0.0), f64::INFINITY);
        assert_eq!(ratio(1.0, 4.0), 0.25);
    }

    #[test]
    fn test_peak_prefers_earliest_year() {
        assert_eq!(peak([0.1, 0.5, 0.5, 0.2].into_iter()), (0.5, 1));
        assert_eq!(peak(std::iter::empty()), (0.0, 0));
    }

    #[rstest]
    fn test_material_bottleneck(mut supply_chain_configuration: ConstraintConfiguration) {
        // Only the initial stock is available, and building solar uses almost all of it
        let config = &mut supply_chain_configuration;
        let silicon = &mut config.materials["silicon"];
        silicon.primary_supply = Mass(0.0);
        silicon.stock = Mass(130.0);

        let mut vars = DecisionVariables::new(config);
        vars.set_investment(PlanKey::new(1, 0, 3), Capacity(100.0));
        vars.refresh(config);

        let report = analyse_bottlenecks(&vars, config);
        let silicon = &report.material_bottlenecks[0];
        assert_eq!(silicon.resource, Resource::Material("silicon".into()));
        assert!((silicon.utilisation - 125.0 / 130.0).abs() < 1e-9);
        assert_eq!(silicon.peak_year, 2028);
        assert_eq!(silicon.severity, Severity::Critical);
        assert!(silicon.constrained);

        let lithium = &report.material_bottlenecks[1];
        assert_eq!(lithium.utilisation, 0.0);
        assert_eq!(lithium.severity, Severity::Low);
        assert!(!lithium.constrained);
    }

    #[rstest]
    fn test_spatial_constraint(mut configuration: ConstraintConfiguration) {
        // The existing gas fleet needs 20 km²
        configuration.zones["north"].available_land = Area(20.5);
        let vars = DecisionVariables::new(&configuration);

        let report = analyse_bottlenecks(&vars, &configuration);
        assert_eq!(report.spatial_constraints.len(), 1);
        let record = &report.spatial_constraints[0];
        assert!((record.utilisation - 20.0 / 20.5).abs() < 1e-9);
        assert_eq!(record.peak_year, 2025);
        assert_eq!(record.severity, Severity::Critical);
        assert!(record.constrained);
    }

    #[rstest]
    fn test_land_threshold_is_stricter(mut configuration: ConstraintConfiguration) {
        // 20 / 21.5 ≈ 0.93: high severity but not constrained
        configuration.zones["north"].available_land = Area(21.5);
        let vars = DecisionVariables::new(&configuration);

        let record = &analyse_bottlenecks(&vars, &configuration).spatial_constraints[0];
        assert_eq!(record.severity, Severity::High);
        assert!(!record.constrained);
    }

    #[rstest]
    fn test_technology_delays(supply_chain_configuration: ConstraintConfiguration) {
        let config = &supply_chain_configuration;
        let mut vars = DecisionVariables::new(config);
        vars.set_investment(PlanKey::new(0, 0, 2), Capacity(10.0));
        vars.set_investment(PlanKey::new(1, 0, 3), Capacity(10.0));
        vars.refresh(config);

        let report = analyse_bottlenecks(&vars, config);
        assert_eq!(
            report.technology_delays,
            [
                TechnologyDelay {
                    technology: "gas_ccgt".into(),
                    zone: "north".into(),
                    planned_year: 2027,
                    actual_year: Some(2027),
                },
                TechnologyDelay {
                    technology: "solar_pv".into(),
                    zone: "north".into(),
                    planned_year: 2027,
                    actual_year: Some(2028),
                },
            ]
        );
        assert_eq!(report.technology_delays[0].delay(), Some(0));
        assert!(!report.technology_delays[0].is_delayed());
        assert_eq!(report.technology_delays[1].delay(), Some(1));
    }

    #[rstest]
    fn test_no_delays_without_demand_trigger(mut configuration: ConstraintConfiguration) {
        configuration.zones["north"].demand_growth = crate::units::Dimensionless(0.0);
        let vars = DecisionVariables::new(&configuration);
        assert!(
            analyse_bottlenecks(&vars, &configuration)
                .technology_delays
                .is_empty()
        );
    }

    #[rstest]
    fn test_critical_path(mut supply_chain_configuration: ConstraintConfiguration) {
        let config = &mut supply_chain_configuration;
        config.materials["silicon"].primary_supply = Mass(0.0);
        config.materials["silicon"].stock = Mass(130.0);

        let mut vars = DecisionVariables::new(config);
        vars.set_investment(PlanKey::new(1, 0, 3), Capacity(100.0));
        vars.refresh(config);

        let report = analyse_bottlenecks(&vars, config);
        let path = critical_path(&report, config);
        assert_eq!(
            path,
            [
                "material silicon is 96.2% used in 2028 (critical)",
                "  solar_pv in zone north needed from 2027 but first built in 2028",
                "gas_ccgt in zone north needed from 2027 but never built",
            ]
        );
    }
}
