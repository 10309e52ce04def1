//! Generation of an initial plan.
//!
//! New capacity is proposed wherever projected demand outgrows the current peak load, then the
//! plan is repeatedly validated and the investments behind any violated constraint are shrunk
//! until the plan is feasible or the iteration cap is reached.
use crate::configuration::ConstraintConfiguration;
use crate::metaheuristic::CancellationToken;
use crate::technology::TechnologyID;
use crate::units::{Capacity, Dimensionless};
use crate::validation::{Violation, validate};
use crate::variables::{DecisionVariables, PlanKey};
use crate::zone::ZoneID;
use indexmap::IndexSet;
use log::{debug, trace};

/// An initial plan
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The plan
    pub variables: DecisionVariables,
    /// Whether the plan satisfies every constraint
    pub feasible: bool,
    /// Number of validation rounds performed
    pub iterations: u32,
    /// Constraints still violated when generation stopped
    pub violations: Vec<Violation>,
}

/// Propose new capacity for every zone and year in which demand has outgrown the peak load.
///
/// A fraction of the incremental demand is built, capped at the maximum step size and split
/// equally between the technologies which can be built that year.
pub fn propose_investments(variables: &mut DecisionVariables, config: &ConstraintConfiguration) {
    let params = &config.parameters;
    let earliest: Vec<usize> = config
        .technologies
        .values()
        .map(|technology| technology.earliest_build_index(&config.components))
        .collect();

    for (z, zone) in config.zones.values().enumerate() {
        for year in config.horizon.indices() {
            let demand = zone.projected_demand(year);
            if demand <= zone.peak_load * params.demand_trigger {
                continue;
            }

            let eligible: Vec<usize> = earliest
                .iter()
                .enumerate()
                .filter(|(_, earliest)| year >= **earliest)
                .map(|(t, _)| t)
                .collect();
            if eligible.is_empty() {
                trace!(
                    "No technology can be built in zone {} in year {}",
                    zone.id,
                    config.horizon.year(year)
                );
                continue;
            }

            let total = (demand - zone.peak_load) * params.investment_fraction;
            let total = total.min(params.max_investment_step);
            let each = total / Dimensionless(eligible.len() as f64);
            for t in eligible {
                variables.set_investment(PlanKey::new(t, z, year), each);
            }
        }
    }
}

/// The investments which contribute to a violated constraint
fn offending_keys(
    violation: &Violation,
    variables: &DecisionVariables,
    config: &ConstraintConfiguration,
) -> Vec<PlanKey> {
    let index_of_technology = |id: &TechnologyID| config.technologies.get_index_of(id);
    let index_of_zone = |id: &ZoneID| config.zones.get_index_of(id);

    match violation {
        Violation::MaterialSupply { material, year, .. } => variables
            .investments()
            .filter(|(key, _)| {
                key.year == *year
                    && config.technologies[key.technology]
                        .uses_material(material, &config.components)
            })
            .map(|(key, _)| key)
            .collect(),
        Violation::ComponentProduction {
            component, year, ..
        } => variables
            .investments()
            .filter(|(key, _)| {
                key.year == *year
                    && config.technologies[key.technology]
                        .component_demand
                        .contains_key(component)
            })
            .map(|(key, _)| key)
            .collect(),
        Violation::ManufacturingCapacity {
            technology, year, ..
        } => {
            let Some(t) = index_of_technology(technology) else {
                return Vec::new();
            };
            variables
                .investments()
                .filter(|(key, _)| key.technology == t && key.year == *year)
                .map(|(key, _)| key)
                .collect()
        }
        Violation::Land {
            technology,
            zone,
            year,
            ..
        } => {
            let (Some(t), Some(z)) = (index_of_technology(technology), index_of_zone(zone)) else {
                return Vec::new();
            };
            let lifetime = config.technologies[t].lifetime as usize;
            variables
                .investments()
                .filter(|(key, _)| {
                    key.technology == t
                        && key.zone == z
                        && key.year <= *year
                        && key.year + lifetime > *year
                })
                .map(|(key, _)| key)
                .collect()
        }
        // Handled separately: shrinking an investment never satisfies these
        Violation::LeadTime { .. }
        | Violation::ComponentLeadTime { .. }
        | Violation::LandAllocation { .. } => Vec::new(),
    }
}

/// Adjust the plan to address the given violations
fn repair(
    variables: &mut DecisionVariables,
    config: &ConstraintConfiguration,
    violations: &[Violation],
) {
    let mut to_shrink = IndexSet::new();
    for violation in violations {
        match violation {
            Violation::LeadTime {
                technology,
                zone,
                year,
            }
            | Violation::ComponentLeadTime {
                technology,
                zone,
                year,
                ..
            } => {
                if let (Some(t), Some(z)) = (
                    config.technologies.get_index_of(technology),
                    config.zones.get_index_of(zone),
                ) {
                    variables.set_investment(PlanKey::new(t, z, *year), Capacity(0.0));
                }
            }
            Violation::LandAllocation {
                technology,
                zone,
                year,
                ..
            } => {
                if let (Some(t), Some(z)) = (
                    config.technologies.get_index_of(technology),
                    config.zones.get_index_of(zone),
                ) {
                    variables.set_land(PlanKey::new(t, z, *year), config.zones[z].available_land);
                }
            }
            _ => to_shrink.extend(offending_keys(violation, variables, config)),
        }
    }

    for key in to_shrink {
        variables.scale_investment(key, config.parameters.mutation_factor);
    }
}

/// Generate an initial plan for the given configuration.
///
/// Failing to find a feasible plan within the iteration cap is not an error: the last plan tried
/// is returned along with the constraints it violates.
pub fn generate_candidate(
    config: &ConstraintConfiguration,
    cancellation: &CancellationToken,
) -> Candidate {
    let max_iterations = config.parameters.candidate_max_iterations;
    let mut variables = DecisionVariables::new(config);
    propose_investments(&mut variables, config);

    let mut iterations = 0;
    loop {
        iterations += 1;
        variables.refresh(config);
        let report = validate(&variables, config);
        if report.is_feasible() {
            debug!("Found feasible initial plan after {iterations} iteration(s)");
            return Candidate {
                variables,
                feasible: true,
                iterations,
                violations: Vec::new(),
            };
        }

        if iterations >= max_iterations || cancellation.is_cancelled() {
            debug!(
                "No feasible initial plan after {iterations} iteration(s): {} constraint(s) \
                violated",
                report.violations().len()
            );
            return Candidate {
                variables,
                feasible: false,
                iterations,
                violations: report.into_violations(),
            };
        }

        trace!(
            "Initial plan violates {} constraint(s); repairing",
            report.violations().len()
        );
        repair(&mut variables, config, report.violations());
    }
}
