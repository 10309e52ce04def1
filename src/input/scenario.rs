//! Code for reading in scenarios from CSV files.
use super::*;
use crate::id::IDCollection;
use crate::material::MaterialMap;
use crate::scenario::{Scenario, ScenarioMap};
use crate::units::Dimensionless;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const SCENARIOS_FILE_NAME: &str = "scenarios.csv";
const SCENARIO_SUPPLY_FILE_NAME: &str = "scenario_supply.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct ScenarioRaw {
    id: String,
    description: String,
    supply_scale: Dimensionless,
    demand_scale: Dimensionless,
    land_scale: Dimensionless,
    capital_cost_scale: Dimensionless,
}

/// A scale factor for the supply of a single material under a scenario
#[derive(PartialEq, Debug, Deserialize)]
struct ScenarioSupplyRaw {
    scenario_id: String,
    material_id: String,
    scale: Dimensionless,
}

/// Read scenarios from the specified model directory.
///
/// Scenarios are optional, so the files may be absent.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `materials` - The model's materials
pub fn read_scenarios(model_dir: &Path, materials: &MaterialMap) -> Result<ScenarioMap> {
    let file_path = model_dir.join(SCENARIOS_FILE_NAME);
    let scenarios_csv = read_csv_optional(&file_path)?;
    let mut scenarios =
        read_scenarios_from_iter(scenarios_csv).with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(SCENARIO_SUPPLY_FILE_NAME);
    let supply_csv = read_csv_optional(&file_path)?;
    read_scenario_supply_from_iter(supply_csv, &mut scenarios, materials)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(scenarios)
}

fn read_scenarios_from_iter<I>(iter: I) -> Result<ScenarioMap>
where
    I: Iterator<Item = ScenarioRaw>,
{
    let mut scenarios = ScenarioMap::new();
    for raw in iter {
        let scenario = Scenario {
            id: raw.id.into(),
            description: raw.description,
            supply_scale: raw.supply_scale,
            material_supply: IndexMap::new(),
            demand_scale: raw.demand_scale,
            land_scale: raw.land_scale,
            capital_cost_scale: raw.capital_cost_scale,
        };
        let id = scenario.id.clone();
        ensure!(
            scenarios.insert(id.clone(), scenario).is_none(),
            "Duplicate scenario ID {id}"
        );
    }

    Ok(scenarios)
}

fn read_scenario_supply_from_iter<I>(
    iter: I,
    scenarios: &mut ScenarioMap,
    materials: &MaterialMap,
) -> Result<()>
where
    I: Iterator<Item = ScenarioSupplyRaw>,
{
    for raw in iter {
        let scenario = scenarios
            .get_mut(raw.scenario_id.as_str())
            .with_context(|| format!("Unknown scenario ID {}", raw.scenario_id))?;
        let material_id = materials.get_id_by_str(&raw.material_id)?;
        ensure!(
            scenario
                .material_supply
                .insert(material_id.clone(), raw.scale)
                .is_none(),
            "Duplicate supply scale for {material_id} in scenario {}",
            scenario.id
        );
    }

    Ok(())
}
