//! Code for reading in materials from a CSV file.
use super::*;
use crate::material::{Material, MaterialMap, MaterialType};
use crate::units::{Dimensionless, Mass, MoneyPerMass};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const MATERIALS_FILE_NAME: &str = "materials.csv";

/// A material as it appears in the CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct MaterialRaw {
    id: String,
    kind: MaterialType,
    primary_supply: Mass,
    recovery_rate: Dimensionless,
    stock: Mass,
    cost_per_tonne: MoneyPerMass,
    geopolitical_risk: Dimensionless,
    domestic_availability: Dimensionless,
}

/// Read materials from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_materials(model_dir: &Path) -> Result<MaterialMap> {
    let file_path = model_dir.join(MATERIALS_FILE_NAME);
    let materials_csv = read_csv(&file_path)?;
    read_materials_from_iter(materials_csv).with_context(|| input_err_msg(&file_path))
}

fn read_materials_from_iter<I>(iter: I) -> Result<MaterialMap>
where
    I: Iterator<Item = MaterialRaw>,
{
    let mut materials = MaterialMap::new();
    for raw in iter {
        let material = Material {
            id: raw.id.into(),
            kind: raw.kind,
            primary_supply: raw.primary_supply,
            recovery_rate: raw.recovery_rate,
            stock: raw.stock,
            cost_per_tonne: raw.cost_per_tonne,
            geopolitical_risk: raw.geopolitical_risk,
            domestic_availability: raw.domestic_availability,
        };
        let id = material.id.clone();
        ensure!(
            materials.insert(id.clone(), material).is_none(),
            "Duplicate material ID {id}"
        );
    }

    Ok(materials)
}
