//! Code for reading in components and the materials they are made from.
use super::*;
use crate::component::{Component, ComponentMap};
use crate::id::IDCollection;
use crate::material::MaterialMap;
use crate::units::{ComponentCount, MassPerComponent};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const COMPONENTS_FILE_NAME: &str = "components.csv";
const COMPONENT_MATERIALS_FILE_NAME: &str = "component_materials.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct ComponentRaw {
    id: String,
    production_capacity: ComponentCount,
    lead_time: u32,
}

/// The tonnes of a material in each unit of a component
#[derive(PartialEq, Debug, Deserialize)]
struct ComponentMaterialRaw {
    component_id: String,
    material_id: String,
    demand: MassPerComponent,
}

/// Read components from the specified model directory.
///
/// Components are optional: a model may have no `components.csv`.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `materials` - The model's materials
pub fn read_components(model_dir: &Path, materials: &MaterialMap) -> Result<ComponentMap> {
    let file_path = model_dir.join(COMPONENTS_FILE_NAME);
    let components_csv = read_csv_optional(&file_path)?;
    let mut components =
        read_components_from_iter(components_csv).with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(COMPONENT_MATERIALS_FILE_NAME);
    let demand_csv = read_csv_optional(&file_path)?;
    read_component_materials_from_iter(demand_csv, &mut components, materials)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(components)
}

fn read_components_from_iter<I>(iter: I) -> Result<ComponentMap>
where
    I: Iterator<Item = ComponentRaw>,
{
    let mut components = ComponentMap::new();
    for raw in iter {
        let component = Component {
            id: raw.id.into(),
            material_demand: IndexMap::new(),
            production_capacity: raw.production_capacity,
            lead_time: raw.lead_time,
        };
        let id = component.id.clone();
        ensure!(
            components.insert(id.clone(), component).is_none(),
            "Duplicate component ID {id}"
        );
    }

    Ok(components)
}

fn read_component_materials_from_iter<I>(
    iter: I,
    components: &mut ComponentMap,
    materials: &MaterialMap,
) -> Result<()>
where
    I: Iterator<Item = ComponentMaterialRaw>,
{
    for raw in iter {
        let component = components
            .get_mut(raw.component_id.as_str())
            .with_context(|| format!("Unknown component ID {}", raw.component_id))?;
        let material_id = materials.get_id_by_str(&raw.material_id)?;
        ensure!(
            component
                .material_demand
                .insert(material_id.clone(), raw.demand)
                .is_none(),
            "Duplicate entry for component {} and material {material_id}",
            component.id
        );
    }

    Ok(())
}
