//! Code for reading in technologies and what they need from the supply chain.
use super::*;
use crate::component::ComponentMap;
use crate::id::IDCollection;
use crate::material::MaterialMap;
use crate::technology::{Technology, TechnologyMap, TechnologyType};
use crate::units::{
    Capacity, CapacityPerArea, ComponentsPerCapacity, Dimensionless, MassPerCapacity,
    MoneyPerCapacity, MoneyPerEnergy,
};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const TECHNOLOGIES_FILE_NAME: &str = "technologies.csv";
const TECHNOLOGY_COMPONENTS_FILE_NAME: &str = "technology_components.csv";
const TECHNOLOGY_MATERIALS_FILE_NAME: &str = "technology_materials.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct TechnologyRaw {
    id: String,
    kind: TechnologyType,
    capacity_density: CapacityPerArea,
    lead_time: u32,
    lifetime: u32,
    capital_cost: MoneyPerCapacity,
    variable_cost: MoneyPerEnergy,
    elcc: Dimensionless,
    manufacturing_capacity: Capacity,
}

/// Units of a component needed per MW of a technology
#[derive(PartialEq, Debug, Deserialize)]
struct TechnologyComponentRaw {
    technology_id: String,
    component_id: String,
    units_per_mw: ComponentsPerCapacity,
}

/// Tonnes of a material used directly (outside of components) per MW of a technology
#[derive(PartialEq, Debug, Deserialize)]
struct TechnologyMaterialRaw {
    technology_id: String,
    material_id: String,
    intensity: MassPerCapacity,
}

/// Read technologies from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `materials` - The model's materials
/// * `components` - The model's components
pub fn read_technologies(
    model_dir: &Path,
    materials: &MaterialMap,
    components: &ComponentMap,
) -> Result<TechnologyMap> {
    let file_path = model_dir.join(TECHNOLOGIES_FILE_NAME);
    let technologies_csv = read_csv(&file_path)?;
    let mut technologies =
        read_technologies_from_iter(technologies_csv).with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(TECHNOLOGY_COMPONENTS_FILE_NAME);
    let components_csv = read_csv_optional(&file_path)?;
    read_technology_components_from_iter(components_csv, &mut technologies, components)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(TECHNOLOGY_MATERIALS_FILE_NAME);
    let materials_csv = read_csv_optional(&file_path)?;
    read_technology_materials_from_iter(materials_csv, &mut technologies, materials)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(technologies)
}

fn read_technologies_from_iter<I>(iter: I) -> Result<TechnologyMap>
where
    I: Iterator<Item = TechnologyRaw>,
{
    let mut technologies = TechnologyMap::new();
    for raw in iter {
        let technology = Technology {
            id: raw.id.into(),
            kind: raw.kind,
            component_demand: IndexMap::new(),
            capacity_density: raw.capacity_density,
            lead_time: raw.lead_time,
            lifetime: raw.lifetime,
            capital_cost: raw.capital_cost,
            variable_cost: raw.variable_cost,
            elcc: raw.elcc,
            material_intensity: IndexMap::new(),
            manufacturing_capacity: raw.manufacturing_capacity,
        };
        let id = technology.id.clone();
        ensure!(
            technologies.insert(id.clone(), technology).is_none(),
            "Duplicate technology ID {id}"
        );
    }

    Ok(technologies)
}

/// Get the technology with the given ID for modification
fn get_technology<'a>(
    technologies: &'a mut TechnologyMap,
    id: &str,
) -> Result<&'a mut Technology> {
    technologies
        .get_mut(id)
        .with_context(|| format!("Unknown technology ID {id}"))
}

fn read_technology_components_from_iter<I>(
    iter: I,
    technologies: &mut TechnologyMap,
    components: &ComponentMap,
) -> Result<()>
where
    I: Iterator<Item = TechnologyComponentRaw>,
{
    for raw in iter {
        let technology = get_technology(technologies, &raw.technology_id)?;
        let component_id = components.get_id_by_str(&raw.component_id)?;
        ensure!(
            technology
                .component_demand
                .insert(component_id.clone(), raw.units_per_mw)
                .is_none(),
            "Duplicate entry for technology {} and component {component_id}",
            technology.id
        );
    }

    Ok(())
}

fn read_technology_materials_from_iter<I>(
    iter: I,
    technologies: &mut TechnologyMap,
    materials: &MaterialMap,
) -> Result<()>
where
    I: Iterator<Item = TechnologyMaterialRaw>,
{
    for raw in iter {
        let technology = get_technology(technologies, &raw.technology_id)?;
        let material_id = materials.get_id_by_str(&raw.material_id)?;
        ensure!(
            technology
                .material_intensity
                .insert(material_id.clone(), raw.intensity)
                .is_none(),
            "Duplicate entry for technology {} and material {material_id}",
            technology.id
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, components, materials, solar, technology};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[rstest]
    fn test_read_technologies(
        technology: Technology,
        solar: Technology,
        materials: MaterialMap,
        components: ComponentMap,
    ) {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(TECHNOLOGIES_FILE_NAME)).unwrap();
            writeln!(
                file,
                "id,kind,capacity_density,lead_time,lifetime,capital_cost,variable_cost,elcc,\
                manufacturing_capacity\n\
                gas_ccgt,gas,100,2,30,1000000,0,0.9,10000\n\
                solar_pv,solar,50,1,25,800000,0,0.3,10000"
            )
            .unwrap();
            let mut file = File::create(dir.path().join(TECHNOLOGY_COMPONENTS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "technology_id,component_id,units_per_mw\nsolar_pv,pv_module,2"
            )
            .unwrap();
            let mut file = File::create(dir.path().join(TECHNOLOGY_MATERIALS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "technology_id,material_id,intensity\nsolar_pv,silicon,0.25"
            )
            .unwrap();
        }

        let technologies = read_technologies(dir.path(), &materials, &components).unwrap();
        assert_eq!(technologies.len(), 2);
        assert_eq!(technologies["gas_ccgt"], technology);
        assert_eq!(technologies["solar_pv"], solar);
    }

    #[rstest]
    fn test_read_technologies_missing_file(materials: MaterialMap, components: ComponentMap) {
        let dir = tempdir().unwrap();
        assert!(read_technologies(dir.path(), &materials, &components).is_err());
    }

    fn gas() -> TechnologyRaw {
        TechnologyRaw {
            id: "gas_ccgt".into(),
            kind: TechnologyType::Gas,
            capacity_density: CapacityPerArea(100.0),
            lead_time: 2,
            lifetime: 30,
            capital_cost: MoneyPerCapacity(1_000_000.0),
            variable_cost: MoneyPerEnergy(0.0),
            elcc: Dimensionless(0.9),
            manufacturing_capacity: Capacity(10_000.0),
        }
    }

    #[test]
    fn test_read_technologies_from_iter_duplicate() {
        assert_error!(
            read_technologies_from_iter([gas(), gas()].into_iter()),
            "Duplicate technology ID gas_ccgt"
        );
    }

    #[rstest]
    #[case("coal", "pv_module", "Unknown technology ID coal")]
    #[case("gas_ccgt", "magnet", "Unknown ID magnet found")]
    fn test_read_technology_components_unknown_id(
        components: ComponentMap,
        #[case] technology_id: &str,
        #[case] component_id: &str,
        #[case] msg: &str,
    ) {
        let mut technologies = read_technologies_from_iter(std::iter::once(gas())).unwrap();
        let raw = TechnologyComponentRaw {
            technology_id: technology_id.into(),
            component_id: component_id.into(),
            units_per_mw: ComponentsPerCapacity(1.0),
        };
        assert_error!(
            read_technology_components_from_iter(
                std::iter::once(raw),
                &mut technologies,
                &components
            ),
            msg
        );
    }

    #[rstest]
    fn test_read_technology_materials_duplicate(materials: MaterialMap) {
        let mut technologies = read_technologies_from_iter(std::iter::once(gas())).unwrap();
        let raw = || TechnologyMaterialRaw {
            technology_id: "gas_ccgt".into(),
            material_id: "lithium".into(),
            intensity: MassPerCapacity(1.0),
        };
        assert_error!(
            read_technology_materials_from_iter(
                [raw(), raw()].into_iter(),
                &mut technologies,
                &materials
            ),
            "Duplicate entry for technology gas_ccgt and material lithium"
        );
    }
}
