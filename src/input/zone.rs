//! Code for reading in zones and their existing generating capacity.
use super::*;
use crate::id::IDCollection;
use crate::technology::TechnologyMap;
use crate::units::{Area, Capacity, Dimensionless};
use crate::zone::{Zone, ZoneMap};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const ZONES_FILE_NAME: &str = "zones.csv";
const ZONE_CAPACITY_FILE_NAME: &str = "zone_capacity.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct ZoneRaw {
    id: String,
    available_land: Area,
    peak_load: Capacity,
    demand_growth: Dimensionless,
    transmission_capacity: Capacity,
    rps_target: Dimensionless,
}

/// Capacity of a technology already operating in a zone at the start of the horizon
#[derive(PartialEq, Debug, Deserialize)]
struct ZoneCapacityRaw {
    zone_id: String,
    technology_id: String,
    capacity: Capacity,
}

/// Read zones from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `technologies` - The model's technologies
pub fn read_zones(model_dir: &Path, technologies: &TechnologyMap) -> Result<ZoneMap> {
    let file_path = model_dir.join(ZONES_FILE_NAME);
    let zones_csv = read_csv(&file_path)?;
    let mut zones = read_zones_from_iter(zones_csv).with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(ZONE_CAPACITY_FILE_NAME);
    let capacity_csv = read_csv_optional(&file_path)?;
    read_zone_capacity_from_iter(capacity_csv, &mut zones, technologies)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(zones)
}

fn read_zones_from_iter<I>(iter: I) -> Result<ZoneMap>
where
    I: Iterator<Item = ZoneRaw>,
{
    let mut zones = ZoneMap::new();
    for raw in iter {
        let zone = Zone {
            id: raw.id.into(),
            available_land: raw.available_land,
            peak_load: raw.peak_load,
            demand_growth: raw.demand_growth,
            existing_capacity: IndexMap::new(),
            transmission_capacity: raw.transmission_capacity,
            rps_target: raw.rps_target,
        };
        let id = zone.id.clone();
        ensure!(
            zones.insert(id.clone(), zone).is_none(),
            "Duplicate zone ID {id}"
        );
    }

    Ok(zones)
}

fn read_zone_capacity_from_iter<I>(
    iter: I,
    zones: &mut ZoneMap,
    technologies: &TechnologyMap,
) -> Result<()>
where
    I: Iterator<Item = ZoneCapacityRaw>,
{
    for raw in iter {
        let zone = zones
            .get_mut(raw.zone_id.as_str())
            .with_context(|| format!("Unknown zone ID {}", raw.zone_id))?;
        let technology_id = technologies.get_id_by_str(&raw.technology_id)?;
        ensure!(
            zone.existing_capacity
                .insert(technology_id.clone(), raw.capacity)
                .is_none(),
            "Duplicate existing capacity for {technology_id} in zone {}",
            zone.id
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, technology, zone};
    use crate::technology::Technology;
    use indexmap::indexmap;
    use rstest::{fixture, rstest};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[fixture]
    fn technologies(technology: Technology) -> TechnologyMap {
        indexmap! {technology.id.clone() => technology}
    }

    #[rstest]
    fn test_read_zones(zone: Zone, technologies: TechnologyMap) {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(ZONES_FILE_NAME)).unwrap();
            writeln!(
                file,
                "id,available_land,peak_load,demand_growth,transmission_capacity,rps_target\n\
                north,10000,1000,0.05,0,0"
            )
            .unwrap();
            let mut file = File::create(dir.path().join(ZONE_CAPACITY_FILE_NAME)).unwrap();
            writeln!(file, "zone_id,technology_id,capacity\nnorth,gas_ccgt,2000").unwrap();
        }

        let zones = read_zones(dir.path(), &technologies).unwrap();
        assert_eq!(zones, indexmap! {zone.id.clone() => zone});
    }

    fn north() -> ZoneRaw {
        ZoneRaw {
            id: "north".into(),
            available_land: Area(1.0),
            peak_load: Capacity(1.0),
            demand_growth: Dimensionless(0.0),
            transmission_capacity: Capacity(0.0),
            rps_target: Dimensionless(0.0),
        }
    }

    #[test]
    fn test_read_zones_from_iter_duplicate() {
        assert_error!(
            read_zones_from_iter([north(), north()].into_iter()),
            "Duplicate zone ID north"
        );
    }

    #[rstest]
    #[case("south", "gas_ccgt", "Unknown zone ID south")]
    #[case("north", "coal", "Unknown ID coal found")]
    fn test_read_zone_capacity_unknown_id(
        technologies: TechnologyMap,
        #[case] zone_id: &str,
        #[case] technology_id: &str,
        #[case] msg: &str,
    ) {
        let mut zones = read_zones_from_iter(std::iter::once(north())).unwrap();
        let raw = ZoneCapacityRaw {
            zone_id: zone_id.into(),
            technology_id: technology_id.into(),
            capacity: Capacity(10.0),
        };
        assert_error!(
            read_zone_capacity_from_iter(std::iter::once(raw), &mut zones, &technologies),
            msg
        );
    }
}
