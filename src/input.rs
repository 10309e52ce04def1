//! Common routines for handling input data.
use crate::configuration::{ConstraintConfiguration, PlanningHorizon, RpsTarget, SolverParameters};
use crate::units::Dimensionless;
use anyhow::{Context, Result, bail};
use itertools::Itertools;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub mod component;
use component::read_components;
pub mod material;
use material::read_materials;
pub mod scenario;
use scenario::read_scenarios;
pub mod technology;
use technology::read_technologies;
pub mod zone;
use zone::read_zones;

const MODEL_FILE_NAME: &str = "model.toml";

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// The file may be empty or absent, in which case no records are returned.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    Ok(read_csv_internal(file_path)?.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

fn default_reserve_margin() -> Dimensionless {
    Dimensionless(0.15)
}

/// The contents of `model.toml`
#[derive(Debug, Deserialize, PartialEq)]
struct ModelFile {
    horizon: PlanningHorizon,
    #[serde(default = "default_reserve_margin")]
    reserve_margin: Dimensionless,
    #[serde(default)]
    rps_targets: Vec<RpsTarget>,
    #[serde(default)]
    parameters: SolverParameters,
}

/// Read a configuration from the specified model directory and check that it is valid.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn load_configuration<P: AsRef<Path>>(model_dir: P) -> Result<ConstraintConfiguration> {
    let model_dir = model_dir.as_ref();
    let model_file: ModelFile = read_toml(&model_dir.join(MODEL_FILE_NAME))?;

    let materials = read_materials(model_dir)?;
    let components = read_components(model_dir, &materials)?;
    let technologies = read_technologies(model_dir, &materials, &components)?;
    let zones = read_zones(model_dir, &technologies)?;
    let scenarios = read_scenarios(model_dir, &materials)?;

    let config = ConstraintConfiguration {
        materials,
        components,
        technologies,
        zones,
        horizon: model_file.horizon,
        reserve_margin: model_file.reserve_margin,
        rps_targets: model_file.rps_targets,
        parameters: model_file.parameters,
        scenarios,
    };
    config
        .validate()
        .with_context(|| format!("Invalid model in {}", model_dir.display()))?;

    Ok(config)
}
