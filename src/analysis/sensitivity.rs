//! Sensitivity of a plan's cost to the supply of individual materials.
use super::BottleneckReport;
use crate::configuration::ConstraintConfiguration;
use crate::material::{MaterialID, MaterialType};
use crate::units::{Dimensionless, Money};
use indexmap::IndexMap;
use log::debug;

/// Bottlenecks together with how the cost responds to material supply
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityReport {
    /// The bottlenecks in the baseline plan
    pub bottlenecks: BottleneckReport,
    /// Elasticity of the cost with respect to each material's supply, largest magnitude first
    pub sensitivity: IndexMap<MaterialID, f64>,
    /// Narrative of the constraints holding the plan back
    pub critical_path: Vec<String>,
}

/// The materials to analyse.
///
/// Those listed in the solver parameters, otherwise the critical and rare-earth materials,
/// otherwise every material.
pub fn sensitivity_materials(config: &ConstraintConfiguration) -> Vec<MaterialID> {
    if !config.parameters.sensitivity_materials.is_empty() {
        return config.parameters.sensitivity_materials.clone();
    }

    let scarce: Vec<_> = config
        .materials
        .values()
        .filter(|material| {
            matches!(
                material.kind,
                MaterialType::Critical | MaterialType::RareEarth
            )
        })
        .map(|material| material.id.clone())
        .collect();
    if scarce.is_empty() {
        config.materials.keys().cloned().collect()
    } else {
        scarce
    }
}

/// A copy of `config` with the primary supply of one material increased by `perturbation`
pub fn perturb_supply(
    config: &ConstraintConfiguration,
    material_id: &MaterialID,
    perturbation: Dimensionless,
) -> ConstraintConfiguration {
    let mut config = config.clone();
    if let Some(material) = config.materials.get_mut(material_id) {
        material.primary_supply = material.primary_supply * (Dimensionless(1.0) + perturbation);
    }

    config
}

/// Relative change in cost per relative change in supply.
///
/// Zero if the baseline cost is zero.
pub fn elasticity(baseline: Money, perturbed: Money, perturbation: Dimensionless) -> f64 {
    if baseline.value() == 0.0 || perturbation.value() == 0.0 {
        return 0.0;
    }

    (perturbed - baseline).value() / (baseline.value() * perturbation.value())
}

/// Re-solve with the supply of each material perturbed in turn and compute the elasticity of
/// the cost.
///
/// `solve` returns the cost of the plan found for a configuration.
pub fn analyse_sensitivity<F>(
    config: &ConstraintConfiguration,
    baseline: Money,
    mut solve: F,
) -> IndexMap<MaterialID, f64>
where
    F: FnMut(&ConstraintConfiguration) -> Money,
{
    let perturbation = config.parameters.sensitivity_perturbation;
    let mut sensitivity: IndexMap<_, _> = sensitivity_materials(config)
        .into_iter()
        .map(|material_id| {
            let perturbed = solve(&perturb_supply(config, &material_id, perturbation));
            let value = elasticity(baseline, perturbed, perturbation);
            debug!("Elasticity of cost with respect to {material_id} supply: {value}");
            (material_id, value)
        })
        .collect();
    sensitivity.sort_by(|_, a, _, b| b.abs().total_cmp(&a.abs()));

    sensitivity
}
