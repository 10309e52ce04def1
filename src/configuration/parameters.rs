//! Defines the `SolverParameters` struct, which holds the tuning knobs for the heuristics and the
//! penalty rates used in the objective.
use crate::material::MaterialID;
use crate::units::{Capacity, Dimensionless, MoneyPerCapacity};
use anyhow::{Result, ensure};
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_candidate_max_iterations, u32, 100);
define_unit_param_default!(default_demand_trigger, Dimensionless, 1.1);
define_unit_param_default!(default_investment_fraction, Dimensionless, 0.1);
define_unit_param_default!(default_max_investment_step, Capacity, 500.0);
define_unit_param_default!(default_mutation_factor, Dimensionless, 0.5);
define_param_default!(default_tabu_iterations, u32, 100);
define_param_default!(default_tabu_neighbours, u32, 20);
define_param_default!(default_tabu_tenure, usize, 10);
define_param_default!(default_tabu_patience, u32, 25);
define_unit_param_default!(default_tabu_jitter, Dimensionless, 0.1);
define_param_default!(default_annealing_iterations, u32, 500);
define_param_default!(default_initial_temperature, f64, 1000.0);
define_unit_param_default!(default_cooling_rate, Dimensionless, 0.95);
define_unit_param_default!(default_annealing_jitter, Dimensionless, 0.2);
define_unit_param_default!(default_reserve_margin_penalty, MoneyPerCapacity, 100_000.0);
define_unit_param_default!(default_load_shedding_penalty, MoneyPerCapacity, 500_000.0);
define_unit_param_default!(default_rps_penalty, MoneyPerCapacity, 50_000.0);
define_unit_param_default!(default_sensitivity_perturbation, Dimensionless, 0.1);
define_param_default!(default_seed, u64, 42);

/// Tuning parameters for the solver, read from the `[parameters]` table of `model.toml`.
///
/// Every field has a default, so the table may be omitted entirely.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct SolverParameters {
    /// Maximum number of propose/validate rounds when generating the initial plan
    #[serde(default = "default_candidate_max_iterations")]
    pub candidate_max_iterations: u32,
    /// Build is triggered once projected demand exceeds peak load by this factor
    #[serde(default = "default_demand_trigger")]
    pub demand_trigger: Dimensionless,
    /// Fraction of incremental demand proposed as new build in a triggered year
    #[serde(default = "default_investment_fraction")]
    pub investment_fraction: Dimensionless,
    /// Largest build proposed for a single zone and year
    #[serde(default = "default_max_investment_step")]
    pub max_investment_step: Capacity,
    /// Factor applied to investments which cause a constraint violation
    #[serde(default = "default_mutation_factor")]
    pub mutation_factor: Dimensionless,
    /// Which local search(es) to run after the initial plan is found
    #[serde(default)]
    pub method: SearchMethod,
    /// Number of tabu search iterations
    #[serde(default = "default_tabu_iterations")]
    pub tabu_iterations: u32,
    /// Number of neighbours sampled per tabu search iteration
    #[serde(default = "default_tabu_neighbours")]
    pub tabu_neighbours: u32,
    /// Number of recently accepted plans which are tabu
    #[serde(default = "default_tabu_tenure")]
    pub tabu_tenure: usize,
    /// Tabu search stops after this many consecutive iterations without improvement
    #[serde(default = "default_tabu_patience")]
    pub tabu_patience: u32,
    /// Maximum relative change to an investment when sampling a tabu neighbour
    #[serde(default = "default_tabu_jitter")]
    pub tabu_jitter: Dimensionless,
    /// Number of simulated annealing iterations
    #[serde(default = "default_annealing_iterations")]
    pub annealing_iterations: u32,
    /// Starting temperature for simulated annealing
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature: f64,
    /// Factor the temperature is multiplied by after each iteration
    #[serde(default = "default_cooling_rate")]
    pub cooling_rate: Dimensionless,
    /// Maximum relative change to an investment when sampling an annealing neighbour
    #[serde(default = "default_annealing_jitter")]
    pub annealing_jitter: Dimensionless,
    /// Cost per MW of reserve margin shortfall
    #[serde(default = "default_reserve_margin_penalty")]
    pub reserve_margin_penalty: MoneyPerCapacity,
    /// Cost per MW of unserved peak demand
    #[serde(default = "default_load_shedding_penalty")]
    pub load_shedding_penalty: MoneyPerCapacity,
    /// Cost per MW of renewable capacity shortfall
    #[serde(default = "default_rps_penalty")]
    pub rps_penalty: MoneyPerCapacity,
    /// Relative increase in primary supply used for sensitivity analysis
    #[serde(default = "default_sensitivity_perturbation")]
    pub sensitivity_perturbation: Dimensionless,
    /// Materials to include in sensitivity analysis.
    ///
    /// If empty, critical and rare-earth materials are used.
    #[serde(default)]
    pub sensitivity_materials: Vec<MaterialID>,
    /// Seed for the random number generator used by the local searches
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SolverParameters {
    fn default() -> Self {
        toml::from_str("").expect("All solver parameters have defaults")
    }
}

/// The local search(es) used to refine the initial plan
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum SearchMethod {
    /// Only run tabu search
    #[string = "tabu"]
    Tabu,
    /// Only run simulated annealing
    #[string = "annealing"]
    Annealing,
    /// Run tabu search, then simulated annealing from its best plan
    #[default]
    #[string = "tabu_then_annealing"]
    TabuThenAnnealing,
}

/// Check that a value is a proportion in the range (0, 1]
fn check_proportion_nonzero(name: &str, value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value > Dimensionless(0.0) && value <= Dimensionless(1.0),
        "{name} must be greater than zero and at most one"
    );

    Ok(())
}

/// Check that a penalty rate is valid
fn check_penalty(name: &str, value: MoneyPerCapacity) -> Result<()> {
    ensure!(
        value.is_finite() && value >= MoneyPerCapacity(0.0),
        "{name} must be a finite number greater than or equal to zero"
    );

    Ok(())
}

impl SolverParameters {
    /// Validate parameters after reading in file
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.candidate_max_iterations > 0,
            "candidate_max_iterations cannot be zero"
        );
        ensure!(
            self.demand_trigger.is_finite() && self.demand_trigger >= Dimensionless(1.0),
            "demand_trigger must be at least one"
        );
        check_proportion_nonzero("investment_fraction", self.investment_fraction)?;
        ensure!(
            self.max_investment_step.is_finite() && self.max_investment_step > Capacity(0.0),
            "max_investment_step must be greater than zero"
        );
        ensure!(
            self.mutation_factor.is_finite()
                && self.mutation_factor > Dimensionless(0.0)
                && self.mutation_factor < Dimensionless(1.0),
            "mutation_factor must be between zero and one (exclusive)"
        );
        ensure!(self.tabu_tenure > 0, "tabu_tenure cannot be zero");
        ensure!(self.tabu_neighbours > 0, "tabu_neighbours cannot be zero");
        check_proportion_nonzero("tabu_jitter", self.tabu_jitter)?;
        check_proportion_nonzero("annealing_jitter", self.annealing_jitter)?;
        ensure!(
            self.initial_temperature.is_finite() && self.initial_temperature > 0.0,
            "initial_temperature must be greater than zero"
        );
        ensure!(
            self.cooling_rate > Dimensionless(0.0) && self.cooling_rate < Dimensionless(1.0),
            "cooling_rate must be between zero and one (exclusive)"
        );
        check_penalty("reserve_margin_penalty", self.reserve_margin_penalty)?;
        check_penalty("load_shedding_penalty", self.load_shedding_penalty)?;
        check_penalty("rps_penalty", self.rps_penalty)?;
        check_proportion_nonzero("sensitivity_perturbation", self.sensitivity_perturbation)?;

        Ok(())
    }
}
