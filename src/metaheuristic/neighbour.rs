//! Sampling and evaluation of neighbouring plans.
use crate::configuration::ConstraintConfiguration;
use crate::objective::evaluate;
use crate::units::{Dimensionless, Money};
use crate::validation::validate;
use crate::variables::{DecisionVariables, Perturbation};
use rand::Rng;

/// Sample a neighbour by scaling every non-zero investment by a random factor in
/// `[1 - jitter, 1 + jitter]`.
///
/// Investments which are zero stay zero, so a neighbour never builds a technology somewhere it was
/// not already being built.
pub fn jitter_investments<R: Rng>(
    variables: &DecisionVariables,
    jitter: Dimensionless,
    rng: &mut R,
) -> Perturbation {
    let low = 1.0 - jitter.value();
    let high = 1.0 + jitter.value();

    let mut perturbation = Perturbation::new();
    for (key, investment) in variables.investments() {
        let factor = rng.gen_range(low..=high);
        perturbation.push(key, investment * Dimensionless(factor));
    }

    perturbation
}

/// Applies perturbations into a reusable buffer and scores the result
pub struct NeighbourEvaluator<'a> {
    config: &'a ConstraintConfiguration,
    scratch: DecisionVariables,
}

impl<'a> NeighbourEvaluator<'a> {
    /// Create an evaluator with a buffer shaped like `template`
    pub fn new(config: &'a ConstraintConfiguration, template: &DecisionVariables) -> Self {
        Self {
            config,
            scratch: template.clone(),
        }
    }

    /// Apply `perturbation` to `base` and return the cost of the result.
    ///
    /// Returns `None` if the neighbour is infeasible.
    pub fn evaluate(
        &mut self,
        base: &DecisionVariables,
        perturbation: &Perturbation,
    ) -> Option<Money> {
        perturbation.apply_into(base, &mut self.scratch, self.config);
        validate(&self.scratch, self.config)
            .is_feasible()
            .then(|| evaluate(&self.scratch, self.config))
    }

    /// The most recently evaluated neighbour
    pub fn neighbour(&self) -> &DecisionVariables {
        &self.scratch
    }
}
