//! Simulated annealing.
use super::neighbour::{NeighbourEvaluator, jitter_investments};
use super::{CancellationToken, SearchOutcome, SearchState};
use crate::configuration::ConstraintConfiguration;
use crate::units::Money;
use crate::variables::DecisionVariables;
use log::{debug, trace};
use rand::Rng;

/// The probability of moving from a plan costing `current` to one costing `candidate`
fn acceptance_probability(current: Money, candidate: Money, temperature: f64) -> f64 {
    if candidate < current {
        1.0
    } else {
        ((current - candidate).value() / temperature).exp()
    }
}

/// Simulated annealing over investment magnitudes
pub struct SimulatedAnnealing<'a> {
    config: &'a ConstraintConfiguration,
}

impl<'a> SimulatedAnnealing<'a> {
    /// Create a search using the parameters in `config`
    pub fn new(config: &'a ConstraintConfiguration) -> Self {
        Self { config }
    }

    /// Run the search from a feasible plan.
    ///
    /// The returned trace holds the cost of the best plan seen after each iteration, so it never
    /// increases.
    pub fn run<R: Rng>(
        &self,
        start: DecisionVariables,
        start_objective: Money,
        rng: &mut R,
        cancellation: &CancellationToken,
    ) -> SearchOutcome {
        let params = &self.config.parameters;
        let mut evaluator = NeighbourEvaluator::new(self.config, &start);
        let mut best = start.clone();
        let mut best_objective = start_objective;
        let mut current = start;
        let mut current_objective = start_objective;
        let mut temperature = params.initial_temperature;
        let mut trace = Vec::with_capacity(params.annealing_iterations as usize);
        let mut iterations = 0;

        while iterations < params.annealing_iterations && !cancellation.is_cancelled() {
            iterations += 1;

            let perturbation = jitter_investments(&current, params.annealing_jitter, rng);
            if let Some(objective) = evaluator.evaluate(&current, &perturbation) {
                let probability = acceptance_probability(current_objective, objective, temperature);
                if probability >= 1.0 || rng.gen_range(0.0..1.0) < probability {
                    current.clone_from(evaluator.neighbour());
                    current_objective = objective;

                    if current_objective < best_objective {
                        trace!(
                            "Annealing iteration {iterations}: cost improved to {} at \
                            temperature {temperature}",
                            current_objective.value()
                        );
                        best.clone_from(&current);
                        best_objective = current_objective;
                    }
                }
            }

            temperature *= params.cooling_rate.value();
            trace.push(best_objective);
        }

        let state = SearchState::finish(best_objective < start_objective, false);
        debug!("Simulated annealing finished after {iterations} iteration(s) in state {state}");

        SearchOutcome {
            variables: best,
            objective: best_objective,
            iterations,
            state,
            trace,
        }
    }
}
