//! Tabu search.
//!
//! Each iteration samples a batch of neighbours of the best plan, skips any which have been
//! visited recently and moves to the cheapest feasible neighbour if it improves on the best plan.
use super::neighbour::{NeighbourEvaluator, jitter_investments};
use super::{CancellationToken, SearchOutcome, SearchState};
use crate::configuration::ConstraintConfiguration;
use crate::units::Money;
use crate::variables::DecisionVariables;
use log::{debug, trace};
use rand::Rng;
use std::collections::VecDeque;

/// A first-in, first-out list of fingerprints of recently accepted plans
#[derive(Debug, Clone)]
pub struct TabuList {
    entries: VecDeque<u64>,
    tenure: usize,
}

impl TabuList {
    /// Create an empty list which holds at most `tenure` entries
    pub fn new(tenure: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(tenure),
            tenure,
        }
    }

    /// Add a fingerprint, evicting the oldest if the list is full
    pub fn push(&mut self, fingerprint: u64) {
        if self.tenure == 0 {
            return;
        }
        if self.entries.len() == self.tenure {
            self.entries.pop_front();
        }
        self.entries.push_back(fingerprint);
    }

    /// Whether a fingerprint is tabu
    pub fn contains(&self, fingerprint: u64) -> bool {
        self.entries.contains(&fingerprint)
    }

    /// Number of fingerprints in the list
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of fingerprints held
    pub fn tenure(&self) -> usize {
        self.tenure
    }
}

/// Tabu search over investment magnitudes
pub struct TabuSearch<'a> {
    config: &'a ConstraintConfiguration,
    tabu_list: TabuList,
    state: SearchState,
}

impl<'a> TabuSearch<'a> {
    /// Create a search using the parameters in `config`
    pub fn new(config: &'a ConstraintConfiguration) -> Self {
        Self {
            config,
            tabu_list: TabuList::new(config.parameters.tabu_tenure),
            state: SearchState::Initialized,
        }
    }

    /// The list of recently accepted plans
    pub fn tabu_list(&self) -> &TabuList {
        &self.tabu_list
    }

    /// The current state of the search
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Run the search from a feasible plan
    pub fn run<R: Rng>(
        &mut self,
        start: DecisionVariables,
        start_objective: Money,
        rng: &mut R,
        cancellation: &CancellationToken,
    ) -> SearchOutcome {
        let params = &self.config.parameters;
        let mut evaluator = NeighbourEvaluator::new(self.config, &start);
        let mut best = start;
        let mut best_objective = start_objective;
        let mut candidate = best.clone();
        let mut trace = Vec::with_capacity(params.tabu_iterations as usize);
        let mut iterations = 0;
        let mut since_improvement = 0;
        let mut converged = false;

        self.tabu_list.push(best.fingerprint());
        self.state = SearchState::Searching;

        while iterations < params.tabu_iterations && !cancellation.is_cancelled() {
            iterations += 1;

            // Cheapest feasible, non-tabu neighbour in this batch
            let mut candidate_objective = None;
            for _ in 0..params.tabu_neighbours {
                let perturbation = jitter_investments(&best, params.tabu_jitter, rng);
                let Some(objective) = evaluator.evaluate(&best, &perturbation) else {
                    continue;
                };
                let fingerprint = evaluator.neighbour().fingerprint();
                if self.tabu_list.contains(fingerprint) {
                    continue;
                }
                if candidate_objective.is_none_or(|current| objective < current) {
                    candidate_objective = Some(objective);
                    candidate.clone_from(evaluator.neighbour());
                }
            }

            match candidate_objective {
                Some(objective) if objective < best_objective => {
                    trace!(
                        "Tabu iteration {iterations}: cost improved from {} to {}",
                        best_objective.value(),
                        objective.value()
                    );
                    std::mem::swap(&mut best, &mut candidate);
                    best_objective = objective;
                    self.tabu_list.push(best.fingerprint());
                    since_improvement = 0;
                }
                _ => since_improvement += 1,
            }
            trace.push(best_objective);

            if since_improvement >= params.tabu_patience {
                debug!("Tabu search converged after {iterations} iteration(s)");
                converged = true;
                break;
            }
        }

        self.state = SearchState::finish(best_objective < start_objective, converged);

        SearchOutcome {
            variables: best,
            objective: best_objective,
            iterations,
            state: self.state,
            trace,
        }
    }
}
