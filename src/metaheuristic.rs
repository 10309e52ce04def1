//! Local search for refining a feasible plan.
//!
//! Two searches are provided, [`tabu`] search and simulated [`annealing`]. Both start from a
//! feasible plan, only ever move to feasible plans and return the best plan seen.
use crate::configuration::{ConstraintConfiguration, SearchMethod};
use crate::units::Money;
use crate::variables::DecisionVariables;
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod annealing;
pub mod neighbour;
pub mod tabu;
use annealing::SimulatedAnnealing;
use tabu::TabuSearch;

/// The state of a local search
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SearchState {
    /// The search has not started
    Initialized,
    /// The search is running
    Searching,
    /// The search finished with a cheaper plan than it started with
    Improved,
    /// The search stopped early because it stopped finding better plans
    Converged,
    /// The search ran out of iterations (or was cancelled) without improving
    Exhausted,
}

impl SearchState {
    /// Whether the search has finished
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Improved | Self::Converged | Self::Exhausted)
    }

    /// The state a search finishes in
    fn finish(improved: bool, converged: bool) -> Self {
        if improved {
            Self::Improved
        } else if converged {
            Self::Converged
        } else {
            Self::Exhausted
        }
    }
}

/// A flag which can be set from another thread to stop a solve between iterations
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token which has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The result of a local search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The best plan found
    pub variables: DecisionVariables,
    /// The cost of the best plan
    pub objective: Money,
    /// The number of iterations performed
    pub iterations: u32,
    /// The state the search finished in
    pub state: SearchState,
    /// The cost of the best plan after each iteration
    pub trace: Vec<Money>,
}

impl SearchOutcome {
    /// An outcome for a search which did nothing
    fn unchanged(variables: DecisionVariables, objective: Money) -> Self {
        Self {
            variables,
            objective,
            iterations: 0,
            state: SearchState::Initialized,
            trace: Vec::new(),
        }
    }
}

/// Refine a feasible plan with the search method chosen in the configuration.
///
/// The random number generator is seeded from the configuration, so the result is reproducible.
pub fn optimise(
    config: &ConstraintConfiguration,
    start: DecisionVariables,
    start_objective: Money,
    cancellation: &CancellationToken,
) -> SearchOutcome {
    let mut rng = StdRng::seed_from_u64(config.parameters.seed);
    let method = config.parameters.method;
    debug!(
        "Starting {method:?} search from a plan costing {}",
        start_objective.value()
    );

    let outcome = SearchOutcome::unchanged(start, start_objective);
    let mut iterations = 0;
    let mut converged = false;
    let mut trace = Vec::new();

    let outcome = if matches!(method, SearchMethod::Tabu | SearchMethod::TabuThenAnnealing) {
        let mut search = TabuSearch::new(config);
        let result = search.run(outcome.variables, outcome.objective, &mut rng, cancellation);
        iterations += result.iterations;
        converged |= result.state == SearchState::Converged;
        trace.extend_from_slice(&result.trace);
        result
    } else {
        outcome
    };

    let outcome = if matches!(
        method,
        SearchMethod::Annealing | SearchMethod::TabuThenAnnealing
    ) {
        let search = SimulatedAnnealing::new(config);
        let result = search.run(outcome.variables, outcome.objective, &mut rng, cancellation);
        iterations += result.iterations;
        converged |= result.state == SearchState::Converged;
        trace.extend_from_slice(&result.trace);
        result
    } else {
        outcome
    };

    let improved = outcome.objective < start_objective;
    let state = SearchState::finish(improved, converged);
    debug!(
        "{method:?} search finished after {iterations} iteration(s) in state {state}: cost {}",
        outcome.objective.value()
    );

    SearchOutcome {
        variables: outcome.variables,
        objective: outcome.objective,
        iterations,
        state,
        trace,
    }
}
