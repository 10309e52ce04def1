//! The public entry point for solving capacity expansion problems.
//!
//! A solve validates the configuration, applies the requested scenario to a private copy of it,
//! looks for a cached plan to warm-start from, falls back to generating an initial plan and then
//! refines the plan with local search.
use crate::analysis::{
    BottleneckReport, SensitivityReport, analyse_bottlenecks, analyse_sensitivity, critical_path,
};
use crate::cache::{WarmStartCache, describe};
use crate::candidate::generate_candidate;
use crate::configuration::ConstraintConfiguration;
use crate::error::SolveError;
use crate::metaheuristic::{CancellationToken, SearchState, optimise};
use crate::objective::evaluate;
use crate::scenario::{Scenario, ScenarioID};
use crate::solution::{Convergence, Solution};
use crate::validation::validate;
use crate::variables::DecisionVariables;
use indexmap::IndexMap;
use log::{debug, info, warn};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// The results of solving several scenarios
#[derive(Debug, Clone, Default)]
pub struct MultiScenarioResults {
    /// Solutions for the scenarios which were solved, in the order requested
    pub solutions: IndexMap<ScenarioID, Solution>,
    /// Messages for the scenarios which could not be solved
    pub failures: IndexMap<ScenarioID, String>,
}

/// Solves capacity expansion problems, sharing a cache of recent plans between solves
#[derive(Debug, Clone, Default)]
pub struct ExpansionPlanner {
    cache: Arc<WarmStartCache>,
    cancellation: CancellationToken,
    num_threads: usize,
}

impl ExpansionPlanner {
    /// Create a planner with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given cache for warm starts
    pub fn with_cache(mut self, cache: Arc<WarmStartCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Solve multiple scenarios on this many threads (0 lets the thread pool decide)
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Use the given token to cancel solves.
    ///
    /// Cancellation cannot be undone: once the token is cancelled, every later solve by this
    /// planner (or any planner sharing the token) skips local search. Use a fresh token to solve
    /// again.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// The cache used for warm starts
    pub fn cache(&self) -> &Arc<WarmStartCache> {
        &self.cache
    }

    /// The token which cancels running solves (see [`ExpansionPlanner::with_cancellation`])
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Solve the base configuration from scratch.
    ///
    /// The cache is neither read nor written.
    pub fn solve(&self, config: &ConstraintConfiguration) -> Result<Solution, SolveError> {
        check_configuration(config)?;
        Ok(self.run(config.clone(), None, false))
    }

    /// Solve the base configuration or a named scenario, starting from a cached plan if a recent
    /// one is available.
    pub fn solve_with_warm_start(
        &self,
        config: &ConstraintConfiguration,
        scenario_id: Option<&str>,
    ) -> Result<Solution, SolveError> {
        check_configuration(config)?;
        let Some(id) = scenario_id else {
            return Ok(self.run(config.clone(), None, true));
        };

        let scenario = config
            .scenarios
            .get(id)
            .ok_or_else(|| SolveError::InvalidScenarioReference(id.to_string()))?;
        Ok(self.run(scenario.apply(config), Some(scenario.id.clone()), true))
    }

    /// Solve several scenarios concurrently.
    ///
    /// Every scenario ID is checked before any solve starts. A scenario which fails does not
    /// stop the others: its failure is recorded in the results instead.
    pub fn solve_multi_scenario(
        &self,
        config: &ConstraintConfiguration,
        scenario_ids: &[&str],
    ) -> Result<MultiScenarioResults, SolveError> {
        check_configuration(config)?;
        let mut scenarios = Vec::new();
        for id in scenario_ids {
            let scenario = config
                .scenarios
                .get(*id)
                .ok_or_else(|| SolveError::InvalidScenarioReference((*id).to_string()))?;
            if !scenarios.iter().any(|seen: &&Scenario| seen.id == scenario.id) {
                scenarios.push(scenario);
            }
        }
        info!("Solving {} scenario(s)", scenarios.len());

        Ok(self.solve_each(&scenarios, |scenario| {
            self.run(scenario.apply(config), Some(scenario.id.clone()), true)
        }))
    }

    /// Run `solve` for every scenario on the planner's thread pool.
    ///
    /// A panic in one solve is recorded as a failure for that scenario and does not affect the
    /// others.
    fn solve_each<F>(&self, scenarios: &[&Scenario], solve: F) -> MultiScenarioResults
    where
        F: Fn(&Scenario) -> Solution + Sync,
    {
        let solve_all = || {
            scenarios
                .par_iter()
                .map(|scenario| {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| solve(*scenario)));
                    (scenario.id.clone(), result.map_err(panic_message))
                })
                .collect::<Vec<_>>()
        };
        let outcomes = match ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build()
        {
            Ok(pool) => pool.install(solve_all),
            Err(err) => {
                warn!("Failed to create thread pool ({err}); using the global pool");
                solve_all()
            }
        };

        let mut results = MultiScenarioResults::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(solution) => {
                    results.solutions.insert(id, solution);
                }
                Err(message) => {
                    warn!("Scenario {id} failed: {message}");
                    results.failures.insert(id, message);
                }
            }
        }

        results
    }

    /// Find the resources which constrain a solution's plan
    pub fn analyse_bottlenecks(&self, solution: &Solution) -> BottleneckReport {
        analyse_bottlenecks(&solution.variables, &solution.config)
    }

    /// Find the resources which constrain a solution's plan and how sensitive its cost is to the
    /// supply of each material.
    ///
    /// The baseline and each perturbed material are solved from scratch, so the result does not
    /// depend on whether `solution` was warm-started.
    pub fn analyse_bottlenecks_with_sensitivity(&self, solution: &Solution) -> SensitivityReport {
        let bottlenecks = self.analyse_bottlenecks(solution);
        // Compare like with like: the solution may have been warm-started
        let baseline = self
            .run((*solution.config).clone(), None, false)
            .objective_value;
        let sensitivity = analyse_sensitivity(&solution.config, baseline, |perturbed| {
            self.run(perturbed.clone(), None, false).objective_value
        });
        let critical_path = critical_path(&bottlenecks, &solution.config);

        SensitivityReport {
            bottlenecks,
            sensitivity,
            critical_path,
        }
    }

    /// A cached plan for the scenario which fits and is feasible under `config`
    fn warm_start(
        &self,
        config: &ConstraintConfiguration,
        scenario_id: Option<&ScenarioID>,
    ) -> Option<DecisionVariables> {
        let name = describe(scenario_id);
        let Some(entry) = self.cache.get(scenario_id) else {
            debug!("No cached plan for {name}");
            return None;
        };
        if !entry.variables.matches(config) {
            debug!("Cached plan for {name} does not fit the configuration");
            return None;
        }

        let mut variables = entry.variables;
        variables.refresh(config);
        if validate(&variables, config).is_feasible() {
            debug!("Warm-starting {name} from a cached plan");
            Some(variables)
        } else {
            debug!("Cached plan for {name} is no longer feasible");
            None
        }
    }

    /// Solve an already validated configuration
    fn run(
        &self,
        config: ConstraintConfiguration,
        scenario_id: Option<ScenarioID>,
        use_cache: bool,
    ) -> Solution {
        let start = Instant::now();
        let name = describe(scenario_id.as_ref());
        info!("Solving {name}");

        let warm_start = if use_cache {
            self.warm_start(&config, scenario_id.as_ref())
        } else {
            None
        };
        let warm_started = warm_start.is_some();

        let (variables, iterations) = if let Some(variables) = warm_start {
            (variables, 0)
        } else {
            let candidate = generate_candidate(&config, &self.cancellation);
            if !candidate.feasible {
                let objective_value = evaluate(&candidate.variables, &config);
                warn!(
                    "No feasible plan found for {name} after {} iteration(s): {} constraint(s) \
                    violated",
                    candidate.iterations,
                    candidate.violations.len()
                );
                return Solution {
                    scenario_id,
                    objective_value,
                    variables: candidate.variables,
                    feasible: false,
                    solve_time: start.elapsed(),
                    iterations: candidate.iterations,
                    convergence: Convergence::Infeasible,
                    search_state: SearchState::Initialized,
                    warm_started: false,
                    violations: candidate.violations,
                    config: Arc::new(config),
                };
            }
            (candidate.variables, candidate.iterations)
        };

        let start_objective = evaluate(&variables, &config);
        let outcome = optimise(&config, variables, start_objective, &self.cancellation);
        let solution = Solution {
            scenario_id,
            objective_value: outcome.objective,
            variables: outcome.variables,
            feasible: true,
            solve_time: start.elapsed(),
            iterations: iterations + outcome.iterations,
            convergence: Convergence::classify(true, outcome.objective),
            search_state: outcome.state,
            warm_started,
            violations: Vec::new(),
            config: Arc::new(config),
        };
        info!(
            "Solved {name} in {:.2}s: cost {:.0} ({})",
            solution.solve_time.as_secs_f64(),
            solution.objective_value.value(),
            solution.convergence
        );

        if use_cache {
            self.cache.put(&solution);
        }

        solution
    }
}

/// Reject a structurally invalid configuration
fn check_configuration(config: &ConstraintConfiguration) -> Result<(), SolveError> {
    config
        .validate()
        .map_err(|err| SolveError::invalid_configuration(&err))
}

/// The message carried by a panic
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Solve panicked".to_string()
    }
}
