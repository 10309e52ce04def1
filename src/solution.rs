//! The result of a solve.
use crate::configuration::ConstraintConfiguration;
use crate::metaheuristic::SearchState;
use crate::objective::{CostBreakdown, evaluate_breakdown};
use crate::scenario::ScenarioID;
use crate::units::Money;
use crate::validation::Violation;
use crate::variables::DecisionVariables;
use std::sync::Arc;
use std::time::Duration;

/// How a solve ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Convergence {
    /// A feasible plan with zero cost, which is the lowest cost possible
    Optimal,
    /// A feasible plan was found
    Feasible,
    /// No feasible plan was found
    Infeasible,
    /// The cost of the plan is not finite
    Unbounded,
}

impl Convergence {
    /// Classify the outcome of a solve
    pub fn classify(feasible: bool, objective_value: Money) -> Self {
        if !feasible {
            Self::Infeasible
        } else if !objective_value.is_finite() {
            Self::Unbounded
        } else if objective_value.value() <= 0.0 {
            Self::Optimal
        } else {
            Self::Feasible
        }
    }
}

/// A capacity expansion plan and information about how it was found
#[derive(Debug, Clone)]
pub struct Solution {
    /// The scenario solved for, if any
    pub scenario_id: Option<ScenarioID>,
    /// The total cost of the plan
    pub objective_value: Money,
    /// The plan itself
    pub variables: DecisionVariables,
    /// Whether the plan satisfies every constraint
    pub feasible: bool,
    /// Wall-clock time taken by the solve
    pub solve_time: Duration,
    /// Total iterations across candidate generation and local search
    pub iterations: u32,
    /// How the solve ended
    pub convergence: Convergence,
    /// The final state of the local search
    pub search_state: SearchState,
    /// Whether the search started from a cached plan
    pub warm_started: bool,
    /// Constraints violated by the plan (empty if feasible)
    pub violations: Vec<Violation>,
    /// The configuration the plan was found for, with any scenario applied
    pub config: Arc<ConstraintConfiguration>,
}

impl Solution {
    /// The cost of the plan, split by source
    pub fn cost_breakdown(&self) -> CostBreakdown {
        evaluate_breakdown(&self.variables, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, 10.0, Convergence::Infeasible)]
    #[case(false, 0.0, Convergence::Infeasible)]
    #[case(true, f64::INFINITY, Convergence::Unbounded)]
    #[case(true, f64::NAN, Convergence::Unbounded)]
    #[case(true, 0.0, Convergence::Optimal)]
    #[case(true, 10.0, Convergence::Feasible)]
    fn test_classify(
        #[case] feasible: bool,
        #[case] objective: f64,
        #[case] expected: Convergence,
    ) {
        assert_eq!(Convergence::classify(feasible, Money(objective)), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(Convergence::Infeasible.to_string(), "infeasible");
    }
}
