//! The objective function: the total system cost of a plan.
use crate::configuration::ConstraintConfiguration;
use crate::units::Money;
use crate::variables::{DecisionVariables, PlanKey};

/// The total cost of a plan, split by source
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CostBreakdown {
    /// Capital cost of new capacity
    pub investment: Money,
    /// Variable cost of running all operational capacity for a full year
    pub operating: Money,
    /// Cost of load shedding and of missing reserve margin and RPS targets
    pub penalties: Money,
}

impl CostBreakdown {
    /// The total cost
    pub fn total(&self) -> Money {
        self.investment + self.operating + self.penalties
    }
}

/// Break down the cost of a plan.
///
/// Derived variables must be up to date (see [`DecisionVariables::refresh`]).
pub fn evaluate_breakdown(
    variables: &DecisionVariables,
    config: &ConstraintConfiguration,
) -> CostBreakdown {
    let mut cost = CostBreakdown::default();

    for key in variables.keys() {
        let technology = &config.technologies[key.technology];
        cost.investment += technology.capital_cost * variables.investment(key);
        cost.operating += technology.variable_cost * variables.operational(key).annual_energy();
    }

    let params = &config.parameters;
    for zone in 0..config.zones.len() {
        for year in config.horizon.indices() {
            cost.penalties += params.load_shedding_penalty * variables.load_shedding(zone, year)
                + params.reserve_margin_penalty * variables.reserve_shortfall(zone, year)
                + params.rps_penalty * variables.rps_shortfall(zone, year);
        }
    }

    cost
}

/// The total cost of a plan
pub fn evaluate(variables: &DecisionVariables, config: &ConstraintConfiguration) -> Money {
    evaluate_breakdown(variables, config).total()
}

/// Capital cost of the capacity built for a single key
pub fn investment_cost(
    variables: &DecisionVariables,
    config: &ConstraintConfiguration,
    key: PlanKey,
) -> Money {
    config.technologies[key.technology].capital_cost * variables.investment(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::configuration;
    use crate::units::{Capacity, Dimensionless, MoneyPerCapacity, MoneyPerEnergy};
    use float_cmp::approx_eq;
    use rstest::rstest;

    fn plan_with_investment(config: &ConstraintConfiguration) -> DecisionVariables {
        let mut vars = DecisionVariables::new(config);
        vars.set_investment(PlanKey::new(0, 0, 2), Capacity(10.0));
        vars.set_investment(PlanKey::new(0, 0, 4), Capacity(20.0));
        vars.refresh(config);
        vars
    }

    #[rstest]
    fn test_evaluate_no_investment(configuration: ConstraintConfiguration) {
        let vars = DecisionVariables::new(&configuration);
        assert_eq!(evaluate(&vars, &configuration), Money(0.0));
    }

    #[rstest]
    fn test_evaluate_capital_cost(configuration: ConstraintConfiguration) {
        let vars = plan_with_investment(&configuration);
        let cost = evaluate_breakdown(&vars, &configuration);
        assert_eq!(cost.investment, Money(30_000_000.0));
        assert_eq!(cost.operating, Money(0.0));
        assert_eq!(cost.penalties, Money(0.0));
        assert_eq!(cost.total(), Money(30_000_000.0));
        assert_eq!(
            investment_cost(&vars, &configuration, PlanKey::new(0, 0, 4)),
            Money(20_000_000.0)
        );
    }

    #[rstest]
    fn test_evaluate_operating_cost(mut configuration: ConstraintConfiguration) {
        configuration.technologies["gas_ccgt"].variable_cost = MoneyPerEnergy(1.0);
        let vars = DecisionVariables::new(&configuration);

        // 2000 MW running for 8760 hours, in each of 5 years
        assert_eq!(
            evaluate(&vars, &configuration),
            Money(2000.0 * 8760.0 * 5.0)
        );
    }

    #[rstest]
    fn test_evaluate_penalties(mut configuration: ConstraintConfiguration) {
        configuration.zones["north"].existing_capacity["gas_ccgt"] = Capacity(1000.0);
        configuration.reserve_margin = Dimensionless(0.0);
        configuration.parameters.reserve_margin_penalty = MoneyPerCapacity(0.0);
        let vars = DecisionVariables::new(&configuration);

        // Unserved demand in years 1 to 4
        let unserved: f64 = (1..5).map(|y| 1000.0 * 1.05f64.powi(y) - 1000.0).sum();
        assert!(approx_eq!(
            f64,
            evaluate(&vars, &configuration).value(),
            unserved * 500_000.0,
            epsilon = 1e-3
        ));
    }

    #[rstest]
    fn test_evaluate_is_pure(configuration: ConstraintConfiguration) {
        let vars = plan_with_investment(&configuration);
        let before = vars.clone();
        let first = evaluate(&vars, &configuration);
        let second = evaluate(&vars, &configuration);
        assert_eq!(first, second);
        assert_eq!(vars, before);
    }

    #[rstest]
    fn test_evaluate_monotonic_in_capital_cost(configuration: ConstraintConfiguration) {
        let vars = plan_with_investment(&configuration);
        let base = evaluate(&vars, &configuration);

        let mut dearer = configuration.clone();
        dearer.technologies["gas_ccgt"].capital_cost = MoneyPerCapacity(1_500_000.0);
        assert!(evaluate(&vars, &dearer) > base);
    }
}
