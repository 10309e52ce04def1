//! A cache of recent plans, used to warm-start later solves of the same scenario.
//!
//! Entries expire after a fixed time to live. The cache is shared between the threads of a
//! multi-scenario run, so it is backed by a sharded concurrent map.
use crate::scenario::ScenarioID;
use crate::solution::Solution;
use crate::units::Money;
use crate::variables::DecisionVariables;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::trace;

/// How long a cached plan remains usable
pub const DEFAULT_TTL: Duration = Duration::hours(1);

/// A cached plan
#[derive(Debug, Clone)]
pub struct WarmStartEntry {
    /// The scenario the plan was found for (`None` for the base configuration)
    pub scenario_id: Option<ScenarioID>,
    /// The plan
    pub variables: DecisionVariables,
    /// The cost of the plan when it was cached
    pub objective: Money,
    /// When the plan was cached
    pub timestamp: DateTime<Utc>,
}

impl WarmStartEntry {
    /// Whether the entry is still usable at time `now`
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.timestamp < ttl
    }
}

/// Recent plans keyed by scenario
#[derive(Debug)]
pub struct WarmStartCache {
    entries: DashMap<Option<ScenarioID>, WarmStartEntry>,
    ttl: Duration,
}

impl Default for WarmStartCache {
    fn default() -> Self {
        Self::new()
    }
}

impl WarmStartCache {
    /// Create an empty cache with the default time to live
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create an empty cache whose entries expire after `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// The time to live for entries
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up the plan for a scenario, if there is one which hasn't expired
    pub fn get(&self, scenario_id: Option<&ScenarioID>) -> Option<WarmStartEntry> {
        self.get_at(scenario_id, Utc::now())
    }

    /// Look up the plan for a scenario as of time `now`
    pub fn get_at(
        &self,
        scenario_id: Option<&ScenarioID>,
        now: DateTime<Utc>,
    ) -> Option<WarmStartEntry> {
        let entry = self.entries.get(&scenario_id.cloned())?;
        if entry.is_fresh(now, self.ttl) {
            Some(entry.clone())
        } else {
            trace!("Cached plan for {} has expired", describe(scenario_id));
            None
        }
    }

    /// Store the plan from a solution, replacing any existing entry for the scenario
    pub fn put(&self, solution: &Solution) {
        self.put_at(solution, Utc::now());
    }

    /// Store the plan from a solution with the given timestamp
    pub fn put_at(&self, solution: &Solution, timestamp: DateTime<Utc>) {
        let entry = WarmStartEntry {
            scenario_id: solution.scenario_id.clone(),
            variables: solution.variables.clone(),
            objective: solution.objective_value,
            timestamp,
        };
        self.entries.insert(solution.scenario_id.clone(), entry);
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove entries which have expired as of now, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    /// Remove entries which have expired as of time `now`
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        before - self.entries.len()
    }

    /// Number of entries, including expired ones which haven't been purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A human-readable name for a cache key
pub(crate) fn describe(scenario_id: Option<&ScenarioID>) -> String {
    scenario_id.map_or_else(|| "base configuration".to_string(), |id| format!("scenario {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ConstraintConfiguration;
    use crate::fixture::configuration;
    use crate::metaheuristic::SearchState;
    use crate::solution::Convergence;
    use rstest::{fixture, rstest};
    use std::sync::Arc;

    #[fixture]
    fn solution(configuration: ConstraintConfiguration) -> Solution {
        Solution {
            scenario_id: Some("high_demand".into()),
            objective_value: Money(42.0),
            variables: DecisionVariables::new(&configuration),
            feasible: true,
            solve_time: std::time::Duration::ZERO,
            iterations: 1,
            convergence: Convergence::Feasible,
            search_state: SearchState::Exhausted,
            warm_started: false,
            violations: Vec::new(),
            config: Arc::new(configuration),
        }
    }

    #[rstest]
    fn test_ttl(solution: Solution) {
        let cache = WarmStartCache::new();
        let now = Utc::now();
        cache.put_at(&solution, now);
        let id = solution.scenario_id.as_ref();

        let entry = cache.get_at(id, now + Duration::minutes(59)).unwrap();
        assert_eq!(entry.objective, Money(42.0));
        assert_eq!(entry.scenario_id, solution.scenario_id);
        assert!(cache.get_at(id, now + Duration::minutes(61)).is_none());
    }

    #[rstest]
    fn test_keyed_by_scenario(solution: Solution) {
        let cache = WarmStartCache::new();
        cache.put(&solution);
        assert!(cache.get(None).is_none());
        assert!(cache.get(Some(&"other".into())).is_none());
        assert!(cache.get(solution.scenario_id.as_ref()).is_some());
    }

    #[rstest]
    fn test_put_overwrites(mut solution: Solution) {
        let cache = WarmStartCache::new();
        let now = Utc::now();
        cache.put_at(&solution, now - Duration::hours(2));
        solution.objective_value = Money(7.0);
        cache.put_at(&solution, now);

        assert_eq!(cache.len(), 1);
        let entry = cache.get_at(solution.scenario_id.as_ref(), now).unwrap();
        assert_eq!(entry.objective, Money(7.0));
    }

    #[rstest]
    fn test_purge_expired_and_clear(mut solution: Solution) {
        let cache = WarmStartCache::new();
        let now = Utc::now();
        cache.put_at(&solution, now - Duration::hours(2));
        solution.scenario_id = None;
        cache.put_at(&solution, now);

        assert_eq!(cache.purge_expired_at(now), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at(None, now).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(None), "base configuration");
        assert_eq!(describe(Some(&"shock".into())), "scenario shock");
    }
}
