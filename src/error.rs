//! Errors returned by the solve API.
use thiserror::Error;

/// A hard error which prevents a solve from starting.
///
/// Failing to find a feasible plan is not an error: it is reported through the returned
/// [`Solution`](crate::solution::Solution).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SolveError {
    /// The configuration is structurally invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A scenario was requested which the configuration does not define
    #[error("Unknown scenario: {0}")]
    InvalidScenarioReference(String),
}

impl SolveError {
    /// Flatten an [`anyhow::Error`] chain into an [`SolveError::InvalidConfiguration`]
    pub fn invalid_configuration(err: &anyhow::Error) -> Self {
        Self::InvalidConfiguration(format!("{err:#}"))
    }
}
