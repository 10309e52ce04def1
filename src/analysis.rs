//! Analysis of a solved plan: which resources constrain it and how sensitive its cost is to them.
pub mod bottleneck;
pub mod sensitivity;
pub use bottleneck::{
    BottleneckRecord, BottleneckReport, Resource, TechnologyDelay, analyse_bottlenecks,
    critical_path,
};
pub use sensitivity::{SensitivityReport, analyse_sensitivity};

/// How close a resource is to being exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    /// Less than 75% used
    Low,
    /// Less than 90% used
    Moderate,
    /// Less than 95% used
    High,
    /// 95% or more used
    Critical,
}

impl Severity {
    /// Classify the peak utilisation of a resource
    pub fn from_utilisation(utilisation: f64) -> Self {
        if utilisation < 0.75 {
            Self::Low
        } else if utilisation < 0.90 {
            Self::Moderate
        } else if utilisation < 0.95 {
            Self::High
        } else {
            Self::Critical
        }
    }
}
