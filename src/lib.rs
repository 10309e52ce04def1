//! Supply-chain-constrained generation expansion planning.
//!
//! Given a description of the materials, components, technologies and zones of a power system, an
//! [`ExpansionPlanner`](planner::ExpansionPlanner) finds a low-cost plan for building new
//! generating capacity which respects the limits of the supply chain.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod analysis;
pub mod cache;
pub mod candidate;
pub mod cli;
pub mod component;
pub mod configuration;
pub mod error;
pub mod id;
pub mod input;
pub mod log;
pub mod material;
pub mod metaheuristic;
pub mod objective;
pub mod planner;
pub mod scenario;
pub mod settings;
pub mod solution;
pub mod technology;
pub mod units;
pub mod validation;
pub mod variables;
pub mod zone;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// Falls back on the current directory if the platform config dir cannot be determined.
pub fn get_scgep_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        return PathBuf::from(".");
    };
    config_dir.push("scgep");

    config_dir
}
