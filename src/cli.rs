//! The command line interface for the planner.
use crate::analysis::{BottleneckReport, SensitivityReport};
use crate::input::load_configuration;
use crate::log;
use crate::planner::ExpansionPlanner;
use crate::settings::Settings;
use crate::solution::Solution;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the planner.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Solve the named scenario instead of the base model (may be repeated)
    #[arg(short, long = "scenario")]
    pub scenarios: Vec<String>,
    /// Whether to re-solve with perturbed material supply to estimate sensitivities
    #[arg(long)]
    pub sensitivity: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Solve a model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Settings { subcommand } => {
                subcommand.execute();
                Ok(())
            }
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    if let Some(settings) = settings {
        Ok(settings)
    } else {
        Settings::load().context("Failed to load settings.")
    }
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    log::init(Some(&settings.log_level)).context("Failed to initialise logging.")?;

    let config = load_configuration(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());

    let planner = ExpansionPlanner::new().with_num_threads(settings.num_threads);
    let solutions = if opts.scenarios.is_empty() {
        vec![planner.solve_with_warm_start(&config, None)?]
    } else {
        let ids: Vec<&str> = opts.scenarios.iter().map(String::as_str).collect();
        let results = planner.solve_multi_scenario(&config, &ids)?;
        for (id, message) in &results.failures {
            warn!("Scenario {id} could not be solved: {message}");
        }
        results.solutions.into_values().collect()
    };

    for solution in &solutions {
        report_solution(solution);
        if opts.sensitivity {
            report_sensitivity(&planner.analyse_bottlenecks_with_sensitivity(solution));
        } else {
            report_bottlenecks(&planner.analyse_bottlenecks(solution));
        }
    }
    info!("Planning complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;
    log::init(Some(&settings.log_level)).context("Failed to initialise logging.")?;

    load_configuration(model_path).context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}

/// Log a summary of a solution
fn report_solution(solution: &Solution) {
    let name = solution
        .scenario_id
        .as_ref()
        .map_or_else(|| "base model".to_string(), |id| format!("scenario {id}"));
    let cost = solution.cost_breakdown();
    info!(
        "Plan for {name}: {} after {} iteration(s) in {:.2}s",
        solution.convergence,
        solution.iterations,
        solution.solve_time.as_secs_f64()
    );
    info!(
        "Total cost {:.0} (investment {:.0}, operating {:.0}, penalties {:.0})",
        cost.total().value(),
        cost.investment.value(),
        cost.operating.value(),
        cost.penalties.value()
    );

    let config = &solution.config;
    for (key, capacity) in solution.variables.investments() {
        info!(
            "Build {:.1} MW of {} in zone {} in {}",
            capacity.value(),
            config.technologies[key.technology].id,
            config.zones[key.zone].id,
            config.horizon.year(key.year)
        );
    }

    for violation in &solution.violations {
        warn!("{violation}");
    }
}

/// Log the constrained resources and delayed technologies
fn report_bottlenecks(report: &BottleneckReport) {
    for record in report.constrained() {
        warn!("Constrained: {record}");
    }
    for delay in report
        .technology_delays
        .iter()
        .filter(|delay| delay.is_delayed())
    {
        info!("Delayed: {delay}");
    }
}

/// Log bottlenecks, sensitivities and the critical path
fn report_sensitivity(report: &SensitivityReport) {
    report_bottlenecks(&report.bottlenecks);
    for (material, elasticity) in &report.sensitivity {
        info!("Elasticity of cost with respect to {material} supply: {elasticity:.3}");
    }
    for step in &report.critical_path {
        info!("Critical path: {step}");
    }
}
