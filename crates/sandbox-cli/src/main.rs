//! # Dynamics Sandbox CLI
//!
//! Command-line interface for neuron excitability runs and chaotic attractors.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sandbox_attractors::{registry, simulate_attractor, Attractor};
use sandbox_core::{Locale, PhaseSystem, PhaseTrajectory, SimulationLimits};
use sandbox_neuron::{
    count_spikes, find_rheobase, simulate_with, HhParameters, ModelType, Protocol, TestType,
    SPIKE_THRESHOLD,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sandbox")]
#[command(author = "Yatrogenesis")]
#[command(version = "0.1.0")]
#[command(about = "Dynamical-system sandbox: neuron models and chaotic attractors", long_about = None)]
struct Cli {
    /// JSON file with run limits (max_steps, min_dt)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Hodgkin-Huxley membrane constants
#[derive(Args)]
struct MembraneArgs {
    /// Sodium conductance (mS/cm^2)
    #[arg(long, default_value_t = 120.0)]
    g_na: f64,
    /// Potassium conductance (mS/cm^2)
    #[arg(long, default_value_t = 36.0)]
    g_k: f64,
    /// Leak conductance (mS/cm^2)
    #[arg(long, default_value_t = 0.3)]
    g_l: f64,
    /// Sodium reversal (mV)
    #[arg(long, default_value_t = 50.0, allow_hyphen_values = true)]
    e_na: f64,
    /// Potassium reversal (mV)
    #[arg(long, default_value_t = -77.0, allow_hyphen_values = true)]
    e_k: f64,
    /// Leak reversal (mV)
    #[arg(long, default_value_t = -54.4, allow_hyphen_values = true)]
    e_l: f64,
    /// Membrane capacitance (uF/cm^2)
    #[arg(long, default_value_t = 1.0)]
    cm: f64,
}

impl From<&MembraneArgs> for HhParameters {
    fn from(args: &MembraneArgs) -> Self {
        Self {
            g_na: args.g_na,
            g_k: args.g_k,
            g_l: args.g_l,
            e_na: args.e_na,
            e_k: args.e_k,
            e_l: args.e_l,
            cm: args.cm,
        }
    }
}

/// Label language for `list`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Lang {
    En,
    Ru,
}

impl From<Lang> for Locale {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::En => Locale::En,
            Lang::Ru => Locale::Ru,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a neuron model
    Neuron {
        /// Model: hh, fhn or hr
        #[arg(short, long, default_value = "hh")]
        model: ModelType,
        /// Test type: excitability, rheobase or threshold
        #[arg(short, long, default_value = "excitability")]
        test: TestType,
        /// Injected current (model default if omitted)
        #[arg(short = 'i', long, allow_hyphen_values = true)]
        current: Option<f64>,
        /// Duration (ms)
        #[arg(long, default_value_t = 100.0)]
        duration: f64,
        /// Time step (ms)
        #[arg(long, default_value_t = 0.01)]
        dt: f64,
        #[command(flatten)]
        membrane: MembraneArgs,
        /// Cap on printed samples
        #[arg(long, default_value_t = 1000)]
        max_points: usize,
        /// Print the trace as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a chaotic attractor
    Attractor {
        /// System name (see `list`)
        name: String,
        /// Comma-separated parameters (descriptor defaults if omitted)
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        params: Vec<f64>,
        /// Comma-separated initial state (descriptor defaults if omitted)
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        state: Vec<f64>,
        /// Total time
        #[arg(long, default_value_t = 100.0)]
        time: f64,
        /// Time step
        #[arg(long, default_value_t = 0.01)]
        dt: f64,
        /// Print the flat point sequence as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bisect the Hodgkin-Huxley rheobase
    Rheobase {
        /// Lower current bound (must not fire)
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        low: f64,
        /// Upper current bound (must fire)
        #[arg(long, default_value_t = 10.0)]
        high: f64,
        /// Bracket width to stop at
        #[arg(long, default_value_t = 0.01)]
        tolerance: f64,
        /// Duration of each trial (ms)
        #[arg(long, default_value_t = 100.0)]
        duration: f64,
        /// Time step (ms)
        #[arg(long, default_value_t = 0.01)]
        dt: f64,
        #[command(flatten)]
        membrane: MembraneArgs,
    },

    /// List available systems and models
    List {
        /// Label language
        #[arg(long, value_enum, default_value_t = Lang::En)]
        lang: Lang,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let limits = match &cli.config {
        Some(path) => SimulationLimits::from_json_file(path)?,
        None => SimulationLimits::default(),
    };
    log::debug!("Run limits: {:?}", limits);

    match cli.command {
        Commands::Neuron {
            model,
            test,
            current,
            duration,
            dt,
            membrane,
            max_points,
            json,
        } => {
            let steps = limits.check(duration, dt)?;
            let protocol = Protocol {
                duration,
                dt,
                i_ext: current,
            };
            let params = HhParameters::from(&membrane);
            let trajectory = simulate_with(model, test, &params, &protocol)?;

            if json {
                println!("{}", serde_json::to_string(&trajectory.downsample(max_points))?);
                return Ok(());
            }

            println!(
                "{} {} ({})",
                "Simulated".green().bold(),
                model.display_name(),
                test.tag().cyan()
            );
            println!(
                "  I_ext: {}  steps: {}  dt: {} ms",
                current.unwrap_or_else(|| model.default_current()),
                steps,
                dt
            );
            match trajectory.max_voltage() {
                Some(peak) => println!("  Peak voltage: {:.2} mV", peak),
                None => println!("  {}", "No finite samples".yellow()),
            }
            println!("  Spikes (> {} mV): {}", SPIKE_THRESHOLD, count_spikes(&trajectory, SPIKE_THRESHOLD));
        }

        Commands::Attractor {
            name,
            params,
            state,
            time,
            dt,
            json,
        } => {
            limits.check(time, dt)?;
            let system: Attractor = name.parse()?;
            let params = if params.is_empty() { system.default_params() } else { params };
            let state = if state.is_empty() { system.default_state() } else { state };

            let trajectory = simulate_attractor(&name, &params, &state, time, dt)?;

            if json {
                println!("{}", serde_json::to_string(&trajectory)?);
                return Ok(());
            }

            println!("{} {}", "Integrated".green().bold(), system.descriptor().label.en);
            println!("  Params: {:?}", params);
            println!("  Initial state: {:?}", state);
            print_bounds(system, &trajectory);
        }

        Commands::Rheobase {
            low,
            high,
            tolerance,
            duration,
            dt,
            membrane,
        } => {
            limits.check(duration, dt)?;
            let protocol = Protocol {
                duration,
                dt,
                i_ext: None,
            };

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            spinner.set_message(format!("Bisecting rheobase in [{}, {}]", low, high));
            spinner.enable_steady_tick(Duration::from_millis(100));

            let result = find_rheobase(&HhParameters::from(&membrane), &protocol, low, high, tolerance);
            spinner.finish_and_clear();

            let rheobase = result?;
            println!(
                "{} {:.4} uA/cm^2 (tolerance {})",
                "Rheobase:".green().bold(),
                rheobase,
                tolerance
            );
        }

        Commands::List { lang } => {
            let locale = Locale::from(lang);

            println!("{}", "Attractor systems:".green().bold());
            for descriptor in registry() {
                println!(
                    "  {} - {} (scale {})",
                    descriptor.name.cyan(),
                    descriptor.label.get(locale),
                    descriptor.scale
                );
                for p in descriptor.params {
                    println!("      param {} = {} [{}, {}]", p.name, p.default_value, p.min, p.max);
                }
                for s in descriptor.state_variables {
                    println!("      state {} = {} [{}, {}]", s.name, s.default_value, s.min, s.max);
                }
            }

            println!();
            println!("{}", "Neuron models:".green().bold());
            for model in ModelType::all() {
                println!(
                    "  {} - {} (default I = {})",
                    model.tag().cyan(),
                    model.display_name(),
                    model.default_current()
                );
            }
        }
    }

    Ok(())
}

fn print_bounds(system: Attractor, trajectory: &PhaseTrajectory) {
    let finite = trajectory.finite_points();
    println!("  Points: {} ({} finite)", trajectory.len(), finite.len());
    if finite.len() < trajectory.len() {
        println!("  {}", "Trajectory diverged; try a smaller dt".yellow());
    }

    for (i, var) in system.descriptor().state_variables.iter().enumerate() {
        let (min, max) = finite.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[i]), hi.max(p[i]))
        });
        if finite.is_empty() {
            println!("  {}: -", var.name);
        } else {
            println!("  {}: [{:.3}, {:.3}]", var.name, min, max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_list_lang() {
        let cli = Cli::try_parse_from(["sandbox", "list", "--lang", "ru"]).unwrap();
        assert!(matches!(cli.command, Commands::List { lang: Lang::Ru }));
        assert_eq!(Locale::from(Lang::Ru), Locale::Ru);

        let cli = Cli::try_parse_from(["sandbox", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List { lang: Lang::En }));

        assert!(Cli::try_parse_from(["sandbox", "list", "--lang", "fr"]).is_err());
    }

    #[test]
    fn test_neuron_rejects_unknown_model() {
        assert!(Cli::try_parse_from(["sandbox", "neuron", "--model", "xyz"]).is_err());
        let cli = Cli::try_parse_from(["sandbox", "neuron", "-m", "fhn", "-i", "-0.5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Neuron { model: ModelType::FitzHughNagumo, current: Some(c), .. } if c == -0.5
        ));
    }

    #[test]
    fn test_attractor_vectors() {
        let cli = Cli::try_parse_from([
            "sandbox", "attractor", "lorenz", "--params", "10,28,2.67", "--state", "-1,0,0",
        ])
        .unwrap();
        match cli.command {
            Commands::Attractor { name, params, state, .. } => {
                assert_eq!(name, "lorenz");
                assert_eq!(params, vec![10.0, 28.0, 2.67]);
                assert_eq!(state, vec![-1.0, 0.0, 0.0]);
            }
            _ => panic!("expected attractor subcommand"),
        }
    }
}
