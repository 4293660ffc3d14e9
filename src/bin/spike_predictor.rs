//! Spike Predictor Driver
//!
//! Generates periodic spike trains, steps the recursive predictor through
//! them, and writes the recorded series as JSON for plotting.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin spike_predictor -- generate-config
//! cargo run --bin spike_predictor -- --config spike_predictor.toml run --output series.json
//! cargo run --bin spike_predictor -- --duration 5 --estimate-mean run
//! ```

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use spike_predictor::{
    init_logging, LogConfig, LogFormat, PredictorConfig, Simulation, SimulationConfig,
    SpikeTrainConfig,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser)]
#[command(name = "spike_predictor")]
#[command(version, about = "Recursive next-event predictor for spike trains", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "spike_predictor.toml")]
    config: String,

    /// Override simulated duration (seconds)
    #[arg(long)]
    duration: Option<f64>,

    /// Override step size (seconds)
    #[arg(long)]
    dt: Option<f64>,

    /// Override jitter seed
    #[arg(long)]
    seed: Option<u64>,

    /// Center traces by the event-triggered mean
    #[arg(long)]
    estimate_mean: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output format (pretty, json, compact)
    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a sample config file
    GenerateConfig {
        /// Output file path
        #[arg(short, long, default_value = "spike_predictor.toml")]
        output: String,
    },
    /// Validate config without running
    ValidateConfig,
    /// Run the simulation (default)
    Run {
        /// Write recorded series as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
struct AppConfig {
    #[serde(default)]
    predictor: PredictorConfig,
    #[serde(default)]
    signal: SpikeTrainConfig,
    #[serde(default)]
    simulation: SimulationConfig,
    #[serde(default)]
    logging: LogConfig,
}

impl AppConfig {
    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(duration) = cli.duration {
            self.simulation.duration = duration;
        }
        if let Some(dt) = cli.dt {
            self.predictor.dt = dt;
        }
        if cli.seed.is_some() {
            self.simulation.seed = cli.seed;
        }
        if cli.estimate_mean {
            self.predictor.estimate_mean = true;
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
        if let Some(format) = cli.log_format {
            self.logging.format = format;
        }
    }

    fn into_simulation(self) -> Result<Simulation, Box<dyn std::error::Error>> {
        Ok(Simulation::new(
            self.predictor,
            self.signal,
            self.simulation,
        )?)
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::GenerateConfig { output }) = &cli.command {
        return generate_sample_config(output);
    }

    let mut config = load_config(&cli.config)?;
    config.apply_overrides(&cli);
    let _guards = init_logging(&config.logging, None)?;

    match cli.command {
        Some(Commands::ValidateConfig) => {
            config.into_simulation()?;
            println!("Config OK: {}", cli.config);
            Ok(())
        }
        Some(Commands::Run { output }) => run(config, output.as_deref()),
        None => run(config, None),
        Some(Commands::GenerateConfig { .. }) => Ok(()),
    }
}

fn run(config: AppConfig, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let simulation = config.into_simulation()?;
    let result = match simulation.run() {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Simulation failed");
            return Err(e.into());
        }
    };

    let summary = &result.summary;
    info!(
        steps = summary.steps,
        spike_steps = summary.spike_steps,
        final_prediction = ?summary.final_prediction,
        "Run complete"
    );

    if let Some(path) = output {
        result.series.save_json(path)?;
        info!(path = %path.display(), steps = result.series.len(), "Series written");
    }
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn load_config(path: &str) -> Result<AppConfig, Box<dyn std::error::Error>> {
    if Path::new(path).exists() {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    } else {
        // Return default config if file doesn't exist
        Ok(AppConfig::default())
    }
}

fn generate_sample_config(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let sample = AppConfig::default();
    let content = toml::to_string_pretty(&sample)?;

    let with_comments = format!(
        r#"# Spike Predictor Configuration
# See: cargo run --bin spike_predictor -- --help
#
# [predictor]  gamma in [0, 1), tau > 0, lambda >= 0 (0 may yield a singular covariance)
# [signal]     one period/phase/jitter entry per channel; count must equal n_inputs
# [simulation] set `seed` for reproducible jitter

{}"#,
        content
    );

    std::fs::write(path, with_comments)?;
    println!("Sample config written to: {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spike_predictor.toml");
        let path = path.to_str().unwrap();

        generate_sample_config(path).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("# Spike Predictor Configuration"));

        let config = load_config(path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.into_simulation().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[predictor]\nn_inputs = 1\n").unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.predictor.n_inputs, 1);
        assert_eq!(
            config.predictor,
            PredictorConfig {
                n_inputs: 1,
                ..Default::default()
            }
        );
        assert_eq!(config.signal, SpikeTrainConfig::default());
        assert_eq!(config.simulation, SimulationConfig::default());
        assert_eq!(config.logging, LogConfig::default());

        // One predictor channel against three signal channels
        assert!(config.into_simulation().is_err());
    }

    #[test]
    fn test_missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[predictor\nn_inputs = ").unwrap();
        assert!(load_config(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_cli_overrides_replace_config() {
        let cli = Cli::parse_from([
            "spike_predictor",
            "--duration",
            "5",
            "--dt",
            "0.002",
            "--seed",
            "42",
            "--estimate-mean",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "run",
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(&cli);

        assert_eq!(config.simulation.duration, 5.0);
        assert_eq!(config.predictor.dt, 0.002);
        assert_eq!(config.simulation.seed, Some(42));
        assert!(config.predictor.estimate_mean);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(matches!(cli.command, Some(Commands::Run { output: None })));
    }

    #[test]
    fn test_absent_overrides_keep_config() {
        let cli = Cli::parse_from(["spike_predictor"]);
        let mut config = AppConfig::default();
        config.simulation.seed = Some(7);
        config.apply_overrides(&cli);

        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.duration, SimulationConfig::default().duration);
        assert!(!config.predictor.estimate_mean);
        assert!(cli.command.is_none());
    }
}
