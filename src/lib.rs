#![deny(unreachable_pub)]

// Core modules
mod consts;
mod errors;

// Feature modules
pub mod infra;
pub mod predictor;
pub mod signal;
pub mod simulation;

// Re-exports
pub use consts::{
    DEFAULT_DT, DEFAULT_DURATION, DEFAULT_GAMMA, DEFAULT_LAMBDA, DEFAULT_N_INPUTS, DEFAULT_TAU,
};
pub use errors::PredictorError;
pub use infra::logging::{init_logging, LogConfig, LogFormat};
pub use predictor::{PredictorConfig, PredictorSnapshot, RecursivePredictor, StepKind};
pub use signal::{spike_signal, time_grid, SpikeRaster, SpikeTrainConfig};
pub use simulation::{
    MatrixSeries, RunSummary, SeriesRecorder, Simulation, SimulationConfig, SimulationOutput,
    VectorSeries,
};
