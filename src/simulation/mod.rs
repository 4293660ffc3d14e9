//! Simulation driver and output recording.
//!
//! - `runner`: generates the spike raster and steps the predictor through it
//! - `recorder`: per-step series of predictions and predictor state

mod recorder;
mod runner;

pub use recorder::{MatrixSeries, SeriesRecorder, VectorSeries};
pub use runner::{RunSummary, Simulation, SimulationConfig, SimulationOutput};
