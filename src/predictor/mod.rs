//! Recursive spike-train predictor.
//!
//! - `config`: parameter set and validation
//! - `recursive`: trace/statistics recurrence and the gain-matrix solve
//! - `linalg`: outer product, ridge term, Cholesky-based weight solve

mod config;
mod linalg;
mod recursive;


pub use config::PredictorConfig;
pub use recursive::{PredictorSnapshot, RecursivePredictor, StepKind};
