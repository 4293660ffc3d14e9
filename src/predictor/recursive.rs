//! Event-gated recursive linear predictor over decaying spike traces.
//!
//! Each step is either a decay-only step or a spike-event step:
//!
//! ```text
//! x      ← x · decay
//! mean   ← γ·mean + (1−γ)·x                         (spike step, mean-centering on)
//! z⁻     = x − mean
//! x      ← x + s·(1−decay)/dt
//! z⁺     = z⁻ + s·(1−decay)/dt
//! C_xz   ← γ·C_xz + (1−γ)·s z⁻ᵀ                      (spike step)
//! C_zz   ← γ·C_zz + (1−γ)·(z⁺ z⁺ᵀ + λI)              (spike step)
//! P      = C_xz · C_zz⁻¹                             (spike step)
//! ```
//!
//! Between spikes only the trace moves; the statistics and the gain matrix
//! stay frozen so silent stretches do not dilute them.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::{trace, warn};

use super::config::PredictorConfig;
use super::linalg::{outer, ridge, solve_weights};
use crate::errors::PredictorError;
use crate::infra::logging::targets;

/// Outcome of a successful [`RecursivePredictor::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// No channel spiked: only the trace decayed.
    DecayOnly,
    /// At least one channel spiked: statistics and weights were refreshed.
    SpikeEvent,
}

impl StepKind {
    pub fn is_spike(self) -> bool {
        matches!(self, StepKind::SpikeEvent)
    }
}

/// Copy of the predictor state at one step, for external logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictorSnapshot {
    pub step: u64,
    pub trace: DVector<f64>,
    pub mean: DVector<f64>,
    pub centered_trace: DVector<f64>,
    pub covariance: DMatrix<f64>,
    pub cross_covariance: DMatrix<f64>,
    pub weights: DMatrix<f64>,
}

/// Online linear predictor for multichannel point-process data.
///
/// Owns all recurrence state exclusively. `update` takes `&mut self`, so
/// shared use across threads needs an external lock.
#[derive(Debug, Clone)]
pub struct RecursivePredictor {
    config: PredictorConfig,
    /// Per-step trace decay `exp(-dt/τ)`, fixed at construction.
    decay: f64,
    /// Trace increment per unit event, `(1 − decay)/dt`.
    increment_scale: f64,
    /// Trace vector.
    x: DVector<f64>,
    /// Event-triggered mean of the pre-spike trace.
    mean: DVector<f64>,
    /// Latest post-increment centered trace.
    z: DVector<f64>,
    /// Ridge-regularised covariance of the centered trace.
    cov: DMatrix<f64>,
    /// Cross-covariance of events with the pre-spike centered trace.
    cross_cov: DMatrix<f64>,
    /// Gain matrix `cross_cov · cov⁻¹`.
    weights: DMatrix<f64>,
    /// Successful updates so far.
    step: u64,
    /// Successful spike-event updates so far.
    spike_steps: u64,
}

impl RecursivePredictor {
    /// Create a predictor from a validated configuration.
    pub fn new(config: PredictorConfig) -> Result<Self, PredictorError> {
        config.validate()?;

        let n = config.n_inputs;
        let decay = config.decay();
        Ok(Self {
            decay,
            increment_scale: (1.0 - decay) / config.dt,
            x: DVector::zeros(n),
            mean: DVector::zeros(n),
            z: DVector::zeros(n),
            cov: DMatrix::zeros(n, n),
            cross_cov: DMatrix::zeros(n, n),
            weights: ridge(n, config.lambda),
            step: 0,
            spike_steps: 0,
            config,
        })
    }

    /// Positional constructor: channels, γ, τ, λ, dt, mean-centering flag.
    pub fn with_params(
        n_inputs: usize,
        gamma: f64,
        tau: f64,
        lambda: f64,
        dt: f64,
        estimate_mean: bool,
    ) -> Result<Self, PredictorError> {
        Self::new(PredictorConfig {
            n_inputs,
            gamma,
            tau,
            lambda,
            dt,
            estimate_mean,
        })
    }

    /// Advance the state by one time step.
    ///
    /// `events` holds one non-negative count per channel. The call either
    /// commits the whole step or returns an error with the state untouched.
    pub fn update(&mut self, events: &[f64]) -> Result<StepKind, PredictorError> {
        let n = self.config.n_inputs;
        if events.len() != n {
            return Err(PredictorError::dimension_mismatch(n, events.len()));
        }
        if let Some((channel, &value)) = events
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(PredictorError::InvalidEvent { channel, value });
        }

        let gamma = self.config.gamma;
        let events = DVector::from_column_slice(events);
        let spiked = events.iter().any(|&e| e > 0.0);
        let step = self.step + 1;

        let x_decayed = &self.x * self.decay;

        // Mean tracks the pre-increment trace, only on spike steps
        let new_mean = (self.config.estimate_mean && spiked)
            .then(|| &self.mean * gamma + &x_decayed * (1.0 - gamma));
        let mean = new_mean.as_ref().unwrap_or(&self.mean);

        let z_pre = &x_decayed - mean;
        let increment = &events * self.increment_scale;
        let x = x_decayed + &increment;
        let z_post = &z_pre + &increment;

        if spiked {
            let cross_cov = &self.cross_cov * gamma + outer(&events, &z_pre) * (1.0 - gamma);
            let cov = &self.cov * gamma
                + (outer(&z_post, &z_post) + ridge(n, self.config.lambda)) * (1.0 - gamma);

            let Some(weights) = solve_weights(&cross_cov, &cov, self.config.lambda == 0.0) else {
                warn!(
                    target: targets::PREDICTOR,
                    step,
                    lambda = self.config.lambda,
                    "Covariance not invertible; step rejected"
                );
                return Err(PredictorError::SingularCovariance { step });
            };

            self.cross_cov = cross_cov;
            self.cov = cov;
            self.weights = weights;
            self.spike_steps += 1;

            trace!(
                target: targets::PREDICTOR,
                step,
                spike_steps = self.spike_steps,
                events = ?events.as_slice(),
                "Spike event: statistics refreshed"
            );
        }

        if let Some(mean) = new_mean {
            self.mean = mean;
        }
        self.x = x;
        self.z = z_post;
        self.step = step;

        Ok(if spiked {
            StepKind::SpikeEvent
        } else {
            StepKind::DecayOnly
        })
    }

    /// Current prediction `P · z`.
    pub fn predict(&self) -> DVector<f64> {
        &self.weights * &self.z
    }

    /// Configuration this predictor was built with.
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Per-step trace decay factor.
    pub fn decay(&self) -> f64 {
        self.decay
    }

    pub fn trace(&self) -> &DVector<f64> {
        &self.x
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Latest post-increment centered trace `z`.
    pub fn centered_trace(&self) -> &DVector<f64> {
        &self.z
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.cov
    }

    pub fn cross_covariance(&self) -> &DMatrix<f64> {
        &self.cross_cov
    }

    /// Prediction gain matrix `P`.
    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }

    /// Number of committed updates.
    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Number of committed spike-event updates.
    pub fn spike_event_count(&self) -> u64 {
        self.spike_steps
    }

    /// Owned copy of the full state.
    pub fn snapshot(&self) -> PredictorSnapshot {
        PredictorSnapshot {
            step: self.step,
            trace: self.x.clone(),
            mean: self.mean.clone(),
            centered_trace: self.z.clone(),
            covariance: self.cov.clone(),
            cross_covariance: self.cross_cov.clone(),
            weights: self.weights.clone(),
        }
    }
}
