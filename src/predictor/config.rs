//! Predictor configuration.

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_DT, DEFAULT_GAMMA, DEFAULT_LAMBDA, DEFAULT_N_INPUTS, DEFAULT_TAU};
use crate::errors::PredictorError;

/// Configuration for [`RecursivePredictor`](super::RecursivePredictor).
///
/// Fixed for the lifetime of a predictor instance.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PredictorConfig {
    /// Number of input channels (dimension of every vector/matrix)
    #[serde(default = "default_n_inputs")]
    pub n_inputs: usize,

    /// EMA rate for mean, covariance and cross-covariance, in [0, 1)
    /// Closer to 1 = longer memory over spike events
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// Trace time constant (seconds), > 0
    #[serde(default = "default_tau")]
    pub tau: f64,

    /// Ridge coefficient, >= 0
    /// Zero removes the invertibility guarantee on the covariance
    #[serde(default = "default_lambda")]
    pub lambda: f64,

    /// Step size (seconds), > 0
    #[serde(default = "default_dt")]
    pub dt: f64,

    /// Center traces by an event-triggered running mean
    #[serde(default)]
    pub estimate_mean: bool,
}

fn default_n_inputs() -> usize {
    DEFAULT_N_INPUTS
}

fn default_gamma() -> f64 {
    DEFAULT_GAMMA
}

fn default_tau() -> f64 {
    DEFAULT_TAU
}

fn default_lambda() -> f64 {
    DEFAULT_LAMBDA
}

fn default_dt() -> f64 {
    DEFAULT_DT
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            n_inputs: default_n_inputs(),
            gamma: default_gamma(),
            tau: default_tau(),
            lambda: default_lambda(),
            dt: default_dt(),
            estimate_mean: false,
        }
    }
}

impl PredictorConfig {
    /// Same defaults with a different channel count.
    pub fn with_channels(n_inputs: usize) -> Self {
        Self {
            n_inputs,
            ..Default::default()
        }
    }

    /// Validate parameter ranges.
    ///
    /// Returns an error for the first violated constraint. NaN fails every
    /// range check.
    pub fn validate(&self) -> Result<(), PredictorError> {
        if self.n_inputs == 0 {
            return Err(PredictorError::invalid_config(
                "n_inputs",
                "must be >= 1, got 0",
            ));
        }
        if !(self.gamma >= 0.0 && self.gamma < 1.0) {
            return Err(PredictorError::invalid_config(
                "gamma",
                format!("must be in [0, 1), got {}", self.gamma),
            ));
        }
        if !(self.tau > 0.0) || !self.tau.is_finite() {
            return Err(PredictorError::invalid_config(
                "tau",
                format!("must be finite and > 0, got {}", self.tau),
            ));
        }
        if !(self.lambda >= 0.0) || !self.lambda.is_finite() {
            return Err(PredictorError::invalid_config(
                "lambda",
                format!("must be finite and >= 0, got {}", self.lambda),
            ));
        }
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(PredictorError::invalid_config(
                "dt",
                format!("must be finite and > 0, got {}", self.dt),
            ));
        }
        Ok(())
    }

    /// Per-step trace decay factor `exp(-dt / tau)`.
    pub fn decay(&self) -> f64 {
        (-self.dt / self.tau).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PredictorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_inputs, 3);
        assert!(!config.estimate_mean);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let cases = [
            PredictorConfig {
                n_inputs: 0,
                ..Default::default()
            },
            PredictorConfig {
                gamma: 1.0,
                ..Default::default()
            },
            PredictorConfig {
                gamma: -0.1,
                ..Default::default()
            },
            PredictorConfig {
                tau: 0.0,
                ..Default::default()
            },
            PredictorConfig {
                lambda: -1e-6,
                ..Default::default()
            },
            PredictorConfig {
                dt: 0.0,
                ..Default::default()
            },
            PredictorConfig {
                gamma: f64::NAN,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(
                    config.validate(),
                    Err(PredictorError::InvalidConfiguration { .. })
                ),
                "should reject {:?}",
                config
            );
        }
    }

    #[test]
    fn test_zero_lambda_and_gamma_are_legal() {
        let config = PredictorConfig {
            gamma: 0.0,
            lambda: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_decay_factor() {
        let config = PredictorConfig::default();
        let expected = (-0.001_f64 / 0.15).exp();
        assert!((config.decay() - expected).abs() < 1e-15);
        assert!(config.decay() > 0.0 && config.decay() < 1.0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PredictorConfig = toml::from_str("n_inputs = 2\nestimate_mean = true").unwrap();
        assert_eq!(config.n_inputs, 2);
        assert!(config.estimate_mean);
        assert_eq!(config.gamma, DEFAULT_GAMMA);
        assert_eq!(config.lambda, DEFAULT_LAMBDA);
    }
}
