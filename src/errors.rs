use thiserror::Error;

/// Errors raised by the recursive predictor and its configuration.
///
/// Every variant is raised before any state is committed, so a failed call
/// leaves the predictor exactly as it was after the last successful step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictorError {
    /// A constructor or config parameter is outside its valid range
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    /// Event vector length does not match the channel count
    #[error("Dimension mismatch: expected {expected} channels, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Event entry is negative or non-finite
    #[error("Invalid event on channel {channel}: {value}")]
    InvalidEvent { channel: usize, value: f64 },

    /// Covariance could not be factorised at a spike-event step
    #[error("Covariance matrix is singular at step {step}")]
    SingularCovariance { step: u64 },
}

// Convenience constructors for common error patterns
impl PredictorError {
    /// Create a configuration error for `field`.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        PredictorError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        PredictorError::DimensionMismatch { expected, actual }
    }

    /// True for errors caused by the caller's input rather than numerical state.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PredictorError::DimensionMismatch { .. } | PredictorError::InvalidEvent { .. }
        )
    }
}
