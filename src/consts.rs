/// Default number of input channels.
pub const DEFAULT_N_INPUTS: usize = 3;

/// Default EMA rate for the covariance estimates.
pub const DEFAULT_GAMMA: f64 = 0.9;

/// Default trace time constant (seconds).
pub const DEFAULT_TAU: f64 = 0.15;

/// Default ridge coefficient added to the covariance on every spike step.
pub const DEFAULT_LAMBDA: f64 = 1e-4;

/// Default simulation step (seconds).
pub const DEFAULT_DT: f64 = 0.001;

/// Default simulated duration (seconds).
pub const DEFAULT_DURATION: f64 = 15.0;
