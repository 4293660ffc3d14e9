//! Periodic spike trains snapped to a discrete time grid.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PredictorError;
use crate::infra::logging::targets;

/// Uniform time grid `t_k = k·dt` covering `[0, duration)`.
pub fn time_grid(duration: f64, dt: f64) -> Result<Vec<f64>, PredictorError> {
    if !(duration > 0.0) || !duration.is_finite() {
        return Err(PredictorError::invalid_config(
            "duration",
            format!("must be finite and > 0, got {}", duration),
        ));
    }
    if !(dt > 0.0) || !dt.is_finite() {
        return Err(PredictorError::invalid_config(
            "dt",
            format!("must be finite and > 0, got {}", dt),
        ));
    }
    // Whole multiples of dt must not gain an extra point from rounding
    let ratio = duration / dt;
    let len = if (ratio - ratio.round()).abs() < 1e-9 {
        ratio.round() as usize
    } else {
        ratio.ceil() as usize
    };
    Ok((0..len).map(|k| k as f64 * dt).collect())
}

/// Binary spike train with one spike per period.
///
/// Theoretical spike times are `phase + m·period` inside `[t_0, t_last]`.
/// Each is shifted by `Uniform(-jitter, jitter)` when `jitter > 0`, then
/// placed on the nearest grid index (earlier index on ties).
pub fn spike_signal<R: Rng + ?Sized>(
    time: &[f64],
    period: f64,
    phase: f64,
    jitter: f64,
    rng: &mut R,
) -> Result<Vec<f64>, PredictorError> {
    let (Some(&t_first), Some(&t_last)) = (time.first(), time.last()) else {
        return Err(PredictorError::invalid_config("time", "grid is empty"));
    };
    if !(period > 0.0) || !period.is_finite() {
        return Err(PredictorError::invalid_config(
            "period",
            format!("must be finite and > 0, got {}", period),
        ));
    }
    if !(jitter >= 0.0) || !jitter.is_finite() {
        return Err(PredictorError::invalid_config(
            "jitter",
            format!("must be finite and >= 0, got {}", jitter),
        ));
    }

    let mut spikes = vec![0.0; time.len()];
    let count = ((t_last - phase) / period).trunc() as i64 + 1;
    if count <= 0 {
        return Ok(spikes);
    }

    let noise = (jitter > 0.0).then(|| Uniform::new(-jitter, jitter));
    for m in 0..count {
        let mut spike_time = phase + m as f64 * period;
        if spike_time < t_first || spike_time > t_last {
            continue;
        }
        if let Some(noise) = &noise {
            spike_time += noise.sample(rng);
        }
        spikes[nearest_index(time, spike_time)] = 1.0;
    }
    Ok(spikes)
}

/// Index of the grid point closest to `t` in a sorted grid.
fn nearest_index(time: &[f64], t: f64) -> usize {
    let upper = time.partition_point(|&s| s < t);
    if upper == 0 {
        return 0;
    }
    if upper == time.len() {
        return time.len() - 1;
    }
    let lower = upper - 1;
    if (t - time[lower]).abs() <= (time[upper] - t).abs() {
        lower
    } else {
        upper
    }
}

/// Per-channel spike-train parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpikeTrainConfig {
    /// Spike period per channel (seconds)
    #[serde(default = "default_periods")]
    pub periods: Vec<f64>,

    /// Offset of the first spike per channel (seconds)
    #[serde(default = "default_phases")]
    pub phases: Vec<f64>,

    /// Half-width of the uniform spike-time jitter per channel (seconds)
    #[serde(default = "default_jitter")]
    pub jitter: Vec<f64>,
}

fn default_periods() -> Vec<f64> {
    vec![1.0, 1.0, 1.0]
}

fn default_phases() -> Vec<f64> {
    vec![0.05, 0.1, 0.15]
}

fn default_jitter() -> Vec<f64> {
    vec![0.0, 0.0, 0.0]
}

impl Default for SpikeTrainConfig {
    fn default() -> Self {
        Self {
            periods: default_periods(),
            phases: default_phases(),
            jitter: default_jitter(),
        }
    }
}

impl SpikeTrainConfig {
    pub fn n_channels(&self) -> usize {
        self.periods.len()
    }

    /// Check that every channel has a period, phase and jitter.
    pub fn validate(&self) -> Result<(), PredictorError> {
        let n = self.periods.len();
        if n == 0 {
            return Err(PredictorError::invalid_config(
                "periods",
                "must list at least one channel",
            ));
        }
        if self.phases.len() != n || self.jitter.len() != n {
            return Err(PredictorError::invalid_config(
                "phases",
                format!(
                    "periods/phases/jitter lengths differ: {}/{}/{}",
                    n,
                    self.phases.len(),
                    self.jitter.len()
                ),
            ));
        }
        Ok(())
    }

    /// Generate one spike train per channel on `time`.
    pub fn raster<R: Rng + ?Sized>(
        &self,
        time: &[f64],
        rng: &mut R,
    ) -> Result<SpikeRaster, PredictorError> {
        self.validate()?;
        let channels = self
            .periods
            .iter()
            .zip(&self.phases)
            .zip(&self.jitter)
            .map(|((&period, &phase), &jitter)| {
                spike_signal(time, period, phase, jitter, &mut *rng)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let raster = SpikeRaster { channels };
        let spike_counts: Vec<usize> = (0..raster.n_channels())
            .map(|i| raster.spike_count(i))
            .collect();
        debug!(
            target: targets::SIGNAL,
            channels = raster.n_channels(),
            steps = raster.len(),
            spikes = ?spike_counts,
            "Spike raster generated"
        );
        Ok(raster)
    }
}

/// Channel-major matrix of event counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeRaster {
    channels: Vec<Vec<f64>>,
}

impl SpikeRaster {
    /// Build from per-channel rows; all rows must have the same length.
    pub fn from_channels(channels: Vec<Vec<f64>>) -> Result<Self, PredictorError> {
        let Some(first) = channels.first() else {
            return Err(PredictorError::invalid_config(
                "channels",
                "must contain at least one channel",
            ));
        };
        let len = first.len();
        if let Some(bad) = channels.iter().position(|c| c.len() != len) {
            return Err(PredictorError::invalid_config(
                "channels",
                format!(
                    "channel {} has {} steps, expected {}",
                    bad,
                    channels[bad].len(),
                    len
                ),
            ));
        }
        Ok(Self { channels })
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Event vector at step `k` (one entry per channel).
    ///
    /// # Panics
    ///
    /// Panics if `k >= self.len()`.
    pub fn column(&self, k: usize) -> Vec<f64> {
        self.channels.iter().map(|c| c[k]).collect()
    }

    /// Spike train of channel `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.n_channels()`.
    pub fn channel(&self, i: usize) -> &[f64] {
        &self.channels[i]
    }

    /// Number of steps with an event on channel `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.n_channels()`.
    pub fn spike_count(&self, i: usize) -> usize {
        self.channels[i].iter().filter(|&&e| e > 0.0).count()
    }
}
