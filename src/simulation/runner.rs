//! Driver loop: spike raster → predictor → recorder.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::recorder::SeriesRecorder;
use crate::consts::DEFAULT_DURATION;
use crate::errors::PredictorError;
use crate::infra::logging::targets;
use crate::predictor::{PredictorConfig, PredictorSnapshot, RecursivePredictor};
use crate::signal::{time_grid, SpikeRaster, SpikeTrainConfig};

/// Run-level settings. The step size comes from the predictor config.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Simulated duration (seconds)
    #[serde(default = "default_duration")]
    pub duration: f64,

    /// Seed for spike jitter; entropy-seeded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_duration() -> f64 {
    DEFAULT_DURATION
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            seed: None,
        }
    }
}

/// End-of-run figures.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub steps: u64,
    pub spike_steps: u64,
    pub final_prediction: Vec<f64>,
    pub final_state: PredictorSnapshot,
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutput {
    pub series: SeriesRecorder,
    pub summary: RunSummary,
}

/// Sequential driver around one [`RecursivePredictor`].
#[derive(Debug, Clone)]
pub struct Simulation {
    predictor: PredictorConfig,
    signal: SpikeTrainConfig,
    config: SimulationConfig,
}

impl Simulation {
    /// Validate the three config blocks against each other.
    pub fn new(
        predictor: PredictorConfig,
        signal: SpikeTrainConfig,
        config: SimulationConfig,
    ) -> Result<Self, PredictorError> {
        predictor.validate()?;
        signal.validate()?;
        if signal.n_channels() != predictor.n_inputs {
            return Err(PredictorError::invalid_config(
                "n_inputs",
                format!(
                    "predictor has {} channels but signal defines {}",
                    predictor.n_inputs,
                    signal.n_channels()
                ),
            ));
        }
        if !(config.duration > 0.0) || !config.duration.is_finite() {
            return Err(PredictorError::invalid_config(
                "duration",
                format!("must be finite and > 0, got {}", config.duration),
            ));
        }
        Ok(Self {
            predictor,
            signal,
            config,
        })
    }

    /// Generate the spike raster and run the predictor over it.
    pub fn run(&self) -> Result<SimulationOutput, PredictorError> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let time = time_grid(self.config.duration, self.predictor.dt)?;
        let raster = self.signal.raster(&time, &mut rng)?;
        self.run_on(&time, &raster)
    }

    /// Run the predictor over a given raster.
    ///
    /// Step 0 is recorded blank; steps `1..N` are fed to the predictor.
    /// A failing update aborts the run.
    pub fn run_on(
        &self,
        time: &[f64],
        raster: &SpikeRaster,
    ) -> Result<SimulationOutput, PredictorError> {
        if raster.len() != time.len() {
            return Err(PredictorError::invalid_config(
                "time",
                format!(
                    "grid has {} steps but raster has {}",
                    time.len(),
                    raster.len()
                ),
            ));
        }

        let mut predictor = RecursivePredictor::new(self.predictor.clone())?;
        let mut series = SeriesRecorder::with_capacity(self.predictor.n_inputs, time.len());

        info!(
            target: targets::SIMULATION,
            channels = self.predictor.n_inputs,
            steps = time.len(),
            duration = self.config.duration,
            dt = self.predictor.dt,
            estimate_mean = self.predictor.estimate_mean,
            "Starting simulation"
        );

        let Some(&t0) = time.first() else {
            return Err(PredictorError::invalid_config("time", "grid is empty"));
        };
        series.record_blank(t0, &raster.column(0));

        let mut prediction = predictor.predict();
        for (k, &t) in time.iter().enumerate().skip(1) {
            let events = raster.column(k);
            if let Err(e) = predictor.update(&events) {
                warn!(target: targets::SIMULATION, step = k, t, error = %e, "Simulation aborted");
                return Err(e);
            }
            prediction = predictor.predict();
            series.record(t, &events, &prediction, &predictor);
        }

        let summary = RunSummary {
            steps: predictor.step_count(),
            spike_steps: predictor.spike_event_count(),
            final_prediction: prediction.as_slice().to_vec(),
            final_state: predictor.snapshot(),
        };
        debug!(
            target: targets::SIMULATION,
            steps = summary.steps,
            spike_steps = summary.spike_steps,
            "Simulation finished"
        );
        Ok(SimulationOutput { series, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{MatrixSeries, VectorSeries};

    fn seeded(duration: f64) -> SimulationConfig {
        SimulationConfig {
            duration,
            seed: Some(11),
        }
    }

    #[test]
    fn test_default_run_shape() {
        let sim = Simulation::new(
            PredictorConfig::default(),
            SpikeTrainConfig::default(),
            seeded(3.0),
        )
        .unwrap();
        let output = sim.run().unwrap();

        assert_eq!(output.series.len(), 3000);
        assert_eq!(output.summary.steps, 2999);
        // Three channels, three spikes each
        assert_eq!(output.summary.spike_steps, 9);
        assert!(output
            .summary
            .final_prediction
            .iter()
            .all(|p| p.is_finite()));
    }

    #[test]
    fn test_statistics_only_move_at_spikes() {
        let sim = Simulation::new(
            PredictorConfig::default(),
            SpikeTrainConfig::default(),
            seeded(2.0),
        )
        .unwrap();
        let output = sim.run().unwrap();
        let cov = output.series.element(MatrixSeries::Covariance, 0, 0).unwrap();
        let spikes = output.series.event_times(0).unwrap();
        assert_eq!(spikes.len(), 2);

        // Channel 0 fires first at step 50; nothing moves before it
        assert!(cov[..50].iter().all(|&c| c == 0.0));
        assert!(cov[50] > 0.0);
        // Constant between channel-0 spike and channel-1 spike
        assert!(cov[50..100].windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_centered_trace_series_matches_trace_minus_mean() {
        let predictor = PredictorConfig {
            estimate_mean: true,
            ..Default::default()
        };
        let sim = Simulation::new(predictor, SpikeTrainConfig::default(), seeded(4.0)).unwrap();
        let output = sim.run().unwrap();
        for i in 0..3 {
            let z = output.series.channel(VectorSeries::CenteredTrace, i).unwrap();
            let x = output.series.channel(VectorSeries::Trace, i).unwrap();
            let m = output.series.channel(VectorSeries::Mean, i).unwrap();
            for k in 0..z.len() {
                assert!((z[k] - (x[k] - m[k])).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_channel_count_mismatch_rejected() {
        let err = Simulation::new(
            PredictorConfig::with_channels(2),
            SpikeTrainConfig::default(),
            SimulationConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PredictorError::InvalidConfiguration {
                field: "n_inputs",
                ..
            }
        ));
    }

    #[test]
    fn test_singular_covariance_aborts_run() {
        let predictor = PredictorConfig {
            lambda: 0.0,
            ..Default::default()
        };
        let sim = Simulation::new(predictor, SpikeTrainConfig::default(), seeded(1.0)).unwrap();
        let err = sim.run().unwrap_err();
        // First spike (channel 0 at step 50) leaves a rank-one covariance
        assert_eq!(err, PredictorError::SingularCovariance { step: 50 });
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let signal = SpikeTrainConfig {
            jitter: vec![0.02, 0.02, 0.02],
            ..Default::default()
        };
        let sim = Simulation::new(PredictorConfig::default(), signal, seeded(5.0)).unwrap();
        let a = sim.run().unwrap();
        let b = sim.run().unwrap();
        assert_eq!(a.summary.final_prediction, b.summary.final_prediction);
        assert_eq!(a.summary.final_state, b.summary.final_state);
    }

    #[test]
    fn test_run_on_rejects_length_mismatch() {
        let sim = Simulation::new(
            PredictorConfig::with_channels(1),
            SpikeTrainConfig {
                periods: vec![1.0],
                phases: vec![0.0],
                jitter: vec![0.0],
            },
            SimulationConfig::default(),
        )
        .unwrap();
        let raster = SpikeRaster::from_channels(vec![vec![0.0; 5]]).unwrap();
        assert!(sim.run_on(&[0.0, 0.001], &raster).is_err());
    }
}
