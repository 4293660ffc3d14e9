//! Time-indexed series of predictor outputs for offline plotting.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::predictor::RecursivePredictor;

/// Per-channel series kept by the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorSeries {
    Prediction,
    Mean,
    Trace,
    CenteredTrace,
}

/// Matrix-element series kept by the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixSeries {
    Covariance,
    CrossCovariance,
    Gain,
}

/// Records the predictor state after every step.
///
/// Vectors are stored as plain rows and matrices row-major so the JSON
/// export can be consumed directly by plotting tools.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesRecorder {
    n_inputs: usize,
    time: Vec<f64>,
    events: Vec<Vec<f64>>,
    predictions: Vec<Vec<f64>>,
    means: Vec<Vec<f64>>,
    traces: Vec<Vec<f64>>,
    centered_traces: Vec<Vec<f64>>,
    covariances: Vec<Vec<f64>>,
    cross_covariances: Vec<Vec<f64>>,
    gains: Vec<Vec<f64>>,
}

fn row_major(m: &DMatrix<f64>) -> Vec<f64> {
    m.transpose().as_slice().to_vec()
}

fn to_row(v: &DVector<f64>) -> Vec<f64> {
    v.as_slice().to_vec()
}

impl SeriesRecorder {
    pub fn new(n_inputs: usize) -> Self {
        Self {
            n_inputs,
            ..Default::default()
        }
    }

    pub fn with_capacity(n_inputs: usize, steps: usize) -> Self {
        Self {
            n_inputs,
            time: Vec::with_capacity(steps),
            events: Vec::with_capacity(steps),
            predictions: Vec::with_capacity(steps),
            means: Vec::with_capacity(steps),
            traces: Vec::with_capacity(steps),
            centered_traces: Vec::with_capacity(steps),
            covariances: Vec::with_capacity(steps),
            cross_covariances: Vec::with_capacity(steps),
            gains: Vec::with_capacity(steps),
        }
    }

    /// Record an all-zero row (steps the predictor has not processed).
    pub fn record_blank(&mut self, t: f64, events: &[f64]) {
        let n = self.n_inputs;
        self.time.push(t);
        self.events.push(events.to_vec());
        self.predictions.push(vec![0.0; n]);
        self.means.push(vec![0.0; n]);
        self.traces.push(vec![0.0; n]);
        self.centered_traces.push(vec![0.0; n]);
        self.covariances.push(vec![0.0; n * n]);
        self.cross_covariances.push(vec![0.0; n * n]);
        self.gains.push(vec![0.0; n * n]);
    }

    /// Record the state right after `predictor` processed `events` at time `t`.
    pub fn record(
        &mut self,
        t: f64,
        events: &[f64],
        prediction: &DVector<f64>,
        predictor: &RecursivePredictor,
    ) {
        self.time.push(t);
        self.events.push(events.to_vec());
        self.predictions.push(to_row(prediction));
        self.means.push(to_row(predictor.mean()));
        self.traces.push(to_row(predictor.trace()));
        self.centered_traces.push(to_row(predictor.centered_trace()));
        self.covariances.push(row_major(predictor.covariance()));
        self.cross_covariances
            .push(row_major(predictor.cross_covariance()));
        self.gains.push(row_major(predictor.weights()));
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Series of channel `i` of `series` over time, `None` if `i` is not a channel.
    pub fn channel(&self, series: VectorSeries, i: usize) -> Option<Vec<f64>> {
        if i >= self.n_inputs {
            return None;
        }
        let rows = match series {
            VectorSeries::Prediction => &self.predictions,
            VectorSeries::Mean => &self.means,
            VectorSeries::Trace => &self.traces,
            VectorSeries::CenteredTrace => &self.centered_traces,
        };
        Some(rows.iter().map(|r| r[i]).collect())
    }

    /// Series of element `(i, j)` of `series` over time, `None` outside the matrix.
    pub fn element(&self, series: MatrixSeries, i: usize, j: usize) -> Option<Vec<f64>> {
        if i >= self.n_inputs || j >= self.n_inputs {
            return None;
        }
        let rows = match series {
            MatrixSeries::Covariance => &self.covariances,
            MatrixSeries::CrossCovariance => &self.cross_covariances,
            MatrixSeries::Gain => &self.gains,
        };
        let idx = i * self.n_inputs + j;
        Some(rows.iter().map(|r| r[idx]).collect())
    }

    /// Times at which channel `i` carried an event.
    pub fn event_times(&self, i: usize) -> Option<Vec<f64>> {
        if i >= self.n_inputs {
            return None;
        }
        let times = self
            .time
            .iter()
            .zip(&self.events)
            .filter(|(_, e)| e[i] > 0.0)
            .map(|(&t, _)| t)
            .collect();
        Some(times)
    }

    /// Write all series as JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> io::Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Write all series as JSON to `path`.
    pub fn save_json(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::PredictorConfig;

    fn recorded_run() -> SeriesRecorder {
        let mut p = RecursivePredictor::new(PredictorConfig::with_channels(2)).unwrap();
        let mut rec = SeriesRecorder::new(2);
        rec.record_blank(0.0, &[0.0, 0.0]);
        for (k, events) in [[1.0, 0.0], [0.0, 0.0], [0.0, 1.0]].iter().enumerate() {
            p.update(events).unwrap();
            let prediction = p.predict();
            rec.record((k + 1) as f64 * 0.001, events, &prediction, &p);
        }
        rec
    }

    #[test]
    fn test_record_lengths() {
        let rec = recorded_run();
        assert_eq!(rec.len(), 4);
        assert_eq!(rec.channel(VectorSeries::Trace, 0).unwrap().len(), 4);
        assert_eq!(rec.element(MatrixSeries::Gain, 1, 0).unwrap().len(), 4);
        assert_eq!(rec.channel(VectorSeries::Prediction, 1).unwrap()[0], 0.0);
    }

    #[test]
    fn test_matrix_elements_are_row_major() {
        let mut p = RecursivePredictor::new(PredictorConfig::with_channels(2)).unwrap();
        p.update(&[1.0, 0.0]).unwrap();
        p.update(&[0.0, 1.0]).unwrap();
        let mut rec = SeriesRecorder::new(2);
        rec.record(0.0, &[0.0, 1.0], &p.predict(), &p);

        let cross = p.cross_covariance();
        assert_ne!(cross[(0, 1)], cross[(1, 0)]);
        assert_eq!(rec.element(MatrixSeries::CrossCovariance, 0, 1).unwrap()[0], cross[(0, 1)]);
        assert_eq!(rec.element(MatrixSeries::CrossCovariance, 1, 0).unwrap()[0], cross[(1, 0)]);
    }

    #[test]
    fn test_out_of_range_series_are_none() {
        let rec = recorded_run();
        assert!(rec.channel(VectorSeries::Mean, 2).is_none());
        assert!(rec.event_times(2).is_none());
        // (0, 2) would alias (1, 0) in the row-major layout
        assert!(rec.element(MatrixSeries::Covariance, 0, 2).is_none());
        assert!(rec.element(MatrixSeries::Gain, 2, 0).is_none());
    }

    #[test]
    fn test_event_times() {
        let rec = recorded_run();
        let first = rec.event_times(0).unwrap();
        let second = rec.event_times(1).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert!((first[0] - 0.001).abs() < 1e-12);
        assert!((second[0] - 0.003).abs() < 1e-12);
    }

    #[test]
    fn test_save_json() {
        let rec = recorded_run();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.json");
        rec.save_json(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["n_inputs"], 2);
        assert_eq!(value["time"].as_array().unwrap().len(), 4);
        assert_eq!(value["gains"][1].as_array().unwrap().len(), 4);
    }
}
