//! Synthetic spike-train input.

mod spike_train;

pub use spike_train::{spike_signal, time_grid, SpikeRaster, SpikeTrainConfig};
