//! This crate provides tools for analyzing neural responses to auditory stimuli in Rust.
//!
//! Recordings are organized in trial blocks, i.e., voltage traces indexed by stimulus trace, repetition and (optionally) channel.
//! Spikes are detected by threshold crossing, counted over repetitions, and arranged into a frequency-intensity tuning curve.
//!
//! # Detecting Spikes
//!
//! ```rust
//! use tuning_curves::detector::detect_spikes;
//! use tuning_curves::stats::{first_latency, firing_rate};
//!
//! // A trace sampled at 10 kHz with two well separated spikes
//! let mut trace = vec![0.0; 1000];
//! trace[120] = 1.5;
//! trace[480] = -1.2;
//!
//! let spike_times = detect_spikes(&trace, 1.0, 10_000.0).unwrap();
//! assert_eq!(spike_times, vec![0.012, 0.048]);
//! assert_eq!(first_latency(&spike_times), 0.012);
//! assert_eq!(firing_rate(&spike_times, 0.5).unwrap(), 4.0);
//! ```
//!
//! # Building Tuning Curves
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use tuning_curves::detector::SpikeDetector;
//! use tuning_curves::sampler::SyntheticRecording;
//! use tuning_curves::threshold::estimate_threshold;
//! use tuning_curves::tuning::TuningCurve;
//!
//! // Sample a recording with 3 frequencies, 2 intensities and a leading silence trace
//! let mut rng = StdRng::seed_from_u64(42);
//! let recording = SyntheticRecording::new(vec![4_000.0, 8_000.0, 16_000.0], vec![30.0, 60.0]);
//! let (block, stimuli) = recording.rand(|_, intensity| intensity / 10.0, &mut rng).unwrap();
//!
//! // Seed the threshold from the first tone trace, then aggregate over all tone traces
//! let threshold = estimate_threshold(&block, 1, 0, 0.7).unwrap();
//! let detector = SpikeDetector::build(threshold).unwrap();
//! let curve = TuningCurve::build(&block, &stimuli, 0, &detector).unwrap();
//!
//! assert_eq!(curve.frequencies(), &[4.0, 8.0, 16.0]);
//! assert_eq!(curve.intensities(), &[30.0, 60.0]);
//! assert_eq!(curve.grid().shape(), (2, 3));
//! ```

pub mod detector;
pub mod error;
pub mod recording;
pub mod sampler;
pub mod stats;
pub mod stimulus;
pub mod threshold;
pub mod trial;
pub mod tuning;

/// The default minimum time (in seconds) between two detected spikes.
pub const DEFAULT_REFRACTORY_PERIOD: f64 = 0.002;
/// The default fraction of the average peak amplitude used as detection threshold.
pub const AUTO_THRESHOLD_FRACTION: f64 = 0.7;
/// Minimum number of repetitions to consider parallel processing.
pub const MIN_PARALLEL_REPETITIONS: usize = 32;
/// Minimum number of traces to consider parallel processing.
pub const MIN_PARALLEL_TRACES: usize = 8;
