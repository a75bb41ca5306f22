//! Trial blocks and the aggregation of spike counts over repeated presentations.
use derivative::Derivative;
use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use super::detector::SpikeDetector;
use super::error::AnalysisError;
use super::stats::{firing_rate, first_latency, Psth};
use super::MIN_PARALLEL_REPETITIONS;

/// Voltage traces of one recording, indexed by (trace, repetition, sample) or (trace, repetition, channel, sample).
/// All traces share the same number of samples and the same sample rate.
#[derive(Derivative, Clone)]
#[derivative(Debug, PartialEq)]
pub struct TrialBlock {
    /// The dimensions of the block, either 3 or 4 of them.
    shape: Vec<usize>,
    /// The samples, in row-major order.
    #[derivative(Debug = "ignore")]
    data: Vec<f64>,
    /// The number of samples per second.
    sample_rate: f64,
}

impl TrialBlock {
    /// Create a trial block from its shape and row-major samples.
    /// Returns an error if the block is neither 3- nor 4-dimensional, if the number of samples does not match the shape,
    /// or if the sample rate is not positive.
    pub fn build(shape: Vec<usize>, data: Vec<f64>, sample_rate: f64) -> Result<Self, AnalysisError> {
        if shape.len() != 3 && shape.len() != 4 {
            return Err(AnalysisError::InputShape(format!(
                "expected (trace, repetition[, channel], sample), got {} dimensions",
                shape.len()
            )));
        }

        let expected_len = shape
            .iter()
            .try_fold(1usize, |len, &dim| len.checked_mul(dim))
            .ok_or_else(|| {
                AnalysisError::InputShape(format!("shape {:?} is too large", shape))
            })?;
        if data.len() != expected_len {
            return Err(AnalysisError::InputShape(format!(
                "shape {:?} requires {} samples, got {}",
                shape,
                expected_len,
                data.len()
            )));
        }

        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(AnalysisError::InvalidParameter(
                "The sample rate must be positive".to_string(),
            ));
        }

        debug!("New trial block of shape {:?} at {} Hz", shape, sample_rate);

        Ok(TrialBlock {
            shape,
            data,
            sample_rate,
        })
    }

    /// Returns the dimensions of the block.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns true if the block has an explicit channel dimension.
    pub fn has_channels(&self) -> bool {
        self.shape.len() == 4
    }

    /// Returns the number of stimulus traces.
    pub fn num_traces(&self) -> usize {
        self.shape[0]
    }

    /// Returns the number of repetitions per trace.
    pub fn num_repetitions(&self) -> usize {
        self.shape[1]
    }

    /// Returns the number of channels (one for a block without channel dimension).
    pub fn num_channels(&self) -> usize {
        if self.has_channels() {
            self.shape[2]
        } else {
            1
        }
    }

    /// Returns the number of samples per trace.
    pub fn num_samples(&self) -> usize {
        self.shape[self.shape.len() - 1]
    }

    /// Returns the number of samples per second.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Returns the duration (in seconds) of every trace.
    pub fn duration(&self) -> f64 {
        self.num_samples() as f64 / self.sample_rate
    }

    fn check_bounds(&self, trace: usize, channel: usize) -> Result<(), AnalysisError> {
        if trace >= self.num_traces() {
            return Err(AnalysisError::OutOfBounds(format!(
                "trace {} (the block has {} traces)",
                trace,
                self.num_traces()
            )));
        }
        if channel >= self.num_channels() {
            return Err(AnalysisError::OutOfBounds(format!(
                "channel {} (the block has {} channels)",
                channel,
                self.num_channels()
            )));
        }
        Ok(())
    }

    /// Returns the samples of one repetition of a trace on a channel.
    pub fn trace(&self, trace: usize, repetition: usize, channel: usize) -> Result<&[f64], AnalysisError> {
        self.check_bounds(trace, channel)?;
        if repetition >= self.num_repetitions() {
            return Err(AnalysisError::OutOfBounds(format!(
                "repetition {} (the block has {} repetitions)",
                repetition,
                self.num_repetitions()
            )));
        }

        let num_samples = self.num_samples();
        let start = ((trace * self.num_repetitions() + repetition) * self.num_channels() + channel)
            * num_samples;
        Ok(&self.data[start..start + num_samples])
    }

    /// Returns the samples of every repetition of a trace on a channel.
    pub fn repetitions(&self, trace: usize, channel: usize) -> Result<Vec<&[f64]>, AnalysisError> {
        self.check_bounds(trace, channel)?;
        (0..self.num_repetitions())
            .map(|repetition| self.trace(trace, repetition, channel))
            .collect()
    }
}

/// Returns the spike times detected in every repetition of a trace on a channel.
/// Returns an error if the trace has no repetition.
pub fn detect_repetitions(
    block: &TrialBlock,
    trace: usize,
    channel: usize,
    detector: &SpikeDetector,
) -> Result<Vec<Vec<f64>>, AnalysisError> {
    let repetitions = block.repetitions(trace, channel)?;
    if repetitions.is_empty() {
        return Err(AnalysisError::EmptyRepetition { trace, channel });
    }

    let sample_rate = block.sample_rate();
    if repetitions.len() >= MIN_PARALLEL_REPETITIONS {
        repetitions
            .par_iter()
            .map(|samples| detector.detect(samples, sample_rate))
            .collect()
    } else {
        repetitions
            .iter()
            .map(|samples| detector.detect(samples, sample_rate))
            .collect()
    }
}

/// Returns the mean number of spikes per repetition of a trace on a channel.
/// Returns an error if the trace has no repetition.
pub fn average_spike_count(
    block: &TrialBlock,
    trace: usize,
    channel: usize,
    detector: &SpikeDetector,
) -> Result<f64, AnalysisError> {
    let spike_trains = detect_repetitions(block, trace, channel, detector)?;
    let num_spikes = spike_trains.iter().map(|times| times.len()).sum::<usize>();
    Ok(num_spikes as f64 / spike_trains.len() as f64)
}

/// The response of a channel to every repetition of a trace.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct TraceResponse {
    /// The number of spikes of every repetition.
    pub spike_counts: Vec<usize>,
    /// The time of the first spike of every repetition (NaN if none).
    pub latencies: Vec<f64>,
    /// The firing rate of every repetition over the whole trace.
    pub firing_rates: Vec<f64>,
    /// The post-stimulus time histogram over all repetitions.
    pub psth: Psth,
}

impl TraceResponse {
    /// Returns the mean number of spikes per repetition.
    pub fn mean_spike_count(&self) -> f64 {
        self.spike_counts.iter().sum::<usize>() as f64 / self.spike_counts.len() as f64
    }
}

/// Returns the spike counts, latencies, firing rates and histogram (with bins of the given width) of a trace on a channel.
pub fn summarize_trace(
    block: &TrialBlock,
    trace: usize,
    channel: usize,
    detector: &SpikeDetector,
    bin_width: f64,
) -> Result<TraceResponse, AnalysisError> {
    let spike_trains = detect_repetitions(block, trace, channel, detector)?;
    let window = block.duration();
    let num_bins = ((window / bin_width).ceil() as usize).max(1);
    if num_bins > block.num_samples() + 1 {
        return Err(AnalysisError::InvalidParameter(format!(
            "bins of {} s are shorter than the sample period",
            bin_width
        )));
    }
    let mut psth = Psth::new(bin_width, num_bins)?;

    let mut firing_rates = Vec::with_capacity(spike_trains.len());
    for spike_times in spike_trains.iter() {
        firing_rates.push(firing_rate(spike_times, window)?);
        psth.append(spike_times)?;
    }

    Ok(TraceResponse {
        spike_counts: spike_trains.iter().map(|times| times.len()).collect(),
        latencies: spike_trains.iter().map(|times| first_latency(times)).collect(),
        firing_rates,
        psth,
    })
}
