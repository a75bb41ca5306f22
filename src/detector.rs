//! Threshold-crossing spike detection on sampled voltage traces.
//!
//! # Examples
//!
//! ```rust
//! use tuning_curves::detector::{SpikeDetector, ThresholdMode};
//!
//! // A trace sampled at 1 kHz with two excursions above 0.5
//! let trace = vec![0.0, 0.8, 0.9, 0.1, 0.0, 0.0, 0.0, -0.7, 0.0, 0.0];
//!
//! // In absolute mode, both the positive and the negative excursions are detected
//! let detector = SpikeDetector::build(0.5).unwrap();
//! assert_eq!(detector.detect(&trace, 1000.0).unwrap(), vec![0.001, 0.007]);
//!
//! // In signed mode, only the positive-going crossing is detected
//! let detector = SpikeDetector::build(0.5).unwrap().with_mode(ThresholdMode::Signed);
//! assert_eq!(detector.detect(&trace, 1000.0).unwrap(), vec![0.001]);
//! ```
use serde::{Deserialize, Serialize};

use super::error::AnalysisError;
use super::DEFAULT_REFRACTORY_PERIOD;

/// Slack (in samples) on the refractory rule, so that gaps of exactly one refractory period are accepted.
const REFRACTORY_TOLERANCE: f64 = 1e-9;

/// How samples are compared to the threshold.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum ThresholdMode {
    /// Compare the magnitude of every sample to the magnitude of the threshold.
    #[default]
    Absolute,
    /// Compare samples to the threshold itself: a non-negative threshold detects
    /// positive-going crossings, a negative one detects negative-going crossings.
    Signed,
}

/// Sign applied to every sample before detection.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum Polarity {
    #[default]
    Normal,
    Inverted,
}

impl Polarity {
    fn sign(&self) -> f64 {
        match self {
            Polarity::Normal => 1.0,
            Polarity::Inverted => -1.0,
        }
    }
}

/// Which sample of a supra-threshold run gives the spike time.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum Alignment {
    /// The first sample at or above threshold.
    #[default]
    Crossing,
    /// The largest sample of the run.
    Peak,
}

/// A threshold-crossing spike detector with a refractory period.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SpikeDetector {
    threshold: f64,
    mode: ThresholdMode,
    polarity: Polarity,
    alignment: Alignment,
    /// Minimum time (in seconds) between two accepted spikes.
    refractory: f64,
}

impl SpikeDetector {
    /// Create a detector with the given threshold and the default policy, i.e.,
    /// absolute mode, normal polarity, crossing alignment and a refractory period of DEFAULT_REFRACTORY_PERIOD.
    /// Returns an error if the threshold is not finite.
    pub fn build(threshold: f64) -> Result<Self, AnalysisError> {
        if !threshold.is_finite() {
            return Err(AnalysisError::InvalidParameter(
                "The detection threshold must be finite".to_string(),
            ));
        }

        Ok(SpikeDetector {
            threshold,
            mode: ThresholdMode::default(),
            polarity: Polarity::default(),
            alignment: Alignment::default(),
            refractory: DEFAULT_REFRACTORY_PERIOD,
        })
    }

    pub fn with_mode(mut self, mode: ThresholdMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set the refractory period (in seconds).
    /// Returns an error if the refractory period is negative or not finite.
    pub fn with_refractory(mut self, refractory: f64) -> Result<Self, AnalysisError> {
        if !refractory.is_finite() || refractory < 0.0 {
            return Err(AnalysisError::InvalidParameter(
                "The refractory period must be non-negative".to_string(),
            ));
        }
        self.refractory = refractory;
        Ok(self)
    }

    /// Returns the detection threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the threshold mode.
    pub fn mode(&self) -> ThresholdMode {
        self.mode
    }

    /// Returns the polarity applied to the samples.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Returns the alignment of the spike times.
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Returns the refractory period (in seconds).
    pub fn refractory(&self) -> f64 {
        self.refractory
    }

    /// Returns the detection level and the strength of a sample, such that the sample is supra-threshold iff strength >= level.
    fn strength(&self, sample: f64) -> (f64, f64) {
        let value = self.polarity.sign() * sample;
        match self.mode {
            ThresholdMode::Absolute => (self.threshold.abs(), value.abs()),
            ThresholdMode::Signed if self.threshold >= 0.0 => (self.threshold, value),
            ThresholdMode::Signed => (-self.threshold, -value),
        }
    }

    /// Returns the (strictly increasing) spike times, in seconds, detected in the trace.
    ///
    /// A spike is registered when the signal goes from below to at or above the threshold; the sample before the trace counts as below.
    /// Crossings closer than the refractory period to the last accepted spike are discarded.
    pub fn detect(&self, trace: &[f64], sample_rate: f64) -> Result<Vec<f64>, AnalysisError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(AnalysisError::InvalidParameter(
                "The sample rate must be positive".to_string(),
            ));
        }

        // Refractory period in samples, never shorter than one sample
        let refractory = (self.refractory * sample_rate).max(1.0) - REFRACTORY_TOLERANCE;
        let mut spike_times: Vec<f64> = vec![];
        let mut last_index: Option<usize> = None;

        let mut accept = |index: usize| match last_index {
            Some(last) if ((index - last) as f64) < refractory => {}
            _ => {
                last_index = Some(index);
                spike_times.push(index as f64 / sample_rate);
            }
        };

        // (index, strength) of the candidate sample of the current supra-threshold run
        let mut run: Option<(usize, f64)> = None;

        for (i, &sample) in trace.iter().enumerate() {
            let (level, strength) = self.strength(sample);
            if strength >= level {
                run = match (run, self.alignment) {
                    (None, _) => Some((i, strength)),
                    (Some((_, peak)), Alignment::Peak) if strength > peak => Some((i, strength)),
                    (run, _) => run,
                };
            } else if let Some((index, _)) = run.take() {
                accept(index);
            }
        }

        if let Some((index, _)) = run {
            accept(index);
        }

        Ok(spike_times)
    }
}

/// Returns the spike times detected in the trace with the default detection policy (see `SpikeDetector::build`).
pub fn detect_spikes(
    trace: &[f64],
    threshold: f64,
    sample_rate: f64,
) -> Result<Vec<f64>, AnalysisError> {
    SpikeDetector::build(threshold)?.detect(trace, sample_rate)
}
