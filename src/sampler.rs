//! Random recordings of a tone-evoked response, for demonstrations and tests.
//!
//! Every repetition of every trace is Gaussian noise with a Poisson number of stereotyped spikes,
//! whose expected value depends on the stimulus condition.
use rand::seq::index::sample;
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};

use super::error::AnalysisError;
use super::stimulus::{StimType, StimulusDescriptor};
use super::trial::TrialBlock;

/// The time (in seconds) between two spike slots; spikes are placed on distinct slots.
const SPIKE_SLOT: f64 = 0.005;
/// The spike waveform, relative to the spike amplitude.
const SPIKE_WAVEFORM: [f64; 5] = [0.5, 1.0, 0.5, -0.4, -0.2];

/// A synthetic recording design: a full grid of tone conditions, optionally preceded by a silence trace.
#[derive(Debug, PartialEq, Clone)]
pub struct SyntheticRecording {
    /// Tone frequencies (in Hz).
    frequencies: Vec<f64>,
    /// Tone intensities (in dB).
    intensities: Vec<f64>,
    num_repetitions: usize,
    num_channels: usize,
    /// Duration (in seconds) of every trace.
    duration: f64,
    sample_rate: f64,
    noise_std: f64,
    spike_amplitude: f64,
    leading_silence: bool,
}

impl SyntheticRecording {
    /// Create a recording design for the given tone frequencies (in Hz) and intensities (in dB),
    /// with 5 repetitions on a single channel, 200 ms traces at 20 kHz and a leading silence trace.
    pub fn new(frequencies: Vec<f64>, intensities: Vec<f64>) -> Self {
        SyntheticRecording {
            frequencies,
            intensities,
            num_repetitions: 5,
            num_channels: 1,
            duration: 0.2,
            sample_rate: 20_000.0,
            noise_std: 0.05,
            spike_amplitude: 1.0,
            leading_silence: true,
        }
    }

    pub fn with_repetitions(mut self, num_repetitions: usize) -> Self {
        self.num_repetitions = num_repetitions;
        self
    }

    /// Set the number of channels; with more than one channel, the block has an explicit channel dimension.
    pub fn with_channels(mut self, num_channels: usize) -> Self {
        self.num_channels = num_channels;
        self
    }

    pub fn with_timing(mut self, duration: f64, sample_rate: f64) -> Self {
        self.duration = duration;
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_noise(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    pub fn with_spike_amplitude(mut self, spike_amplitude: f64) -> Self {
        self.spike_amplitude = spike_amplitude;
        self
    }

    pub fn with_silence(mut self, with_silence: bool) -> Self {
        self.leading_silence = with_silence;
        self
    }

    /// Returns the stimulus of every trace: the optional silence, then every (intensity, frequency) pair.
    pub fn stimuli(&self) -> Result<Vec<StimulusDescriptor>, AnalysisError> {
        let silence = self
            .leading_silence
            .then(|| Ok(StimulusDescriptor::silence()));
        let tones = self.intensities.iter().flat_map(|&intensity| {
            self.frequencies
                .iter()
                .map(move |&frequency| StimulusDescriptor::build(StimType::Tone, frequency, intensity))
        });
        silence.into_iter().chain(tones).collect()
    }

    /// Sample a trial block and its stimuli.
    /// The expected number of spikes per repetition of a tone is given by `rate` as a function of the frequency (in kHz)
    /// and the intensity (in dB); silence traces contain noise only.
    pub fn rand<F, R>(&self, rate: F, rng: &mut R) -> Result<(TrialBlock, Vec<StimulusDescriptor>), AnalysisError>
    where
        F: Fn(f64, f64) -> f64,
        R: Rng,
    {
        let stimuli = self.stimuli()?;

        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(AnalysisError::InvalidParameter(
                "The trace duration must be positive".to_string(),
            ));
        }
        let noise = Normal::new(0.0, self.noise_std)
            .map_err(|e| AnalysisError::InvalidParameter(e.to_string()))?;

        let num_samples = (self.duration * self.sample_rate).round() as usize;
        let slot_len = (SPIKE_SLOT * self.sample_rate).round() as usize;
        if slot_len < SPIKE_WAVEFORM.len() {
            return Err(AnalysisError::InvalidParameter(
                "The sample rate is too low for the spike waveform".to_string(),
            ));
        }
        // The first slot starts one slot after the trace onset, the last one ends before the trace offset
        let num_slots = (num_samples / slot_len).saturating_sub(1);

        let mut data = Vec::with_capacity(
            stimuli.len() * self.num_repetitions * self.num_channels * num_samples,
        );
        for stimulus in stimuli.iter() {
            let expected = if stimulus.is_silence() {
                0.0
            } else {
                rate(stimulus.frequency_khz(), stimulus.intensity())
            };
            if !expected.is_finite() || expected < 0.0 {
                return Err(AnalysisError::InvalidParameter(format!(
                    "The expected number of spikes must be non-negative, got {}",
                    expected
                )));
            }
            let num_spikes = match expected > 0.0 {
                true => Some(
                    Poisson::new(expected)
                        .map_err(|e| AnalysisError::InvalidParameter(e.to_string()))?,
                ),
                false => None,
            };

            for _ in 0..self.num_repetitions * self.num_channels {
                let mut samples: Vec<f64> = (0..num_samples).map(|_| noise.sample(rng)).collect();

                let n = num_spikes
                    .as_ref()
                    .map_or(0, |poisson| poisson.sample(rng) as usize)
                    .min(num_slots);
                for slot in sample(rng, num_slots, n).into_iter() {
                    let onset = (slot + 1) * slot_len;
                    for (k, w) in SPIKE_WAVEFORM.iter().enumerate() {
                        samples[onset + k] += w * self.spike_amplitude;
                    }
                }

                data.extend(samples);
            }
        }

        let shape = match self.num_channels {
            1 => vec![stimuli.len(), self.num_repetitions, num_samples],
            _ => vec![stimuli.len(), self.num_repetitions, self.num_channels, num_samples],
        };
        let block = TrialBlock::build(shape, data, self.sample_rate)?;

        Ok((block, stimuli))
    }
}
