//! Spike train statistics: firing rate, first-spike latency and post-stimulus time histograms.
use serde::{Deserialize, Serialize};

use super::error::AnalysisError;

/// Number of decimals kept when mapping a spike time to a bin, to absorb floating point errors (e.g., 0.3 / 0.1).
const BIN_DECIMALS: i32 = 5;

/// Returns the number of spikes per second over the given window (in seconds).
/// Returns an error if the window is not positive.
pub fn firing_rate(spike_times: &[f64], window: f64) -> Result<f64, AnalysisError> {
    if !window.is_finite() || window <= 0.0 {
        return Err(AnalysisError::DegenerateWindow(window));
    }
    Ok(spike_times.len() as f64 / window)
}

/// Returns the time of the first spike, or NaN if there is none.
/// NaN means "no response" and must never be read as a zero latency.
pub fn first_latency(spike_times: &[f64]) -> f64 {
    spike_times.first().copied().unwrap_or(f64::NAN)
}

/// Maps every spike time to the index of its time bin.
/// Spikes beyond the last bin are assigned to the last bin, so that no spike is lost.
pub fn bin_spikes(
    spike_times: &[f64],
    bin_width: f64,
    num_bins: usize,
) -> Result<Vec<usize>, AnalysisError> {
    if !bin_width.is_finite() || bin_width <= 0.0 {
        return Err(AnalysisError::InvalidParameter(
            "The bin width must be positive".to_string(),
        ));
    }
    if num_bins == 0 {
        return Err(AnalysisError::InvalidParameter(
            "The number of bins must be positive".to_string(),
        ));
    }

    let scale = 10_f64.powi(BIN_DECIMALS);
    spike_times
        .iter()
        .map(|&time| {
            if !time.is_finite() || time < 0.0 {
                return Err(AnalysisError::InvalidParameter(format!(
                    "Spike times must be finite and non-negative, got {}",
                    time
                )));
            }
            let index = ((time / bin_width * scale).round() / scale).floor();
            Ok((index as usize).min(num_bins - 1))
        })
        .collect()
}

/// A post-stimulus time histogram, accumulating spike counts per time bin over repeated presentations.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Psth {
    /// The width of a time bin (in seconds).
    bin_width: f64,
    /// The number of spikes per bin.
    counts: Vec<usize>,
}

impl Psth {
    /// Create an empty histogram with the given bin width (in seconds) and number of bins.
    pub fn new(bin_width: f64, num_bins: usize) -> Result<Self, AnalysisError> {
        // Validate the parameters the same way as bin_spikes
        bin_spikes(&[], bin_width, num_bins)?;
        Ok(Psth {
            bin_width,
            counts: vec![0; num_bins],
        })
    }

    /// Add the spikes of one presentation to the histogram.
    pub fn append(&mut self, spike_times: &[f64]) -> Result<(), AnalysisError> {
        for index in bin_spikes(spike_times, self.bin_width, self.counts.len())? {
            self.counts[index] += 1;
        }
        Ok(())
    }

    /// Reset all counts, keeping the bins.
    pub fn clear(&mut self) {
        self.counts.iter_mut().for_each(|count| *count = 0);
    }

    /// Returns the spike count of every bin.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Returns the number of bins.
    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    /// Returns the bin width (in seconds).
    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// Returns the center time of every bin.
    pub fn bin_centers(&self) -> Vec<f64> {
        (0..self.counts.len())
            .map(|i| (i as f64 + 0.5) * self.bin_width)
            .collect()
    }

    /// Returns the total number of spikes in the histogram.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_firing_rate() {
        assert_eq!(firing_rate(&[], 0.2), Ok(0.0));
        assert_relative_eq!(firing_rate(&[0.01, 0.05, 0.1], 0.5).unwrap(), 6.0);
        assert_eq!(
            firing_rate(&[0.01], 0.0),
            Err(AnalysisError::DegenerateWindow(0.0))
        );
        assert_eq!(
            firing_rate(&[], -1.0),
            Err(AnalysisError::DegenerateWindow(-1.0))
        );
    }

    #[test]
    fn test_first_latency() {
        assert_eq!(first_latency(&[0.012, 0.05]), 0.012);
        assert!(first_latency(&[]).is_nan());
    }

    #[test]
    fn test_bin_spikes() {
        assert_eq!(
            bin_spikes(&[0.0, 0.05, 0.1, 0.3, 0.45], 0.1, 10),
            Ok(vec![0, 0, 1, 3, 4])
        );
        assert_eq!(bin_spikes(&[], 0.1, 10), Ok(vec![]));
        assert!(matches!(
            bin_spikes(&[0.1], 0.0, 10),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            bin_spikes(&[0.1], 0.1, 0),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            bin_spikes(&[-0.1], 0.1, 10),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_bin_spikes_saturates() {
        assert_eq!(
            bin_spikes(&[0.05, 0.25, 1.0, 42.0], 0.1, 3),
            Ok(vec![0, 2, 2, 2])
        );
    }

    #[test]
    fn test_psth() {
        let mut psth = Psth::new(0.01, 5).unwrap();
        let spike_times = vec![0.001, 0.015, 0.016, 0.2, 0.7];
        psth.append(&spike_times).unwrap();
        psth.append(&[0.035]).unwrap();

        assert_eq!(psth.counts(), &[1, 2, 0, 1, 2]);
        assert_eq!(psth.total(), spike_times.len() + 1);

        let centers = psth.bin_centers();
        assert_eq!(centers.len(), 5);
        assert_relative_eq!(centers[0], 0.005);
        assert_relative_eq!(centers[4], 0.045);

        psth.clear();
        assert_eq!(psth.counts(), &[0; 5]);
        assert_eq!(psth.num_bins(), 5);
    }
}
