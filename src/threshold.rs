//! Estimation of a default detection threshold from the recorded amplitudes.
use log::debug;

use super::error::AnalysisError;
use super::trial::TrialBlock;

/// Returns a detection threshold for a trace on a channel: the largest absolute amplitude of every repetition,
/// averaged over repetitions and scaled by the given fraction (see AUTO_THRESHOLD_FRACTION).
/// Returns an error if the fraction is not positive or if the trace has no repetition.
pub fn estimate_threshold(
    block: &TrialBlock,
    trace: usize,
    channel: usize,
    fraction: f64,
) -> Result<f64, AnalysisError> {
    if !fraction.is_finite() || fraction <= 0.0 {
        return Err(AnalysisError::InvalidParameter(
            "The threshold fraction must be positive".to_string(),
        ));
    }

    let repetitions = block.repetitions(trace, channel)?;
    if repetitions.is_empty() {
        return Err(AnalysisError::EmptyRepetition { trace, channel });
    }

    let average_max = repetitions
        .iter()
        .map(|samples| samples.iter().fold(0.0_f64, |acc, x| acc.max(x.abs())))
        .sum::<f64>()
        / repetitions.len() as f64;

    let threshold = fraction * average_max;
    debug!(
        "Estimated threshold {} on trace {} and channel {}",
        threshold, trace, channel
    );
    Ok(threshold)
}
