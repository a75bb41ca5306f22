//! Frequency-intensity tuning curves, i.e., mean spike counts per stimulus condition arranged on a grid.
//!
//! Every non-silence trace of a trial block defines a condition (frequency in kHz, intensity in dB).
//! The mean spike count of each trace is stored in a [`SpikeCountTable`], which is then laid out as a dense grid
//! with one row per intensity and one column per frequency, both sorted in ascending order.
use itertools::Itertools;
use log::{debug, info, warn};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::detector::SpikeDetector;
use super::error::AnalysisError;
use super::stimulus::StimulusDescriptor;
use super::trial::{average_spike_count, TrialBlock};
use super::MIN_PARALLEL_TRACES;

/// What to do when several traces present the same stimulus condition.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Keep the trace with the largest index.
    #[default]
    Overwrite,
    /// Average the mean spike counts of all traces.
    Average,
    /// Fail with a DuplicateCondition error.
    Error,
}

/// What to do with grid cells whose condition was never presented.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum MissingPolicy {
    /// Fail with an IncompleteGrid error.
    #[default]
    Error,
    /// Mark the cell with NaN.
    Nan,
}

/// Options for building a tuning curve.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TuningOptions {
    pub duplicates: DuplicatePolicy,
    pub missing: MissingPolicy,
}

#[derive(Debug, PartialEq, Clone)]
struct Condition {
    frequency: f64,
    intensity: f64,
    mean_spike_count: f64,
    num_traces: usize,
}

/// Key of a condition, with -0.0 and 0.0 identified.
fn condition_key(frequency: f64, intensity: f64) -> (u64, u64) {
    ((frequency + 0.0).to_bits(), (intensity + 0.0).to_bits())
}

/// Sorts values in ascending order and removes duplicates.
fn sorted_unique(values: impl Iterator<Item = f64>) -> Vec<f64> {
    values.sorted_by(|a, b| a.total_cmp(b)).dedup().collect()
}

/// Mean spike counts indexed by stimulus condition (frequency in kHz, intensity in dB).
#[derive(Debug, PartialEq, Clone, Default)]
pub struct SpikeCountTable {
    conditions: HashMap<(u64, u64), Condition>,
}

impl SpikeCountTable {
    /// Create an empty table.
    pub fn new() -> Self {
        SpikeCountTable::default()
    }

    /// Insert the mean spike count of a trace presenting the given condition.
    /// If the condition is already in the table, the duplicate policy applies.
    pub fn insert(
        &mut self,
        frequency: f64,
        intensity: f64,
        mean_spike_count: f64,
        policy: DuplicatePolicy,
    ) -> Result<(), AnalysisError> {
        match self.conditions.entry(condition_key(frequency, intensity)) {
            Entry::Vacant(entry) => {
                entry.insert(Condition {
                    frequency,
                    intensity,
                    mean_spike_count,
                    num_traces: 1,
                });
            }
            Entry::Occupied(mut entry) => {
                let condition = entry.get_mut();
                match policy {
                    DuplicatePolicy::Overwrite => {
                        warn!(
                            "Condition ({} kHz, {} dB) presented again, overwriting {} with {}",
                            frequency, intensity, condition.mean_spike_count, mean_spike_count
                        );
                        condition.mean_spike_count = mean_spike_count;
                    }
                    DuplicatePolicy::Average => {
                        let n = condition.num_traces as f64;
                        condition.mean_spike_count =
                            (condition.mean_spike_count * n + mean_spike_count) / (n + 1.0);
                    }
                    DuplicatePolicy::Error => {
                        return Err(AnalysisError::DuplicateCondition {
                            frequency,
                            intensity,
                        });
                    }
                }
                condition.num_traces += 1;
            }
        }
        Ok(())
    }

    /// Returns the mean spike count of a condition, if presented.
    pub fn get(&self, frequency: f64, intensity: f64) -> Option<f64> {
        self.conditions
            .get(&condition_key(frequency, intensity))
            .map(|condition| condition.mean_spike_count)
    }

    /// Returns the number of traces which presented a condition (0 if never presented).
    pub fn num_traces(&self, frequency: f64, intensity: f64) -> usize {
        self.conditions
            .get(&condition_key(frequency, intensity))
            .map_or(0, |condition| condition.num_traces)
    }

    /// Returns the number of distinct conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns the distinct frequencies (in kHz), sorted in ascending order.
    pub fn frequencies(&self) -> Vec<f64> {
        sorted_unique(self.conditions.values().map(|condition| condition.frequency))
    }

    /// Returns the distinct intensities (in dB), sorted in ascending order.
    pub fn intensities(&self) -> Vec<f64> {
        sorted_unique(self.conditions.values().map(|condition| condition.intensity))
    }
}

/// A tuning curve: the mean spike count for every (intensity, frequency) pair on a dense grid.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct TuningCurve {
    /// The frequencies (in kHz) labelling the grid columns, in ascending order.
    frequencies: Vec<f64>,
    /// The intensities (in dB) labelling the grid rows, in ascending order.
    intensities: Vec<f64>,
    /// The mean spike counts, with one row per intensity and one column per frequency.
    grid: DMatrix<f64>,
}

impl TuningCurve {
    /// Build the tuning curve of a channel with the default options, see `build_tuning_curve`.
    pub fn build(
        block: &TrialBlock,
        stimuli: &[StimulusDescriptor],
        channel: usize,
        detector: &SpikeDetector,
    ) -> Result<Self, AnalysisError> {
        build_tuning_curve(block, stimuli, channel, detector, TuningOptions::default())
    }

    /// Lay out a spike count table on a dense grid.
    /// Cells without presented condition follow the missing policy; they are never set to zero.
    pub fn from_table(table: &SpikeCountTable, missing: MissingPolicy) -> Result<Self, AnalysisError> {
        let frequencies = table.frequencies();
        let intensities = table.intensities();

        let mut grid = DMatrix::from_element(intensities.len(), frequencies.len(), f64::NAN);
        for (row, &intensity) in intensities.iter().enumerate() {
            for (col, &frequency) in frequencies.iter().enumerate() {
                match (table.get(frequency, intensity), missing) {
                    (Some(mean_spike_count), _) => grid[(row, col)] = mean_spike_count,
                    (None, MissingPolicy::Error) => {
                        return Err(AnalysisError::IncompleteGrid {
                            frequency,
                            intensity,
                        })
                    }
                    (None, MissingPolicy::Nan) => {
                        warn!(
                            "Condition ({} kHz, {} dB) never presented, marked as NaN",
                            frequency, intensity
                        );
                    }
                }
            }
        }

        Ok(TuningCurve {
            frequencies,
            intensities,
            grid,
        })
    }

    /// Returns the frequencies (in kHz) of the grid columns.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Returns the intensities (in dB) of the grid rows.
    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    /// Returns the grid of mean spike counts (intensities x frequencies).
    pub fn grid(&self) -> &DMatrix<f64> {
        &self.grid
    }

    /// Returns the mean spike count at the given frequency (in kHz) and intensity (in dB), if on the grid.
    pub fn get(&self, frequency: f64, intensity: f64) -> Option<f64> {
        let col = self.frequencies.iter().position(|&f| f == frequency)?;
        let row = self.intensities.iter().position(|&i| i == intensity)?;
        Some(self.grid[(row, col)])
    }

    /// Returns true if no condition was presented.
    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }
}

/// Returns the tuning curve of a channel, aggregating every non-silence trace of the block.
///
/// The stimuli must describe every trace of the block, in order.
/// Duplicate conditions and missing grid cells are handled according to the options.
pub fn build_tuning_curve(
    block: &TrialBlock,
    stimuli: &[StimulusDescriptor],
    channel: usize,
    detector: &SpikeDetector,
    options: TuningOptions,
) -> Result<TuningCurve, AnalysisError> {
    if stimuli.len() != block.num_traces() {
        return Err(AnalysisError::InputShape(format!(
            "{} stimuli for {} traces",
            stimuli.len(),
            block.num_traces()
        )));
    }
    if channel >= block.num_channels() {
        return Err(AnalysisError::OutOfBounds(format!(
            "channel {} (the block has {} channels)",
            channel,
            block.num_channels()
        )));
    }

    let traces: Vec<usize> = stimuli
        .iter()
        .positions(|stimulus| !stimulus.is_silence())
        .collect();

    let mean_spike_counts: Vec<f64> = if traces.len() >= MIN_PARALLEL_TRACES {
        traces
            .par_iter()
            .map(|&trace| average_spike_count(block, trace, channel, detector))
            .collect::<Result<Vec<f64>, AnalysisError>>()?
    } else {
        traces
            .iter()
            .map(|&trace| average_spike_count(block, trace, channel, detector))
            .collect::<Result<Vec<f64>, AnalysisError>>()?
    };

    // Merge in trace order, so that overwriting keeps the last trace
    let mut table = SpikeCountTable::new();
    for (&trace, mean_spike_count) in traces.iter().zip_eq(mean_spike_counts) {
        let stimulus = &stimuli[trace];
        debug!(
            "Trace {}: {} kHz, {} dB, {} spikes per repetition",
            trace,
            stimulus.frequency_khz(),
            stimulus.intensity(),
            mean_spike_count
        );
        table.insert(
            stimulus.frequency_khz(),
            stimulus.intensity(),
            mean_spike_count,
            options.duplicates,
        )?;
    }

    let curve = TuningCurve::from_table(&table, options.missing)?;
    info!(
        "Tuning curve of channel {}: {} intensities x {} frequencies from {} traces",
        channel,
        curve.intensities().len(),
        curve.frequencies().len(),
        traces.len()
    );
    Ok(curve)
}
