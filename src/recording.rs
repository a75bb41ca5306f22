//! Access to recorded trial blocks and their stimuli.
//!
//! The analysis does not depend on how recordings are stored: any storage providing a trial block and
//! the per-trace stimuli implements [`RecordingSource`]. [`JsonRecording`] reads a self-contained JSON document.
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::error::AnalysisError;
use super::stimulus::{to_descriptors, StimulusDescriptor, TraceStimulus};
use super::trial::TrialBlock;

/// A source of recorded data for one test, i.e., one trial block with its stimuli.
pub trait RecordingSource {
    /// Returns the recorded voltage traces.
    fn trial_block(&self) -> &TrialBlock;

    /// Returns the stimulus of every trace of the trial block.
    fn stimuli(&self) -> &[StimulusDescriptor];

    /// Returns the free-form comment of the recording, if any.
    fn comment(&self) -> Option<&str> {
        None
    }
}

/// The JSON layout of a recording.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct JsonLayout {
    /// The number of samples per second.
    pub sample_rate: f64,
    /// The trial block dimensions, (trace, repetition, sample) or (trace, repetition, channel, sample).
    pub shape: Vec<usize>,
    /// The samples, in row-major order.
    pub data: Vec<f64>,
    /// The stimulus of every trace.
    pub stim: Vec<TraceStimulus>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A recording read from JSON, validated once at load time.
#[derive(Debug, PartialEq, Clone)]
pub struct JsonRecording {
    block: TrialBlock,
    stimuli: Vec<StimulusDescriptor>,
    comment: Option<String>,
}

impl JsonRecording {
    /// Validate a recording layout.
    /// Returns an error if the trial block is invalid, if a stimulus is invalid, or if there is not exactly one stimulus per trace.
    pub fn build(layout: JsonLayout) -> Result<Self, AnalysisError> {
        let block = TrialBlock::build(layout.shape, layout.data, layout.sample_rate)?;
        let stimuli = to_descriptors(&layout.stim)?;

        if stimuli.len() != block.num_traces() {
            return Err(AnalysisError::InputShape(format!(
                "{} stimuli for {} traces",
                stimuli.len(),
                block.num_traces()
            )));
        }

        Ok(JsonRecording {
            block,
            stimuli,
            comment: layout.comment,
        })
    }

    /// Read a recording from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AnalysisError> {
        let layout: JsonLayout = serde_json::from_reader(reader)?;
        JsonRecording::build(layout)
    }

    /// Read a recording from a file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let file = File::open(path)?;
        JsonRecording::from_reader(BufReader::new(file))
    }

    /// Returns the trial block, the stimuli and the comment of the recording.
    pub fn into_parts(self) -> (TrialBlock, Vec<StimulusDescriptor>, Option<String>) {
        (self.block, self.stimuli, self.comment)
    }
}

impl RecordingSource for JsonRecording {
    fn trial_block(&self) -> &TrialBlock {
        &self.block
    }

    fn stimuli(&self) -> &[StimulusDescriptor] {
        &self.stimuli
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::StimType;

    #[test]
    fn test_json_recording_from_reader() {
        let json = r#"{
            "sample_rate": 1000.0,
            "shape": [2, 1, 3],
            "data": [0.0, 0.1, 0.2, 1.0, 1.1, 1.2],
            "stim": [
                {"components": [{"stim_type": "silence"}]},
                {"components": [{"stim_type": "Pure Tone", "frequency": 3000, "intensity": 70}]}
            ],
            "comment": "left cortex"
        }"#;
        let recording = JsonRecording::from_reader(json.as_bytes()).unwrap();

        assert_eq!(recording.trial_block().shape(), &[2, 1, 3]);
        assert_eq!(recording.trial_block().trace(1, 0, 0), Ok(&[1.0, 1.1, 1.2][..]));
        assert_eq!(recording.stimuli().len(), 2);
        assert_eq!(
            recording.stimuli()[1],
            StimulusDescriptor::build(StimType::Tone, 3000.0, 70.0).unwrap()
        );
        assert_eq!(recording.comment(), Some("left cortex"));
    }

    #[test]
    fn test_json_recording_errors() {
        // One stimulus for two traces
        let json = r#"{
            "sample_rate": 1000.0,
            "shape": [2, 1, 1],
            "data": [0.0, 0.0],
            "stim": [{"components": [{"stim_type": "silence"}]}]
        }"#;
        assert!(matches!(
            JsonRecording::from_reader(json.as_bytes()),
            Err(AnalysisError::InputShape(_))
        ));

        // Two-dimensional block
        let json = r#"{"sample_rate": 1000.0, "shape": [2, 1], "data": [0.0, 0.0], "stim": []}"#;
        assert!(matches!(
            JsonRecording::from_reader(json.as_bytes()),
            Err(AnalysisError::InputShape(_))
        ));

        // The number of samples overflows
        let json = r#"{"sample_rate": 1000.0, "shape": [4294967296, 4294967296, 1], "data": [], "stim": []}"#;
        assert!(matches!(
            JsonRecording::from_reader(json.as_bytes()),
            Err(AnalysisError::InputShape(_))
        ));

        assert!(matches!(
            JsonRecording::from_reader("{}".as_bytes()),
            Err(AnalysisError::IOError(_))
        ));
        assert!(matches!(
            JsonRecording::from_path("/nonexistent/recording.json"),
            Err(AnalysisError::IOError(_))
        ));
    }
}
