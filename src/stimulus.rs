//! Typed stimulus descriptors, one per trace of a trial block.
//!
//! Recordings describe the stimulus of every trace as a list of components; only the first component is used for analysis.
//!
//! ```rust
//! use tuning_curves::stimulus::{parse_stimuli, StimType};
//!
//! let json = r#"[
//!     {"components": [{"stim_type": "silence", "intensity": 0}]},
//!     {"components": [{"stim_type": "Pure Tone", "frequency": 8000, "intensity": 60}]}
//! ]"#;
//! let stimuli = parse_stimuli(json).unwrap();
//!
//! assert_eq!(stimuli[0].stim_type(), &StimType::Silence);
//! assert_eq!(stimuli[1].stim_type(), &StimType::Tone);
//! assert_eq!(stimuli[1].frequency_khz(), 8.0);
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::AnalysisError;

/// The kind of stimulus presented on a trace.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StimType {
    Silence,
    Tone,
    /// Any other stimulus, e.g., vocalizations or noise bursts.
    Other(String),
}

impl StimType {
    pub fn is_silence(&self) -> bool {
        *self == StimType::Silence
    }
}

impl From<String> for StimType {
    fn from(name: String) -> Self {
        match name.trim().to_lowercase().as_str() {
            "silence" => StimType::Silence,
            "tone" | "pure tone" | "puretone" => StimType::Tone,
            _ => StimType::Other(name),
        }
    }
}

impl From<&str> for StimType {
    fn from(name: &str) -> Self {
        StimType::from(name.to_string())
    }
}

impl From<StimType> for String {
    fn from(stim_type: StimType) -> Self {
        stim_type.to_string()
    }
}

impl fmt::Display for StimType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StimType::Silence => write!(f, "silence"),
            StimType::Tone => write!(f, "Pure Tone"),
            StimType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// The stimulus presented on a trace.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct StimulusDescriptor {
    stim_type: StimType,
    /// Frequency (in Hz), meaningless for silence.
    frequency: f64,
    /// Intensity (in dB), meaningless for silence.
    intensity: f64,
}

impl StimulusDescriptor {
    /// Create a new stimulus descriptor.
    /// Returns an error if the frequency or the intensity is not finite, or if the frequency is negative.
    pub fn build(stim_type: StimType, frequency: f64, intensity: f64) -> Result<Self, AnalysisError> {
        if !frequency.is_finite() || frequency < 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "The stimulus frequency must be finite and non-negative, got {}",
                frequency
            )));
        }
        if !intensity.is_finite() {
            return Err(AnalysisError::InvalidParameter(format!(
                "The stimulus intensity must be finite, got {}",
                intensity
            )));
        }

        Ok(StimulusDescriptor {
            stim_type,
            frequency,
            intensity,
        })
    }

    /// Create a silence descriptor.
    pub fn silence() -> Self {
        StimulusDescriptor {
            stim_type: StimType::Silence,
            frequency: 0.0,
            intensity: 0.0,
        }
    }

    /// Returns the stimulus type.
    pub fn stim_type(&self) -> &StimType {
        &self.stim_type
    }

    /// Returns the frequency (in Hz).
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Returns the frequency (in kHz).
    pub fn frequency_khz(&self) -> f64 {
        self.frequency / 1000.0
    }

    /// Returns the intensity (in dB).
    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn is_silence(&self) -> bool {
        self.stim_type.is_silence()
    }
}

/// One component of the stimulus of a trace, as stored in recordings.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct StimulusComponent {
    pub stim_type: String,
    #[serde(default)]
    pub frequency: Option<f64>,
    #[serde(default)]
    pub intensity: Option<f64>,
}

/// The stimulus of a trace, as stored in recordings.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TraceStimulus {
    pub components: Vec<StimulusComponent>,
}

impl TryFrom<&TraceStimulus> for StimulusDescriptor {
    type Error = AnalysisError;

    fn try_from(stimulus: &TraceStimulus) -> Result<Self, Self::Error> {
        let component = stimulus.components.first().ok_or_else(|| {
            AnalysisError::InvalidParameter("A trace stimulus has no component".to_string())
        })?;

        let stim_type = StimType::from(component.stim_type.as_str());
        if stim_type.is_silence() {
            return Ok(StimulusDescriptor::silence());
        }

        match (component.frequency, component.intensity) {
            (Some(frequency), Some(intensity)) => {
                StimulusDescriptor::build(stim_type, frequency, intensity)
            }
            _ => Err(AnalysisError::InvalidParameter(format!(
                "A {} stimulus requires a frequency and an intensity",
                stim_type
            ))),
        }
    }
}

/// Converts the per-trace stimuli of a recording into typed descriptors.
pub fn to_descriptors(stimuli: &[TraceStimulus]) -> Result<Vec<StimulusDescriptor>, AnalysisError> {
    stimuli.iter().map(StimulusDescriptor::try_from).collect()
}

/// Parses the per-trace stimuli of a recording from JSON into typed descriptors.
pub fn parse_stimuli(json: &str) -> Result<Vec<StimulusDescriptor>, AnalysisError> {
    let stimuli: Vec<TraceStimulus> = serde_json::from_str(json)?;
    to_descriptors(&stimuli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stim_type_from_str() {
        assert_eq!(StimType::from("silence"), StimType::Silence);
        assert_eq!(StimType::from(" Silence "), StimType::Silence);
        assert_eq!(StimType::from("Pure Tone"), StimType::Tone);
        assert_eq!(StimType::from("tone"), StimType::Tone);
        assert_eq!(
            StimType::from("Vocalization"),
            StimType::Other("Vocalization".to_string())
        );
    }

    #[test]
    fn test_descriptor_build() {
        let stimulus = StimulusDescriptor::build(StimType::Tone, 12_500.0, 40.0).unwrap();
        assert_eq!(stimulus.frequency(), 12_500.0);
        assert_eq!(stimulus.frequency_khz(), 12.5);
        assert_eq!(stimulus.intensity(), 40.0);
        assert!(!stimulus.is_silence());

        assert!(matches!(
            StimulusDescriptor::build(StimType::Tone, f64::NAN, 40.0),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            StimulusDescriptor::build(StimType::Tone, -1.0, 40.0),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            StimulusDescriptor::build(StimType::Tone, 1000.0, f64::INFINITY),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_parse_stimuli() {
        let json = r#"[
            {"components": [{"stim_type": "silence"}]},
            {"components": [{"stim_type": "Pure Tone", "frequency": 5000.0, "intensity": 20, "duration": 0.2}]},
            {"components": [
                {"stim_type": "Pure Tone", "frequency": 10000.0, "intensity": 30},
                {"stim_type": "silence"}
            ]}
        ]"#;
        let stimuli = parse_stimuli(json).unwrap();

        assert_eq!(stimuli.len(), 3);
        assert_eq!(stimuli[0], StimulusDescriptor::silence());
        assert_eq!(
            stimuli[1],
            StimulusDescriptor::build(StimType::Tone, 5000.0, 20.0).unwrap()
        );
        assert_eq!(
            stimuli[2],
            StimulusDescriptor::build(StimType::Tone, 10_000.0, 30.0).unwrap()
        );
    }

    #[test]
    fn test_parse_stimuli_errors() {
        assert!(matches!(
            parse_stimuli(r#"[{"components": []}]"#),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            parse_stimuli(r#"[{"components": [{"stim_type": "Pure Tone", "intensity": 20}]}]"#),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            parse_stimuli("not json"),
            Err(AnalysisError::IOError(_))
        ));
    }
}
