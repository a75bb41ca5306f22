//! Error module for the tuning curves library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum AnalysisError {
    /// Error for a trial block whose layout is neither (trace, repetition, sample) nor (trace, repetition, channel, sample).
    InputShape(String),
    /// Error for a trace/channel pair without any repetition to aggregate.
    EmptyRepetition { trace: usize, channel: usize },
    /// Error for a (frequency, intensity) condition missing from an otherwise regular stimulus grid.
    IncompleteGrid { frequency: f64, intensity: f64 },
    /// Error for a firing rate requested over a zero, negative or non-finite window.
    DegenerateWindow(f64),
    /// Error for a stimulus condition presented on several traces when duplicates are not allowed.
    DuplicateCondition { frequency: f64, intensity: f64 },
    /// Error for out of bounds access, e.g., trace or channel not found.
    OutOfBounds(String),
    /// Error for invalid parameters.
    InvalidParameter(String),
    /// Error for I/O operations.
    IOError(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnalysisError::InputShape(e) => write!(f, "Invalid trial block shape: {}", e),
            AnalysisError::EmptyRepetition { trace, channel } => write!(
                f,
                "No repetition to aggregate for trace {} on channel {}",
                trace, channel
            ),
            AnalysisError::IncompleteGrid {
                frequency,
                intensity,
            } => write!(
                f,
                "Incomplete stimulus grid: no presentation at {} kHz and {} dB",
                frequency, intensity
            ),
            AnalysisError::DegenerateWindow(window) => write!(
                f,
                "Degenerate window: firing rate requires a positive window, got {}",
                window
            ),
            AnalysisError::DuplicateCondition {
                frequency,
                intensity,
            } => write!(
                f,
                "Duplicate stimulus condition: {} kHz and {} dB presented on several traces",
                frequency, intensity
            ),
            AnalysisError::OutOfBounds(e) => write!(f, "Index out of bounds: {}", e),
            AnalysisError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            AnalysisError::IOError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for AnalysisError {}

impl From<std::io::Error> for AnalysisError {
    fn from(e: std::io::Error) -> Self {
        AnalysisError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::IOError(e.to_string())
    }
}
