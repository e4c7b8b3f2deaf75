use thiserror::Error;

use crate::magnet::conversion::ConversionError;

/// Which edge of the ramp a `rampup_change`/`rampdown_change` refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RampEdge {
    Up,
    Down,
}

impl std::fmt::Display for RampEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RampEdge::Up => write!(f, "rampup"),
            RampEdge::Down => write!(f, "rampdown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WaveformError {
    #[error("{name} {index} outside [{lower}, {upper}]")]
    InvalidBoundary {
        name: &'static str,
        index: usize,
        lower: usize,
        upper: usize,
    },

    #[error("plateau value {value} below adjacent ramp value {adjacent}")]
    InvalidPlateau { value: f64, adjacent: f64 },

    #[error("invalid {edge} parameters: {reason}")]
    InvalidRampParameters { edge: RampEdge, reason: String },

    #[error("no monotonic transition for {boundary} in [{lower}, {upper}]")]
    NoSolution {
        boundary: &'static str,
        lower: usize,
        upper: usize,
    },

    #[error("strength array has {actual} points, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid waveform parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl WaveformError {
    pub(crate) fn ramp(edge: RampEdge, reason: impl Into<String>) -> WaveformError {
        WaveformError::InvalidRampParameters { edge, reason: reason.into() }
    }
}
