use serde::{
    Deserialize,
    Serialize
};

use crate::ramp::waveformerror::WaveformError;

pub const DEFAULT_WFM_NRPOINTS: usize = 4000;

/// Ramp duration [s].
pub const DEFAULT_DURATION: f64 = 0.490;

pub const DEFAULT_START_VALUE: f64 = 0.01;

pub const DEFAULT_STOP_VALUE: f64 = 0.01;

pub const DEFAULT_BOUNDARY_INDICES: [usize; 8] = [1, 104, 2480, 2576, 2640, 2736, 3840, 3999];

pub const DEFAULT_BOUNDARY_VALUES: [f64; 8] = [
    0.01,
    0.02625,
    1.03393,
    1.05,
    1.05,
    1.0,
    0.07,
    0.01,
];

/// Stored shape of a ramp, as kept by the configuration layer.
///
/// Values are in units of the waveform scale; for the dipole 1.0 is the
/// ejection energy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RampParameters {
    pub start_value: f64,
    pub stop_value: f64,
    pub boundary_indices: [usize; 8],
    pub boundary_values: [f64; 8],
    pub wfm_nrpoints: usize,
    pub duration: f64,
}

impl Default for RampParameters {
    fn default() -> Self {
        RampParameters {
            start_value: DEFAULT_START_VALUE,
            stop_value: DEFAULT_STOP_VALUE,
            boundary_indices: DEFAULT_BOUNDARY_INDICES,
            boundary_values: DEFAULT_BOUNDARY_VALUES,
            wfm_nrpoints: DEFAULT_WFM_NRPOINTS,
            duration: DEFAULT_DURATION,
        }
    }
}

impl RampParameters {
    /// Parses a (possibly partial) JSON object; missing fields keep their
    /// defaults.
    pub fn from_json(json_value: serde_json::Value) -> Result<RampParameters, WaveformError> {
        serde_json::from_value(json_value)
            .map_err(|error| WaveformError::InvalidParameters(error.to_string()))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "start_value": self.start_value,
            "stop_value": self.stop_value,
            "boundary_indices": self.boundary_indices,
            "boundary_values": self.boundary_values,
            "wfm_nrpoints": self.wfm_nrpoints,
            "duration": self.duration,
        })
    }

    /// Checks the construction inputs: at least two samples, a positive
    /// duration, finite values and `0 <= i0 < i1 < ... < i7 <= N`.
    pub fn validate(&self) -> Result<(), WaveformError> {
        if self.wfm_nrpoints < 2 {
            return Err(WaveformError::InvalidParameters(format!(
                "wfm_nrpoints must be at least 2, got {}",
                self.wfm_nrpoints
            )));
        }
        if !(self.duration > 0.0) || !self.duration.is_finite() {
            return Err(WaveformError::InvalidParameters(format!(
                "duration must be positive, got {}",
                self.duration
            )));
        }
        let all_finite = self
            .boundary_values
            .iter()
            .chain([&self.start_value, &self.stop_value])
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(WaveformError::InvalidParameters("non-finite boundary value".to_owned()));
        }

        let mut lower = 0;
        for (k, &index) in self.boundary_indices.iter().enumerate() {
            if index < lower || index > self.wfm_nrpoints {
                return Err(WaveformError::InvalidBoundary {
                    name: BOUNDARY_NAMES[k],
                    index,
                    lower,
                    upper: self.wfm_nrpoints,
                });
            }
            lower = index + 1;
        }
        Ok(())
    }
}

pub(crate) const BOUNDARY_NAMES: [&str; 8] = [
    "i0",
    "rampup_start_index",
    "rampup_stop_index",
    "plateau_start_index",
    "plateau_stop_index",
    "rampdown_start_index",
    "rampdown_stop_index",
    "i7",
];
