use thiserror::Error;

/// Domain errors of the strength/current conversion.
///
/// Ramp objects never recover from these; they are handed back unchanged to
/// whoever asked for the derived array.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("value {value} outside calibration range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("magnet '{0}' needs the dipole strengths for normalization")]
    MissingDipole(String),

    #[error("auxiliary strengths have length {actual}, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("beam energy {0} GeV is below the electron rest energy")]
    InvalidEnergy(f64),

    #[error("invalid excitation table: {0}")]
    InvalidExcitation(String),
}

/// Strengths of the magnets a conversion depends on, sampled on the same
/// time base as the converted array.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuxStrengths<'a> {
    pub dipole: Option<&'a [f64]>,
    pub family: Option<&'a [f64]>,
}

impl<'a> AuxStrengths<'a> {
    pub fn none() -> AuxStrengths<'a> {
        AuxStrengths::default()
    }

    pub fn with_dipole(dipole: &'a [f64]) -> AuxStrengths<'a> {
        AuxStrengths { dipole: Some(dipole), family: None }
    }

    pub fn family(mut self, family: Option<&'a [f64]>) -> AuxStrengths<'a> {
        self.family = family;
        self
    }

    /// Every auxiliary array present must have `expected` samples.
    pub fn check_len(&self, expected: usize) -> Result<(), ConversionError> {
        for aux in [self.dipole, self.family].into_iter().flatten() {
            if aux.len() != expected {
                return Err(ConversionError::LengthMismatch { expected, actual: aux.len() });
            }
        }
        Ok(())
    }
}

/// Calibration of one magnet power supply: the narrow interface through
/// which ramp waveforms turn strengths into currents and back.
///
/// Both conversions are pure and element-wise over the sampled arrays.
pub trait MagnetConversion {
    fn name(&self) -> &str;

    /// Strength the magnet's waveform starts from before any edit.
    fn nominal_strength(&self) -> Option<f64> {
        None
    }

    fn current_to_strength(
        &self,
        currents: &[f64],
        aux: AuxStrengths<'_>,
    ) -> Result<Vec<f64>, ConversionError>;

    fn strength_to_current(
        &self,
        strengths: &[f64],
        aux: AuxStrengths<'_>,
    ) -> Result<Vec<f64>, ConversionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aux_length_check() {
        let dipole = [1.0, 2.0, 3.0];
        let family = [0.5, 0.5];
        assert!(AuxStrengths::none().check_len(7).is_ok());
        assert!(AuxStrengths::with_dipole(&dipole).check_len(3).is_ok());
        assert_eq!(
            AuxStrengths::with_dipole(&dipole).family(Some(&family)).check_len(3),
            Err(ConversionError::LengthMismatch { expected: 3, actual: 2 })
        );
    }
}
