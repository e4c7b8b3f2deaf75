use std::cell::RefCell;
use std::rc::Rc;

use crate::magnet::conversion::{
    AuxStrengths,
    MagnetConversion
};
use crate::math::curve::interpolation::interp;
use crate::ramp::rampparameters::RampParameters;
use crate::ramp::waveformerror::WaveformError;
use crate::ramp::waveformparam::WaveformParam;

/// Beam energy at ejection [GeV], the reference of the dipole scale.
pub const DEFAULT_EJECTION_ENERGY: f64 = 3.0;

struct CachedStrengths {
    revision: u64,
    strengths: Rc<Vec<f64>>,
}

/// The dipole ramp: the time and energy backbone of every other magnet.
///
/// Its parameterized waveform is in units of the current that carries the
/// beam at the ejection energy, so a boundary value of 1.0 is the ejection
/// energy. Strengths (beam energies) are derived through the magnet
/// calibration and cached per revision of the parameters.
pub struct WaveformDipole {
    magnet: Rc<dyn MagnetConversion>,
    ejection_energy: f64,
    param: WaveformParam,
    strengths: RefCell<Option<CachedStrengths>>,
}

impl WaveformDipole {
    pub fn new(
        magnet: Rc<dyn MagnetConversion>,
        ejection_energy: f64,
        params: &RampParameters,
    ) -> Result<WaveformDipole, WaveformError> {
        let scale = magnet.strength_to_current(&[ejection_energy], AuxStrengths::none())?;
        let scale = scale.first().copied().ok_or_else(|| {
            WaveformError::InvalidParameters("empty ejection current".to_owned())
        })?;
        let param = WaveformParam::from_parameters(scale, params)?;
        tracing::debug!(magnet = magnet.name(), ejection_energy, scale, "dipole ramp created");
        Ok(WaveformDipole {
            magnet,
            ejection_energy,
            param,
            strengths: RefCell::new(None),
        })
    }

    pub fn magnet(&self) -> &Rc<dyn MagnetConversion> {
        &self.magnet
    }

    pub fn ejection_energy(&self) -> f64 {
        self.ejection_energy
    }

    pub fn param(&self) -> &WaveformParam {
        &self.param
    }

    /// Mutable access to the ramp shape. Edits bump the parameter revision,
    /// which invalidates the dipole strengths and every magnet built on them.
    pub fn param_mut(&mut self) -> &mut WaveformParam {
        &mut self.param
    }

    pub fn revision(&self) -> u64 {
        self.param.revision()
    }

    pub fn wfm_nrpoints(&self) -> usize {
        self.param.wfm_nrpoints()
    }

    pub fn duration(&self) -> f64 {
        self.param.duration()
    }

    pub fn is_stale(&self) -> bool {
        self.param.is_stale() || !self.strengths_are_fresh()
    }

    /// Sample times [s]: `index * duration / (N - 1)`.
    pub fn times(&self) -> Vec<f64> {
        let n = self.param.wfm_nrpoints();
        let step = self.param.duration() / (n - 1) as f64;
        (0..n).map(|i| i as f64 * step).collect()
    }

    pub fn currents(&self) -> Vec<f64> {
        self.param.waveform()
    }

    pub fn strengths(&self) -> Result<Vec<f64>, WaveformError> {
        Ok(self.shared_strengths()?.as_ref().clone())
    }

    pub(crate) fn shared_strengths(&self) -> Result<Rc<Vec<f64>>, WaveformError> {
        if let Some(cached) = &*self.strengths.borrow() {
            if cached.revision == self.param.revision() {
                return Ok(Rc::clone(&cached.strengths));
            }
        }
        self.recompute_strengths()
    }

    fn strengths_are_fresh(&self) -> bool {
        self.strengths
            .borrow()
            .as_ref()
            .is_some_and(|cached| cached.revision == self.param.revision())
    }

    fn recompute_strengths(&self) -> Result<Rc<Vec<f64>>, WaveformError> {
        let currents = self.param.waveform();
        let strengths = Rc::new(self.magnet.current_to_strength(&currents, AuxStrengths::none())?);
        *self.strengths.borrow_mut() = Some(CachedStrengths {
            revision: self.param.revision(),
            strengths: Rc::clone(&strengths),
        });
        Ok(strengths)
    }

    /// Recomputes the sampled currents and the derived strengths now.
    pub fn update(&self) -> Result<(), WaveformError> {
        self.param.update();
        self.recompute_strengths()?;
        Ok(())
    }

    /// Validity check of the ramp shape together with its conversion.
    pub fn check(&self) -> bool {
        self.param.check() && self.magnet.current_to_strength(&self.currents(), AuxStrengths::none()).is_ok()
    }

    pub fn get_current_from_time(&self, time: f64) -> f64 {
        interp(&self.times(), &self.currents(), time)
    }

    pub fn get_strength_from_time(&self, time: f64) -> Result<f64, WaveformError> {
        let strengths = self.shared_strengths()?;
        Ok(interp(&self.times(), &strengths, time))
    }
}
