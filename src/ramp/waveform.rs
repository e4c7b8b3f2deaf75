use std::cell::RefCell;
use std::rc::Rc;

use crate::magnet::conversion::{
    AuxStrengths,
    MagnetConversion
};
use crate::manager::manager::{
    IManager,
    Manager
};
use crate::manager::managererror::ManagerError;
use crate::math::curve::interpolation::interp;
use crate::ramp::waveformdipole::WaveformDipole;
use crate::ramp::waveformerror::WaveformError;

/// New strengths for a magnet: one value for every sample, or a full array.
#[derive(Clone, Debug, PartialEq)]
pub enum StrengthValues {
    Scalar(f64),
    Array(Vec<f64>),
}

impl From<f64> for StrengthValues {
    fn from(value: f64) -> Self {
        StrengthValues::Scalar(value)
    }
}

impl From<Vec<f64>> for StrengthValues {
    fn from(values: Vec<f64>) -> Self {
        StrengthValues::Array(values)
    }
}

impl From<&[f64]> for StrengthValues {
    fn from(values: &[f64]) -> Self {
        StrengthValues::Array(values.to_vec())
    }
}

// Revisions the cached currents were derived from.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Sources {
    dipole: u64,
    family: Option<u64>,
}

struct CachedCurrents {
    sources: Sources,
    currents: Rc<Vec<f64>>,
}

/// Waveform of a magnet other than the dipole, on the dipole time base.
///
/// The strengths are owned and set by the caller. Currents are derived from
/// them, from the dipole strengths (beam rigidity) and, for trims, from the
/// family strengths; they are cached and recomputed whenever any of these
/// moved.
pub struct Waveform {
    magnet: Rc<dyn MagnetConversion>,
    dipole: Rc<RefCell<WaveformDipole>>,
    family: Option<Rc<RefCell<Waveform>>>,
    strengths: Vec<f64>,
    revision: u64,
    currents: RefCell<Option<CachedCurrents>>,
}

impl Waveform {
    /// Starts from the magnet's nominal strength (zero when it has none) on
    /// every sample of the dipole.
    pub fn new(
        magnet: Rc<dyn MagnetConversion>,
        dipole: Rc<RefCell<WaveformDipole>>,
        family: Option<Rc<RefCell<Waveform>>>,
    ) -> Waveform {
        let nrpoints = dipole.borrow().wfm_nrpoints();
        let nominal = magnet.nominal_strength().unwrap_or(0.0);
        Waveform {
            magnet,
            dipole,
            family,
            strengths: vec![nominal; nrpoints],
            revision: 0,
            currents: RefCell::new(None),
        }
    }

    /// Looks the magnet up by name in `registry`.
    pub fn from_registry(
        magnet_id: &str,
        registry: &Manager<Rc<dyn MagnetConversion>>,
        dipole: Rc<RefCell<WaveformDipole>>,
        family: Option<Rc<RefCell<Waveform>>>,
    ) -> Result<Waveform, ManagerError> {
        let magnet = registry.get(magnet_id)?;
        Ok(Waveform::new(magnet, dipole, family))
    }

    pub fn magnet(&self) -> &Rc<dyn MagnetConversion> {
        &self.magnet
    }

    pub fn magnet_id(&self) -> &str {
        self.magnet.name()
    }

    pub fn dipole(&self) -> &Rc<RefCell<WaveformDipole>> {
        &self.dipole
    }

    pub fn family(&self) -> Option<&Rc<RefCell<Waveform>>> {
        self.family.as_ref()
    }

    /// Bumped by every change of the strengths.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn wfm_nrpoints(&self) -> usize {
        self.strengths.len()
    }

    pub fn strengths(&self) -> &[f64] {
        &self.strengths
    }

    pub fn set_strengths(&mut self, values: impl Into<StrengthValues>) -> Result<(), WaveformError> {
        let expected = self.strengths.len();
        match values.into() {
            StrengthValues::Scalar(value) => self.strengths.fill(value),
            StrengthValues::Array(values) => {
                if values.len() != expected {
                    return Err(WaveformError::LengthMismatch { expected, actual: values.len() });
                }
                self.strengths = values;
            }
        }
        self.revision += 1;
        *self.currents.get_mut() = None;
        Ok(())
    }

    pub fn is_stale(&self) -> bool {
        match &*self.currents.borrow() {
            Some(cached) => cached.sources != self.sources(),
            None => true,
        }
    }

    fn sources(&self) -> Sources {
        Sources {
            dipole: self.dipole.borrow().revision(),
            family: self.family.as_ref().map(|family| family.borrow().revision()),
        }
    }

    pub fn currents(&self) -> Result<Vec<f64>, WaveformError> {
        Ok(self.shared_currents()?.as_ref().clone())
    }

    fn shared_currents(&self) -> Result<Rc<Vec<f64>>, WaveformError> {
        let sources = self.sources();
        if let Some(cached) = &*self.currents.borrow() {
            if cached.sources == sources {
                return Ok(Rc::clone(&cached.currents));
            }
        }
        self.recompute_currents(sources)
    }

    fn recompute_currents(&self, sources: Sources) -> Result<Rc<Vec<f64>>, WaveformError> {
        let dipole_strengths = self.dipole.borrow().shared_strengths()?;
        let family = self.family.as_ref().map(|family| family.borrow());
        let family_strengths = family.as_ref().map(|family| family.strengths());
        let aux = AuxStrengths::with_dipole(&dipole_strengths).family(family_strengths);
        let currents = Rc::new(self.magnet.strength_to_current(&self.strengths, aux)?);
        tracing::trace!(magnet = self.magnet.name(), dipole = sources.dipole, "currents recomputed");
        *self.currents.borrow_mut() = Some(CachedCurrents {
            sources,
            currents: Rc::clone(&currents),
        });
        Ok(currents)
    }

    /// Brings the whole chain up to date: the dipole first, then the family,
    /// then the currents of this magnet.
    pub fn update(&self) -> Result<(), WaveformError> {
        {
            let dipole = self.dipole.borrow();
            if dipole.is_stale() {
                dipole.update()?;
            }
        }
        if let Some(family) = &self.family {
            family.borrow().update()?;
        }
        self.recompute_currents(self.sources())?;
        Ok(())
    }

    pub fn get_strength_from_time(&self, time: f64) -> f64 {
        interp(&self.dipole.borrow().times(), &self.strengths, time)
    }

    pub fn get_current_from_time(&self, time: f64) -> Result<f64, WaveformError> {
        let currents = self.shared_currents()?;
        Ok(interp(&self.dipole.borrow().times(), &currents, time))
    }
}
