use serde::{
    Deserialize,
    Serialize
};

use crate::magnet::conversion::{
    AuxStrengths,
    ConversionError,
    MagnetConversion
};
use crate::magnet::excitation::ExcitationCurve;

/// Electron rest energy [GeV].
pub const ELECTRON_REST_ENERGY: f64 = 0.51099895e-3;

/// Momentum [GeV/c] per unit of beam rigidity [T.m].
pub const GEV_PER_TESLA_METER: f64 = 0.299792458;

/// Beam rigidity [T.m] of an electron beam of total energy `energy` [GeV].
pub fn beam_rigidity(energy: f64) -> Result<f64, ConversionError> {
    if !(energy >= ELECTRON_REST_ENERGY) {
        return Err(ConversionError::InvalidEnergy(energy));
    }
    let momentum = (energy * energy - ELECTRON_REST_ENERGY * ELECTRON_REST_ENERGY).sqrt();
    Ok(momentum / GEV_PER_TESLA_METER)
}

/// Total energy [GeV] of an electron beam of rigidity `brho` [T.m].
pub fn beam_energy(brho: f64) -> f64 {
    let momentum = brho * GEV_PER_TESLA_METER;
    momentum.hypot(ELECTRON_REST_ENERGY)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MagnetKind {
    /// Strength is the beam energy [GeV] bent through `deflection_angle` [rad].
    Dipole { deflection_angle: f64 },
    /// Strength is the integrated gradient normalized by the beam rigidity.
    Quadrupole,
    Sextupole,
    /// Strength is the kick angle [rad].
    Corrector,
}

/// Magnet calibrated by an excitation table.
///
/// Multipoles and correctors are normalized by the rigidity of the beam the
/// dipole carries at the same sample. A magnet converted together with a
/// family array is a trim: its strength is the total one and its current only
/// drives the difference to the family field.
pub struct Magnet {
    name: String,
    kind: MagnetKind,
    excitation: ExcitationCurve,
    nominal_strength: Option<f64>,
}

impl Magnet {
    pub fn new(
        name: String,
        kind: MagnetKind,
        excitation: ExcitationCurve,
        nominal_strength: Option<f64>,
    ) -> Magnet {
        Magnet { name, kind, excitation, nominal_strength }
    }

    pub fn kind(&self) -> MagnetKind {
        self.kind
    }

    pub fn excitation(&self) -> &ExcitationCurve {
        &self.excitation
    }

    fn rigidities(&self, len: usize, aux: &AuxStrengths<'_>) -> Result<Vec<f64>, ConversionError> {
        let dipole = aux
            .dipole
            .ok_or_else(|| ConversionError::MissingDipole(self.name.clone()))?;
        aux.check_len(len)?;
        dipole.iter().map(|&energy| beam_rigidity(energy)).collect()
    }

    fn family_field(aux: &AuxStrengths<'_>, k: usize, brho: f64) -> f64 {
        aux.family.map_or(0.0, |family| family[k] * brho)
    }
}

impl MagnetConversion for Magnet {
    fn name(&self) -> &str {
        &self.name
    }

    fn nominal_strength(&self) -> Option<f64> {
        self.nominal_strength
    }

    fn current_to_strength(
        &self,
        currents: &[f64],
        aux: AuxStrengths<'_>,
    ) -> Result<Vec<f64>, ConversionError> {
        match self.kind {
            MagnetKind::Dipole { deflection_angle } => currents
                .iter()
                .map(|&current| {
                    let field = self.excitation.field(current)?;
                    Ok(beam_energy(field / deflection_angle))
                })
                .collect(),
            MagnetKind::Quadrupole | MagnetKind::Sextupole | MagnetKind::Corrector => {
                let rigidities = self.rigidities(currents.len(), &aux)?;
                currents
                    .iter()
                    .zip(rigidities)
                    .enumerate()
                    .map(|(k, (&current, brho))| {
                        if brho == 0.0 {
                            return Err(ConversionError::InvalidEnergy(ELECTRON_REST_ENERGY));
                        }
                        let field = self.excitation.field(current)?
                            + Self::family_field(&aux, k, brho);
                        Ok(field / brho)
                    })
                    .collect()
            }
        }
    }

    fn strength_to_current(
        &self,
        strengths: &[f64],
        aux: AuxStrengths<'_>,
    ) -> Result<Vec<f64>, ConversionError> {
        match self.kind {
            MagnetKind::Dipole { deflection_angle } => strengths
                .iter()
                .map(|&energy| {
                    let field = beam_rigidity(energy)? * deflection_angle;
                    self.excitation.current(field)
                })
                .collect(),
            MagnetKind::Quadrupole | MagnetKind::Sextupole | MagnetKind::Corrector => {
                let rigidities = self.rigidities(strengths.len(), &aux)?;
                strengths
                    .iter()
                    .zip(rigidities)
                    .enumerate()
                    .map(|(k, (&strength, brho))| {
                        let field = strength * brho - Self::family_field(&aux, k, brho);
                        self.excitation.current(field)
                    })
                    .collect()
            }
        }
    }
}
