use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;

use crate::magnet::conversion::MagnetConversion;
use crate::magnet::magnetmanager::MagnetManager;
use crate::manager::managererror::ManagerError;
use crate::manager::manager::{
    IManager,
    Manager
};
use crate::ramp::rampparameters::RampParameters;
use crate::ramp::waveform::Waveform;
use crate::ramp::waveformdipole::{
    WaveformDipole,
    DEFAULT_EJECTION_ENERGY
};


fn default_ejection_energy() -> f64 {
    DEFAULT_EJECTION_ENERGY
}

#[derive(Deserialize)]
struct ConfigurationJsonProp {
    magnets: Vec<serde_json::Value>,
    dipole: String,
    #[serde(default = "default_ejection_energy")]
    ejection_energy: f64,
    #[serde(default)]
    ramp: RampParameters
}

/// Everything needed to build the ramp of one accelerator: the magnet
/// calibrations, which of them is the dipole, and the stored ramp shape.
pub struct Configuration {
    magnet_manager: Manager<Rc<dyn MagnetConversion>>,
    dipole_name: String,
    ejection_energy: f64,
    ramp_parameters: RampParameters
}


impl Configuration {
    pub fn from_json(json_value: serde_json::Value) -> Result<Configuration, ManagerError> {
        let json_prop: ConfigurationJsonProp = ManagerError::from_json_or_json_parse_error(json_value)?;
        json_prop.ramp.validate()?;
        let magnet_manager = MagnetManager::new();
        magnet_manager.insert_obj_from_json_vec(&json_prop.magnets)?;
        if !magnet_manager.contains(&json_prop.dipole) {
            return Err(ManagerError::map_elem_not_found(&json_prop.dipole));
        }
        tracing::info!(
            magnets = magnet_manager.names().len(),
            dipole = %json_prop.dipole,
            "configuration loaded"
        );
        Ok(Configuration {
            magnet_manager,
            dipole_name: json_prop.dipole,
            ejection_energy: json_prop.ejection_energy,
            ramp_parameters: json_prop.ramp
        })
    }

    pub fn magnet_manager(&self) -> &Manager<Rc<dyn MagnetConversion>> {
        &self.magnet_manager
    }

    pub fn dipole_name(&self) -> &str {
        &self.dipole_name
    }

    pub fn ejection_energy(&self) -> f64 {
        self.ejection_energy
    }

    pub fn ramp_parameters(&self) -> &RampParameters {
        &self.ramp_parameters
    }

    pub fn dipole_waveform(&self) -> Result<Rc<RefCell<WaveformDipole>>, ManagerError> {
        let magnet = self.magnet_manager.get(&self.dipole_name)?;
        let dipole = WaveformDipole::new(magnet, self.ejection_energy, &self.ramp_parameters)?;
        Ok(Rc::new(RefCell::new(dipole)))
    }

    pub fn magnet_waveform(
        &self,
        magnet_id: &str,
        dipole: Rc<RefCell<WaveformDipole>>,
        family: Option<Rc<RefCell<Waveform>>>,
    ) -> Result<Waveform, ManagerError> {
        Waveform::from_registry(magnet_id, &self.magnet_manager, dipole, family)
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ramp::waveformerror::WaveformError;

    fn booster() -> serde_json::Value {
        json!({
            "magnets": [
                {
                    "name": "BO-Fam:PS-B-1",
                    "kind": { "type": "dipole", "deflection_angle": 0.12566370614359174 },
                    "excitation": { "currents": [0.0, 1200.0], "fields": [0.0, 1.6] }
                },
                {
                    "name": "BO-Fam:PS-QF",
                    "kind": { "type": "quadrupole" },
                    "excitation": { "currents": [-150.0, 150.0], "fields": [-30.0, 30.0] },
                    "nominal_strength": 1.65
                }
            ],
            "dipole": "BO-Fam:PS-B-1",
            "ramp": { "duration": 0.3 }
        })
    }

    #[test]
    fn builds_dipole_and_magnets() {
        let config = Configuration::from_json(booster()).unwrap();
        assert_eq!(config.dipole_name(), "BO-Fam:PS-B-1");
        assert_eq!(config.ejection_energy(), 3.0);
        assert_eq!(config.ramp_parameters().duration, 0.3);

        let dipole = config.dipole_waveform().unwrap();
        assert_eq!(dipole.borrow().wfm_nrpoints(), 4000);
        let qf = config.magnet_waveform("BO-Fam:PS-QF", dipole, None).unwrap();
        assert_eq!(qf.strengths()[0], 1.65);
        assert!(qf.currents().is_ok());
    }

    #[test]
    fn unknown_dipole_is_rejected() {
        let mut value = booster();
        value["dipole"] = json!("BO-Fam:PS-B-2");
        assert!(matches!(
            Configuration::from_json(value),
            Err(ManagerError::NameNotFoundError(name)) if name == "BO-Fam:PS-B-2"
        ));
    }

    #[test]
    fn invalid_ramp_is_rejected() {
        let mut value = booster();
        value["ramp"] = json!({ "wfm_nrpoints": 1 });
        assert!(matches!(
            Configuration::from_json(value),
            Err(ManagerError::WaveformError(WaveformError::InvalidParameters(_)))
        ));
    }

    #[test]
    fn unknown_magnet_waveform() {
        let config = Configuration::from_json(booster()).unwrap();
        let dipole = config.dipole_waveform().unwrap();
        assert!(config.magnet_waveform("BO-Fam:PS-SD", dipole, None).is_err());
    }
}
