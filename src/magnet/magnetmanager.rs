use std::rc::Rc;

use serde::Deserialize;

use crate::magnet::conversion::MagnetConversion;
use crate::magnet::excitation::{
    ExcitationCurve,
    ExcitationJsonProp
};
use crate::magnet::magnet::{
    Magnet,
    MagnetKind
};
use crate::manager::manager::Manager;
use crate::manager::managererror::ManagerError;

// {
//   "name": "BO-Fam:PS-QF",
//   "kind": { "type": "quadrupole" },
//   "excitation": { "currents": [...], "fields": [...], "interpolation": "linear" },
//   "nominal_strength": 1.65
// }
#[derive(Deserialize)]
struct MagnetJsonProp {
    name: String,
    kind: MagnetKind,
    excitation: ExcitationJsonProp,
    #[serde(default)]
    nominal_strength: Option<f64>
}


fn get_magnet_from_json(json_value: serde_json::Value) -> Result<Rc<dyn MagnetConversion>, ManagerError> {
    let json_prop: MagnetJsonProp = ManagerError::from_json_or_json_parse_error(json_value)?;
    let excitation = ExcitationCurve::from_json_prop(&json_prop.excitation)?;
    let magnet = Magnet::new(json_prop.name, json_prop.kind, excitation, json_prop.nominal_strength);
    Ok(Rc::new(magnet))
}


pub struct MagnetManager;


impl MagnetManager {
    pub fn new() -> Manager<Rc<dyn MagnetConversion>> {
        Manager::new(get_magnet_from_json)
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::manager::manager::IManager;

    #[test]
    fn registers_and_finds_magnets() {
        let manager = MagnetManager::new();
        manager
            .insert_from_json_value(json!([
                {
                    "name": "BO-Fam:PS-B-1",
                    "kind": { "type": "dipole", "deflection_angle": 0.1256637 },
                    "excitation": { "currents": [0.0, 1000.0], "fields": [0.0, 1.5] }
                },
                {
                    "name": "BO-Fam:PS-QF",
                    "kind": { "type": "quadrupole" },
                    "excitation": {
                        "currents": [0.0, 60.0, 120.0],
                        "fields": [0.0, 10.0, 19.0],
                        "interpolation": "piecewise_cubic_hermite"
                    },
                    "nominal_strength": 1.65
                }
            ]))
            .unwrap();

        assert_eq!(manager.names(), vec!["BO-Fam:PS-B-1", "BO-Fam:PS-QF"]);
        let qf = manager.get("BO-Fam:PS-QF").unwrap();
        assert_eq!(qf.name(), "BO-Fam:PS-QF");
        assert_eq!(qf.nominal_strength(), Some(1.65));
        assert!(matches!(manager.get("BO-Fam:PS-QD"), Err(ManagerError::NameNotFoundError(_))));
    }

    #[test]
    fn bad_definitions_are_rejected() {
        let manager = MagnetManager::new();
        let missing_kind = json!({ "name": "X", "excitation": { "currents": [0.0, 1.0], "fields": [0.0, 1.0] } });
        assert!(matches!(
            manager.insert_obj_from_json(missing_kind),
            Err(ManagerError::JsonParseError(_))
        ));
        let flat_table = json!({
            "name": "Y",
            "kind": { "type": "corrector" },
            "excitation": { "currents": [0.0, 1.0], "fields": [1.0, 1.0] }
        });
        assert!(matches!(
            manager.insert_obj_from_json(flat_table),
            Err(ManagerError::ConversionError(_))
        ));
        assert!(!manager.contains("Y"));
    }
}
