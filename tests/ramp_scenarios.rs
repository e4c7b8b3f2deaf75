use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use serde_json::json;

use rampwaveform::magnet::magnetmanager::MagnetManager;
use rampwaveform::manager::manager::IManager;
use rampwaveform::ramp::rampparameters::{
    RampParameters,
    DEFAULT_BOUNDARY_INDICES
};
use rampwaveform::ramp::waveform::Waveform;
use rampwaveform::ramp::waveformdipole::WaveformDipole;
use rampwaveform::ramp::waveformerror::{
    RampEdge,
    WaveformError
};
use rampwaveform::ramp::waveformparam::{
    RampChange,
    WaveformParam
};

fn assert_continuous(param: &WaveformParam) {
    const H: f64 = 1e-9;
    for b in param.boundary_indices() {
        let x = b as f64;
        let left = param.value_at(x - H);
        let right = param.value_at(x);
        assert!((left - right).abs() < 1e-8, "value jump at {}: {} vs {}", b, left, right);
        let left = param.slope_at(x - H);
        let right = param.slope_at(x);
        assert!((left - right).abs() < 1e-6, "slope jump at {}: {} vs {}", b, left, right);
    }
}

#[test]
fn default_waveform_shape() {
    let param = WaveformParam::default();
    let wfm = param.waveform();
    assert_eq!(wfm.len(), 4000);
    assert_continuous(&param);

    for k in 0..2608 {
        assert!(wfm[k + 1] >= wfm[k] - 1e-12, "not rising at {}", k);
    }
    for k in 2608..3999 {
        assert!(wfm[k + 1] <= wfm[k] + 1e-12, "not falling at {}", k);
    }
}

#[test]
fn noop_changes_keep_the_default_boundaries() {
    let mut param = WaveformParam::default();
    param.rampup_change(RampChange::default()).unwrap();
    param.rampdown_change(RampChange::default()).unwrap();
    assert_eq!(param.boundary_indices(), DEFAULT_BOUNDARY_INDICES);
    assert!(param.check());
}

#[test]
fn rampup_change_moves_flanking_boundaries() {
    let mut param = WaveformParam::default();
    param
        .rampup_change(RampChange {
            start_index: Some(200),
            stop_index: Some(2000),
            start_value: Some(0.02),
            stop_value: Some(1.0),
        })
        .unwrap();

    let indices = param.boundary_indices();
    assert_eq!(indices[1], 200);
    assert_eq!(indices[2], 2000);
    assert_eq!(indices[0], 145);
    assert_eq!(indices[3], 2275);
    assert!(indices[3] < param.plateau_stop_index());
    assert_eq!(&indices[4..], &DEFAULT_BOUNDARY_INDICES[4..]);

    let wfm = param.waveform();
    assert_relative_eq!(wfm[200], 0.02, max_relative = 1e-12);
    assert_relative_eq!(wfm[2000], 1.0, max_relative = 1e-12);
    assert_continuous(&param);
    for k in 0..2608 {
        assert!(wfm[k + 1] >= wfm[k] - 1e-12, "not rising at {}", k);
    }
}

#[test]
fn rampup_into_plateau_is_rejected_atomically() {
    let mut param = WaveformParam::default();
    let before = param.waveform();
    let revision = param.revision();

    let result = param.rampup_change(RampChange {
        stop_value: Some(1.06),
        ..RampChange::default()
    });
    assert!(matches!(
        result,
        Err(WaveformError::InvalidRampParameters { edge: RampEdge::Up, .. })
    ));
    assert_eq!(param.boundary_indices(), DEFAULT_BOUNDARY_INDICES);
    assert_eq!(param.revision(), revision);
    assert_eq!(param.waveform(), before);
}

#[test]
fn update_is_idempotent() {
    let param = WaveformParam::default();
    param.update();
    let first = param.waveform();
    param.update();
    param.update();
    assert_eq!(first, param.waveform());
}

#[test]
fn parameters_snapshot_rebuilds_the_same_waveform() {
    let mut param = WaveformParam::default();
    param
        .rampdown_change(RampChange {
            start_index: Some(2800),
            stop_value: Some(0.1),
            ..RampChange::default()
        })
        .unwrap();
    let json = param.parameters().to_json();
    let rebuilt = WaveformParam::from_parameters(1.0, &RampParameters::from_json(json).unwrap())
        .unwrap();
    assert_eq!(rebuilt.boundary_indices(), param.boundary_indices());
    assert_eq!(rebuilt.waveform(), param.waveform());
}

fn booster_magnets() -> serde_json::Value {
    json!([
        {
            "name": "BO-Fam:PS-B-1",
            "kind": { "type": "dipole", "deflection_angle": 0.12566370614359174 },
            "excitation": { "currents": [0.0, 600.0, 1200.0], "fields": [0.0, 0.8, 1.6] }
        },
        {
            "name": "BO-Fam:PS-QF",
            "kind": { "type": "quadrupole" },
            "excitation": {
                "currents": [-150.0, 0.0, 150.0],
                "fields": [-30.0, 0.0, 30.0],
                "interpolation": "piecewise_cubic_hermite"
            },
            "nominal_strength": 1.65
        },
        {
            "name": "BO-Fam:PS-SD",
            "kind": { "type": "sextupole" },
            "excitation": { "currents": [-150.0, 150.0], "fields": [-300.0, 300.0] },
            "nominal_strength": 10.0
        }
    ])
}

#[test]
fn magnets_follow_the_dipole_ramp() {
    let registry = MagnetManager::new();
    registry.insert_from_json_value(booster_magnets()).unwrap();
    assert_eq!(registry.names(), vec!["BO-Fam:PS-B-1", "BO-Fam:PS-QF", "BO-Fam:PS-SD"]);

    let dipole = WaveformDipole::new(
        registry.get("BO-Fam:PS-B-1").unwrap(),
        3.0,
        &RampParameters::default(),
    )
    .unwrap();
    let dipole = Rc::new(RefCell::new(dipole));
    let qf = Waveform::from_registry("BO-Fam:PS-QF", &registry, Rc::clone(&dipole), None).unwrap();
    let sd = Waveform::from_registry("BO-Fam:PS-SD", &registry, Rc::clone(&dipole), None).unwrap();

    qf.update().unwrap();
    sd.update().unwrap();
    let energies = dipole.borrow().strengths().unwrap();
    let qf_currents = qf.currents().unwrap();
    // constant normalized strength: current scales with the beam rigidity
    let ratio = qf_currents[2600] / qf_currents[1000];
    let expected = {
        let p = |e: f64| (e * e - 0.51099895e-3f64.powi(2)).sqrt();
        p(energies[2600]) / p(energies[1000])
    };
    assert_relative_eq!(ratio, expected, max_relative = 1e-6);

    dipole
        .borrow_mut()
        .param_mut()
        .rampup_change(RampChange {
            start_index: Some(200),
            stop_index: Some(2000),
            start_value: Some(0.02),
            stop_value: Some(1.0),
        })
        .unwrap();
    assert!(qf.is_stale());
    assert!(sd.is_stale());
    let moved = qf.currents().unwrap();
    assert!(moved[1500] > qf_currents[1500]);
    assert_relative_eq!(moved[2600], qf_currents[2600], max_relative = 1e-12);
}

#[test]
fn unknown_magnet_is_reported() {
    let registry = MagnetManager::new();
    registry.insert_from_json_value(booster_magnets()).unwrap();
    let dipole = WaveformDipole::new(
        registry.get("BO-Fam:PS-B-1").unwrap(),
        3.0,
        &RampParameters::default(),
    )
    .unwrap();
    let result = Waveform::from_registry("BO-Fam:PS-QD", &registry, Rc::new(RefCell::new(dipole)), None);
    assert!(result.is_err());
}
