// tests/model_io_tests.rs
//
// POMDP model artifacts on disk: save / load, validation on load, and
// synthetic model parameters.

use std::fs;

use structwin::{PomdpModel, StructError, SyntheticModelParams, TwinMode};

#[test]
fn saved_model_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let model = PomdpModel::default();
    fs::write(&path, model.to_json_pretty().unwrap()).unwrap();

    let loaded = PomdpModel::load(&path).unwrap();
    assert_eq!(loaded.n_states(), model.n_states());
    assert_eq!(loaded.t0.len(), model.t0.len());
    for (a, b) in loaded.belief0.iter().zip(&model.belief0) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = PomdpModel::load(dir.path().join("absent.json")).unwrap_err();
    assert!(format!("{err:#}").contains("absent.json"));
}

#[test]
fn load_rejects_invalid_model() {
    let mut model = PomdpModel::default();
    model.o_monitor.set(0, 0, 5.0);
    let raw = serde_json::to_string(&model).unwrap();
    let err = PomdpModel::from_json_str(&raw).unwrap_err();
    let inner = err.downcast_ref::<StructError>().unwrap();
    assert!(matches!(inner, StructError::InvalidModel { field, .. } if field == "o_monitor"));
}

#[test]
fn synthetic_parameters_shape_the_model() {
    let params = SyntheticModelParams {
        crack_edges: vec![0.0, 1.0, 2.0, 10.0],
        stress_edges: vec![1.0, 2.0, 3.0],
        clock_slices: 30,
        initial_twin_mode: TwinMode::Physical,
        ..SyntheticModelParams::default()
    };
    let model = PomdpModel::synthetic(&params).unwrap();
    assert_eq!(model.n_st_comp(), 3);
    assert_eq!(model.n_st_stress(), 2);
    assert_eq!(model.n_states(), 6);
    assert_eq!(model.max_clock(), 29);
    assert_eq!(
        TwinMode::from_belief(&model.belief0_twin).unwrap(),
        TwinMode::Physical
    );
}

#[test]
fn synthetic_rejects_degenerate_edges() {
    let params = SyntheticModelParams {
        stress_edges: vec![1.0],
        ..SyntheticModelParams::default()
    };
    assert!(PomdpModel::synthetic(&params).is_err());
}
