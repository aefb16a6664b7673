// tests/belief_update_tests.rs
//
// Belief update engine invariants on the built-in synthetic model:
// - every posterior with positive evidence is a distribution
// - all (action, twin mode) pairs produce valid states with the expected
//   observation channel and twin-mode transition
// - perfect repair restores the as-new belief regardless of history

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use structwin::belief::{posterior, predictive, EVIDENCE_FLOOR};
use structwin::linalg::{is_distribution, Matrix};
use structwin::{Action, BeliefUpdateEngine, PomdpModel, TwinConfig, TwinMode};

fn engine() -> BeliefUpdateEngine {
    BeliefUpdateEngine::new(Arc::new(PomdpModel::default()), &TwinConfig::default()).unwrap()
}

fn sum(v: &[f64]) -> f64 {
    v.iter().sum()
}

/// Priors reachable by letting the as-new belief age for a few steps.
fn aged_priors(model: &PomdpModel) -> Vec<Vec<f64>> {
    let mut out = Vec::new();
    let mut b = model.belief0.clone();
    for clock in 0..12 {
        b = model.t0[clock].left_mul(&b).unwrap();
        out.push(b.clone());
    }
    out
}

#[test]
fn posterior_mass_is_one_for_every_supported_observation() {
    let e = engine();
    let model = e.model();

    let mut likelihoods: Vec<(&str, Matrix)> = vec![
        ("o_ins", model.o_ins.clone()),
        ("o_monitor", model.o_monitor.clone()),
        ("o_ins_monitor", model.o_ins_monitor.clone()),
    ];
    for eps in [0.0, 0.1, 0.5] {
        let q = e.twin_model().likelihood_for_epsilon(eps);
        likelihoods.push(("fused", e.fuse_inspection(&q)));
        likelihoods.push(("twin", q));
    }

    let mut checked = 0;
    for prior in aged_priors(model) {
        for (name, l) in &likelihoods {
            let pred = predictive(&prior, l).unwrap();
            assert!((sum(&pred) - 1.0).abs() < 1e-9, "{name}: predictive mass");
            for (o, &p_o) in pred.iter().enumerate() {
                if p_o <= EVIDENCE_FLOOR {
                    continue;
                }
                let post = posterior(&prior, l, o).unwrap();
                assert!(is_distribution(&post), "{name} column {o}");
                checked += 1;
            }
        }
    }
    assert!(checked > 100);
}

#[test]
fn every_action_and_twin_mode_pair_is_handled() {
    let e = engine();
    let model = e.model();
    let n_q = model.n_st_stress();
    let sentinel = model.no_observation_code();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);

    for mode in [TwinMode::Physical, TwinMode::Virtual, TwinMode::NoSensor] {
        for action in Action::ALL {
            let mut state = model.initial_state();
            state.twin_belief = mode.one_hot();
            state.clock = 5;
            state.belief = model.t0[4].left_mul(&model.t0[3].left_mul(&state.belief).unwrap()).unwrap();

            let up = e.advance(&state, action, &mut rng).unwrap();
            let tag = format!("{action:?} / {mode:?}");

            assert!(is_distribution(&up.state.belief), "{tag}: belief");
            assert!(is_distribution(&up.state.twin_belief), "{tag}: twin belief");
            assert!(up.state.twin_uncertainty.mean >= 0.0, "{tag}: eps");

            let next_mode = TwinMode::from_belief(&up.state.twin_belief).unwrap();
            let expected_mode = match (action, mode) {
                (Action::PerfectRepair, _) => TwinMode::NoSensor,
                (Action::DoNothing | Action::Inspect, TwinMode::Physical) => TwinMode::Virtual,
                (Action::DoNothing | Action::Inspect, m) => m,
                _ => TwinMode::Physical,
            };
            assert_eq!(next_mode, expected_mode, "{tag}: twin transition");

            if action.is_repair() {
                assert_eq!(up.state.clock, 0, "{tag}");
                assert_eq!(up.observation, sentinel, "{tag}");
                assert_eq!(up.epsilon, None, "{tag}");
                continue;
            }
            assert_eq!(up.state.clock, 6, "{tag}");

            let inspects = matches!(action, Action::Inspect | Action::InspectAndInstall);
            match (inspects, mode) {
                (false, TwinMode::NoSensor) => assert_eq!(up.observation, sentinel, "{tag}"),
                (false, _) => assert!(up.observation < n_q, "{tag}"),
                (true, _) => assert!(up.observation < 2 * n_q, "{tag}"),
            }
            assert_eq!(up.epsilon.is_some(), mode == TwinMode::Virtual, "{tag}");

            let baseline = TwinConfig::default().eps_baseline;
            match (up.epsilon, action) {
                (Some(eps), Action::DoNothing | Action::Inspect) => {
                    assert_eq!(up.state.twin_uncertainty.mean, eps, "{tag}: eps persisted")
                }
                (_, Action::InstallSensor | Action::InspectAndInstall) => {
                    assert_eq!(up.state.twin_uncertainty.mean, baseline, "{tag}: eps reset")
                }
                _ => assert_eq!(
                    up.state.twin_uncertainty.mean,
                    state.twin_uncertainty.mean,
                    "{tag}: eps untouched"
                ),
            }
        }
    }
}

#[test]
fn repair_from_any_history_restores_as_new() {
    let e = engine();
    let model = e.model();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for (clock, prior) in aged_priors(model).into_iter().enumerate() {
        let mut state = model.initial_state();
        state.belief = prior;
        state.clock = clock + 1;
        let up = e.advance(&state, Action::PerfectRepair, &mut rng).unwrap();
        assert_eq!(up.state.clock, 0);
        for (a, b) in up.state.belief.iter().zip(&model.belief0) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}

#[test]
fn transitions_conserve_mass() {
    let model = PomdpModel::default();
    for prior in aged_priors(&model) {
        for t in model.t0.iter().chain(model.tr.iter()) {
            let next = t.left_mul(&prior).unwrap();
            assert!((sum(&next) - 1.0).abs() < 1e-9);
            assert!(next.iter().all(|p| *p >= 0.0));
        }
    }
}

#[test]
fn same_seed_same_trajectory() {
    let e = engine();
    let run = |seed: u64| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut state = e.model().initial_state();
        state.twin_belief = TwinMode::Virtual.one_hot();
        let mut trace = Vec::new();
        for _ in 0..10 {
            let up = e.advance(&state, Action::Inspect, &mut rng).unwrap();
            trace.push((up.observation, up.epsilon));
            state = up.state;
        }
        (trace, state)
    };
    assert_eq!(run(99), run(99));
}
