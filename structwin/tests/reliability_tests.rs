// tests/reliability_tests.rs
//
// k-out-of-n system failure probability against closed forms and an
// exhaustive enumeration of component outcomes.

use structwin::{system_failure_probability, StructError};

/// P(fewer than k of n components survive), by enumerating all 2^n outcomes.
fn brute_force(pf: &[f64], k: usize) -> f64 {
    let n = pf.len();
    let mut fail = 0.0;
    for mask in 0u32..(1 << n) {
        let mut p = 1.0;
        let mut alive = 0;
        for (i, &q) in pf.iter().enumerate() {
            if mask & (1 << i) != 0 {
                alive += 1;
                p *= 1.0 - q;
            } else {
                p *= q;
            }
        }
        if alive < k {
            fail += p;
        }
    }
    fail
}

#[test]
fn series_system_matches_closed_form() {
    let pf = [0.1, 0.2, 0.3];
    let got = system_failure_probability(&pf, 3).unwrap();
    assert!((got - 0.496).abs() < 1e-12, "got {got}");
}

#[test]
fn parallel_system_matches_closed_form() {
    let pf = [0.1, 0.2, 0.3];
    let got = system_failure_probability(&pf, 1).unwrap();
    assert!((got - 0.006).abs() < 1e-12, "got {got}");
}

#[test]
fn two_out_of_three() {
    let got = system_failure_probability(&[0.1, 0.2, 0.3], 2).unwrap();
    assert!((got - 0.098).abs() < 1e-12, "got {got}");
}

#[test]
fn matches_enumeration_for_every_k() {
    let cases: [&[f64]; 4] = [
        &[0.1, 0.2, 0.3, 0.4, 0.05],
        &[0.0, 1.0, 0.5, 0.25],
        &[0.01; 7],
        &[0.9, 0.8, 0.3, 0.6, 0.2, 0.7],
    ];
    for pf in cases {
        for k in 1..=pf.len() {
            let got = system_failure_probability(pf, k).unwrap();
            let want = brute_force(pf, k);
            assert!(
                (got - want).abs() < 1e-12,
                "pf={pf:?} k={k}: got {got}, want {want}"
            );
        }
    }
}

#[test]
fn failure_probability_grows_with_k() {
    let pf = [0.1, 0.2, 0.3, 0.4, 0.05];
    let mut prev = 0.0;
    for k in 1..=pf.len() {
        let p = system_failure_probability(&pf, k).unwrap();
        assert!(p >= prev);
        assert!((0.0..=1.0).contains(&p));
        prev = p;
    }
}

#[test]
fn certain_outcomes() {
    assert_eq!(system_failure_probability(&[0.0; 4], 2).unwrap(), 0.0);
    assert!((system_failure_probability(&[1.0; 4], 1).unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn rejects_invalid_inputs() {
    assert_eq!(
        system_failure_probability(&[], 1),
        Err(StructError::InvalidK { k: 1, n: 0 })
    );
    assert_eq!(
        system_failure_probability(&[0.1, 0.2], 3),
        Err(StructError::InvalidK { k: 3, n: 2 })
    );
    assert!(matches!(
        system_failure_probability(&[0.1, 1.2], 1),
        Err(StructError::InvalidProbability { index: 1, .. })
    ));
}
