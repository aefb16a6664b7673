// tests/config_env_tests.rs
//
// Note: These tests manipulate environment variables and must run serially.
// Use `cargo test --test config_env_tests -- --test-threads=1` if flaky.

use std::sync::Mutex;

use structwin::Config;

// Global mutex to serialize tests that touch environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARS: [&str; 5] = [
    "STRUCTWIN_N_COMP",
    "STRUCTWIN_K_COMP",
    "STRUCTWIN_CAMPAIGN_COST",
    "STRUCTWIN_DISCOUNT",
    "STRUCTWIN_EP_LENGTH",
];

fn clear_vars() {
    for v in VARS {
        std::env::remove_var(v);
    }
}

#[test]
fn no_env_gives_defaults() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_vars();

    let cfg = Config::from_env();
    assert_eq!(cfg.env.n_comp, 3);
    assert_eq!(cfg.env.k(), 3);
    assert!(!cfg.env.campaign_cost);
    assert_eq!(cfg.env.discount_reward, 0.95);
    assert_eq!(cfg.env.ep_length, 20);
}

#[test]
fn env_overrides_are_honored() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_vars();

    std::env::set_var("STRUCTWIN_N_COMP", "5");
    std::env::set_var("STRUCTWIN_K_COMP", "3");
    std::env::set_var("STRUCTWIN_CAMPAIGN_COST", "true");
    std::env::set_var("STRUCTWIN_DISCOUNT", "0.9");
    std::env::set_var("STRUCTWIN_EP_LENGTH", "15");

    let cfg = Config::from_env();
    assert_eq!(cfg.env.n_comp, 5);
    assert_eq!(cfg.env.k(), 3);
    assert!(cfg.env.campaign_cost);
    assert_eq!(cfg.env.discount_reward, 0.9);
    assert_eq!(cfg.env.ep_length, 15);
    cfg.env.validate().unwrap();

    clear_vars();
}

#[test]
fn garbage_env_values_fall_back_to_defaults() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_vars();

    std::env::set_var("STRUCTWIN_EP_LENGTH", "twenty");
    std::env::set_var("STRUCTWIN_CAMPAIGN_COST", "maybe");

    let cfg = Config::from_env();
    assert_eq!(cfg.env.ep_length, 20);
    assert!(!cfg.env.campaign_cost);

    clear_vars();
}
