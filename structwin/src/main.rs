// src/main.rs
//
// Research-harness CLI for structwin.
//
// - Config defaults + STRUCTWIN_* env overrides, then CLI flags on top.
// - Model from --model (JSON) or the built-in synthetic model.
// - Deterministic Monte Carlo via --seed (episode i uses seed + i).
// - Prints a concise run header (cfg version/hash, policy, episodes, seed)
//   and the aggregate summary.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};

use structwin::config::Config;
use structwin::env::StructEnv;
use structwin::logging::{EventSink, FileSink, NoopSink};
use structwin::model::PomdpModel;
use structwin::policy::{
    ConditionBasedPolicy, ConditionThresholds, DoNothingPolicy, PeriodicInspectionPolicy, Policy,
};
use structwin::runner::run_monte_carlo;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PolicyArg {
    DoNothing,
    Periodic,
    Condition,
}

#[derive(Debug, Parser)]
#[command(
    name = "structwin",
    about = "k-out-of-n structural maintenance simulator with digital-twin monitoring",
    version
)]
struct Args {
    /// Number of episodes to run.
    #[arg(long, default_value_t = 100)]
    episodes: usize,

    /// Base seed; episode i uses seed + i.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Maintenance policy.
    #[arg(long, value_enum, default_value_t = PolicyArg::Condition)]
    policy: PolicyArg,

    /// Inspection interval for the periodic policy.
    #[arg(long, default_value_t = 5)]
    interval: usize,

    /// Install a sensor with the first periodic inspection / on repair.
    #[arg(long)]
    with_sensor: bool,

    /// POMDP model JSON; the synthetic model is used when omitted.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Write the model in use to this path and continue.
    #[arg(long)]
    dump_model: Option<PathBuf>,

    /// Component count (overrides env / default).
    #[arg(long)]
    n_comp: Option<usize>,

    /// Minimum surviving components (overrides env / default).
    #[arg(long)]
    k_comp: Option<usize>,

    /// Charge a campaign cost on any visit.
    #[arg(long)]
    campaign: bool,

    /// JSONL step telemetry output.
    #[arg(long)]
    telemetry: Option<PathBuf>,

    /// Monte Carlo summary JSON output.
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Verbosity: -v, -vv
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn fnv1a64(s: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut h = FNV_OFFSET;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut cfg = Config::from_env();
    if let Some(n) = args.n_comp {
        cfg.env.n_comp = n;
        cfg.env.k_comp = Some(args.k_comp.unwrap_or(n));
    } else if let Some(k) = args.k_comp {
        cfg.env.k_comp = Some(k);
    }
    if args.campaign {
        cfg.env.campaign_cost = true;
    }
    let cfg_hash = fnv1a64(&format!("{cfg:?}"));

    let model = match &args.model {
        Some(path) => PomdpModel::load(path)?,
        None => PomdpModel::default(),
    };
    if let Some(path) = &args.dump_model {
        fs::write(path, model.to_json_pretty()?)
            .with_context(|| format!("writing model to {}", path.display()))?;
    }

    println!(
        "structwin | cfg={} | cfg_hash=0x{:016x} | n={} k={} | policy={:?} | episodes={} | seed={}",
        cfg.version,
        cfg_hash,
        cfg.env.n_comp,
        cfg.env.k(),
        args.policy,
        args.episodes,
        args.seed
    );

    let mut policy: Box<dyn Policy> = match args.policy {
        PolicyArg::DoNothing => Box::new(DoNothingPolicy),
        PolicyArg::Periodic => Box::new(
            PeriodicInspectionPolicy::new(args.interval).with_sensor_install(args.with_sensor),
        ),
        PolicyArg::Condition => Box::new(ConditionBasedPolicy::new(ConditionThresholds {
            repair_with_sensor: args.with_sensor,
            ..ConditionThresholds::default()
        })),
    };

    let mut sink: Box<dyn EventSink> = match &args.telemetry {
        Some(path) => Box::new(
            FileSink::create(path)
                .with_context(|| format!("creating telemetry file {}", path.display()))?,
        ),
        None => Box::new(NoopSink),
    };

    let mut env = StructEnv::new(cfg, Arc::new(model))?;
    let mc = run_monte_carlo(
        &mut env,
        policy.as_mut(),
        sink.as_mut(),
        args.episodes,
        args.seed,
        args.verbose,
    )?;

    println!(
        "return: mean={:.4} std={:.4} stderr={:.4} p05={:.4} p50={:.4} p95={:.4}",
        mc.discounted_return.mean,
        mc.discounted_return.std_pop,
        mc.discounted_return.stderr,
        mc.discounted_return.p05,
        mc.discounted_return.p50,
        mc.discounted_return.p95
    );
    println!(
        "costs:  action={:.4} risk={:.4} | max_pf_sys mean={:.6}",
        mc.action_cost.mean, mc.risk_cost.mean, mc.max_pf_sys.mean
    );

    if let Some(path) = &args.summary {
        let json = serde_json::to_string_pretty(&mc)?;
        fs::write(path, json).with_context(|| format!("writing summary to {}", path.display()))?;
    }

    Ok(())
}
