// src/runner.rs
//
// Episode and Monte Carlo runners.
//
// - run_episode: reset -> act -> step until done, streaming StepRecords
// - run_monte_carlo: many episodes with seeds base_seed + i, aggregated
//
// Episodes are deterministic given (model, config, policy, seed).

use serde::{Deserialize, Serialize};

use crate::env::StructEnv;
use crate::error::Result;
use crate::logging::{EventSink, StepRecord};
use crate::policy::Policy;
use crate::types::Action;

/// Episode termination reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Horizon reached.
    EndOfEpisode,
    /// Stopped by `EpisodeConfig::max_steps` before the horizon.
    StepLimit,
}

/// Configuration for a single episode.
#[derive(Debug, Clone, Default)]
pub struct EpisodeConfig {
    /// Random seed for the environment.
    pub seed: u64,
    /// Episode ID for logging.
    pub episode_id: u64,
    /// Optional cap below the environment horizon.
    pub max_steps: Option<usize>,
    /// Verbosity level (0=quiet, 1=summary, 2=per step).
    pub verbosity: u8,
}

impl EpisodeConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_episode_id(mut self, episode_id: u64) -> Self {
        self.episode_id = episode_id;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// Summary of a completed episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode_id: u64,
    pub seed: u64,
    pub policy_version: String,
    pub termination_reason: TerminationReason,
    pub total_steps: usize,
    /// Sum of discounted rewards.
    pub discounted_return: f64,
    /// Sum of undiscounted rewards.
    pub undiscounted_return: f64,
    pub total_action_cost: f64,
    pub total_risk_cost: f64,
    pub total_campaign_cost: f64,
    /// Highest system failure probability seen after any step.
    pub max_pf_sys: f64,
    /// Count of each action code over all components and steps.
    pub action_counts: [u64; 6],
}

/// Run one episode to completion.
pub fn run_episode<P, S>(
    env: &mut StructEnv,
    policy: &mut P,
    sink: &mut S,
    cfg: &EpisodeConfig,
) -> Result<EpisodeSummary>
where
    P: Policy + ?Sized,
    S: EventSink + ?Sized,
{
    policy.reset_episode(cfg.seed, cfg.episode_id);
    let mut obs = env.reset(Some(cfg.seed));

    let mut summary = EpisodeSummary {
        episode_id: cfg.episode_id,
        seed: cfg.seed,
        policy_version: policy.version().to_string(),
        termination_reason: TerminationReason::EndOfEpisode,
        total_steps: 0,
        discounted_return: 0.0,
        undiscounted_return: 0.0,
        total_action_cost: 0.0,
        total_risk_cost: 0.0,
        total_campaign_cost: 0.0,
        max_pf_sys: 0.0,
        action_counts: [0; 6],
    };

    loop {
        if let Some(limit) = cfg.max_steps {
            if summary.total_steps >= limit && !env.is_done() {
                summary.termination_reason = TerminationReason::StepLimit;
                break;
            }
        }

        let actions: Vec<Action> = policy.act(&obs);
        let result = env.step(&actions)?;
        let Some(info) = result.info else {
            break;
        };

        let record = StepRecord::from_step(cfg.episode_id, cfg.seed, &info, result.reward);
        sink.log_step(&record);
        if cfg.verbosity >= 2 {
            eprintln!(
                "[episode {}] t={} actions={:?} reward={:.4} pf_sys={:.6}",
                cfg.episode_id,
                info.time_step,
                info.actions.iter().map(|a| a.code()).collect::<Vec<_>>(),
                info.undiscounted_reward,
                info.cost.pf_sys_after
            );
        }

        summary.total_steps += 1;
        summary.discounted_return += result.reward;
        summary.undiscounted_return += info.undiscounted_reward;
        summary.total_action_cost += info.cost.action_cost;
        summary.total_risk_cost += info.cost.risk_cost;
        summary.total_campaign_cost += info.cost.campaign_cost;
        summary.max_pf_sys = summary.max_pf_sys.max(info.cost.pf_sys_after);
        for a in &info.actions {
            summary.action_counts[a.code() as usize] += 1;
        }

        obs = result.observations;
        if result.done {
            break;
        }
    }
    sink.flush();

    if cfg.verbosity >= 1 {
        eprintln!(
            "[episode {}] seed={} steps={} return={:.4} (undiscounted {:.4}) max_pf_sys={:.6}",
            summary.episode_id,
            summary.seed,
            summary.total_steps,
            summary.discounted_return,
            summary.undiscounted_return,
            summary.max_pf_sys
        );
    }

    Ok(summary)
}

/// Aggregate statistics for a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub mean: f64,
    pub std_pop: f64,
    /// Standard error of the mean.
    pub stderr: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p50: f64,
    pub p95: f64,
}

impl AggregateStats {
    /// Statistics over the finite values of `xs`; all-NaN when none remain.
    pub fn from_values(xs: &[f64]) -> Self {
        let mut sorted: Vec<f64> = xs.iter().copied().filter(|x| x.is_finite()).collect();
        if sorted.is_empty() {
            return Self {
                mean: f64::NAN,
                std_pop: f64::NAN,
                stderr: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                p05: f64::NAN,
                p50: f64::NAN,
                p95: f64::NAN,
            };
        }
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let var = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std_pop = var.sqrt();
        Self {
            mean,
            std_pop,
            stderr: std_pop / n.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p05: percentile(&sorted, 0.05),
            p50: percentile(&sorted, 0.50),
            p95: percentile(&sorted, 0.95),
        }
    }
}

/// Linear-interpolated percentile of an ascending slice.
fn percentile(sorted: &[f64], p01: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let p = p01.clamp(0.0, 1.0);
    let idx = p * (sorted.len().saturating_sub(1) as f64);
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let w = idx - lo as f64;
    sorted[lo] * (1.0 - w) + sorted[hi] * w
}

/// Monte Carlo summary over many episodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub schema_version: u32,
    pub policy_version: String,
    pub episodes: usize,
    pub base_seed: u64,
    pub discounted_return: AggregateStats,
    pub undiscounted_return: AggregateStats,
    pub action_cost: AggregateStats,
    pub risk_cost: AggregateStats,
    pub max_pf_sys: AggregateStats,
    pub runs: Vec<EpisodeSummary>,
}

pub const MC_SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Run `episodes` episodes with seeds `base_seed, base_seed + 1, ...`.
pub fn run_monte_carlo<P, S>(
    env: &mut StructEnv,
    policy: &mut P,
    sink: &mut S,
    episodes: usize,
    base_seed: u64,
    verbosity: u8,
) -> Result<MonteCarloSummary>
where
    P: Policy + ?Sized,
    S: EventSink + ?Sized,
{
    let mut runs = Vec::with_capacity(episodes);
    for i in 0..episodes {
        let cfg = EpisodeConfig::default()
            .with_seed(base_seed.wrapping_add(i as u64))
            .with_episode_id(i as u64)
            .with_verbosity(verbosity);
        runs.push(run_episode(env, policy, sink, &cfg)?);
    }

    let metric = |f: fn(&EpisodeSummary) -> f64| {
        AggregateStats::from_values(&runs.iter().map(f).collect::<Vec<_>>())
    };

    Ok(MonteCarloSummary {
        schema_version: MC_SUMMARY_SCHEMA_VERSION,
        policy_version: policy.version().to_string(),
        episodes,
        base_seed,
        discounted_return: metric(|r| r.discounted_return),
        undiscounted_return: metric(|r| r.undiscounted_return),
        action_cost: metric(|r| r.total_action_cost),
        risk_cost: metric(|r| r.total_risk_cost),
        max_pf_sys: metric(|r| r.max_pf_sys),
        runs,
    })
}
