// src/policy.rs
//
// Maintenance policies for driving StructEnv.
//
// - Policy: trait mapping per-agent observations to one action per agent
// - DoNothingPolicy: never intervenes (risk baseline)
// - PeriodicInspectionPolicy: calendar-based inspection, optional sensor
//   install on the first visit
// - ConditionBasedPolicy: repairs / inspects on belief thresholds
//
// Learned policies live outside this crate; they only need to implement
// `Policy`.

use serde::{Deserialize, Serialize};

use crate::env::AgentObservation;
use crate::types::Action;

pub const DO_NOTHING_POLICY_VERSION: &str = "do-nothing-v1";
pub const PERIODIC_POLICY_VERSION: &str = "periodic-inspection-v1";
pub const CONDITION_POLICY_VERSION: &str = "condition-based-v1";

/// Interface for all maintenance policies.
pub trait Policy: Send {
    /// Unique version string for this policy implementation.
    fn version(&self) -> &str;

    /// One action per observation, in agent order.
    fn act(&mut self, obs: &[AgentObservation]) -> Vec<Action>;

    /// Reset internal state before a new episode.
    fn reset_episode(&mut self, seed: u64, episode_id: u64);
}

/// Never intervenes.
#[derive(Debug, Default, Clone)]
pub struct DoNothingPolicy;

impl Policy for DoNothingPolicy {
    fn version(&self) -> &str {
        DO_NOTHING_POLICY_VERSION
    }

    fn act(&mut self, obs: &[AgentObservation]) -> Vec<Action> {
        vec![Action::DoNothing; obs.len()]
    }

    fn reset_episode(&mut self, _seed: u64, _episode_id: u64) {}
}

/// Inspects every component every `interval` steps.
#[derive(Debug, Clone)]
pub struct PeriodicInspectionPolicy {
    interval: usize,
    install_sensor: bool,
    step: usize,
}

impl PeriodicInspectionPolicy {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            install_sensor: false,
            step: 0,
        }
    }

    /// Install a physical sensor alongside the first inspection.
    pub fn with_sensor_install(mut self, enabled: bool) -> Self {
        self.install_sensor = enabled;
        self
    }
}

impl Policy for PeriodicInspectionPolicy {
    fn version(&self) -> &str {
        PERIODIC_POLICY_VERSION
    }

    fn act(&mut self, obs: &[AgentObservation]) -> Vec<Action> {
        let step = self.step;
        self.step += 1;
        if (step + 1) % self.interval != 0 {
            return vec![Action::DoNothing; obs.len()];
        }
        let action = if self.install_sensor && step + 1 == self.interval {
            Action::InspectAndInstall
        } else {
            Action::Inspect
        };
        vec![action; obs.len()]
    }

    fn reset_episode(&mut self, _seed: u64, _episode_id: u64) {
        self.step = 0;
    }
}

/// Belief thresholds for [`ConditionBasedPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionThresholds {
    /// Repair once the failed-crack probability reaches this.
    pub repair_pf: f64,
    /// Inspect once the mass on the upper crack half reaches this.
    pub inspect_mass: f64,
    /// Repair with a sensor instead of a plain repair.
    pub repair_with_sensor: bool,
}

impl Default for ConditionThresholds {
    fn default() -> Self {
        Self {
            repair_pf: 0.05,
            inspect_mass: 0.2,
            repair_with_sensor: false,
        }
    }
}

/// Acts on each component's crack marginal independently.
#[derive(Debug, Clone, Default)]
pub struct ConditionBasedPolicy {
    thresholds: ConditionThresholds,
}

impl ConditionBasedPolicy {
    pub fn new(thresholds: ConditionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ConditionThresholds {
        &self.thresholds
    }

    fn decide(&self, obs: &AgentObservation) -> Action {
        if obs.failure_probability() >= self.thresholds.repair_pf {
            return if self.thresholds.repair_with_sensor {
                Action::PerfectRepairWithSensor
            } else {
                Action::PerfectRepair
            };
        }
        let n = obs.crack_marginal.len();
        let upper: f64 = obs.crack_marginal[n / 2..].iter().sum();
        if upper >= self.thresholds.inspect_mass {
            Action::Inspect
        } else {
            Action::DoNothing
        }
    }
}

impl Policy for ConditionBasedPolicy {
    fn version(&self) -> &str {
        CONDITION_POLICY_VERSION
    }

    fn act(&mut self, obs: &[AgentObservation]) -> Vec<Action> {
        obs.iter().map(|o| self.decide(o)).collect()
    }

    fn reset_episode(&mut self, _seed: u64, _episode_id: u64) {}
}
