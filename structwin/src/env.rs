// src/env.rs
//
// Gym-style episode environment around the belief / cost engine.
//
// - reset(seed) -> per-agent observations
// - step(actions) -> (observations, discounted reward, done, info)
//
// One agent per component. Every component shares the episode RNG, consumed
// in component order, so a seed plus an action sequence fully determines
// the trajectory.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::belief::BeliefUpdateEngine;
use crate::config::Config;
use crate::cost::{CostBreakdown, CostModel};
use crate::error::{Result, StructError};
use crate::model::PomdpModel;
use crate::types::{Action, ComponentState, TwinMode, TwinUncertainty};

/// What a single agent sees after reset / step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentObservation {
    pub agent_id: String,
    /// Belief marginal over crack bins.
    pub crack_marginal: Vec<f64>,
    /// Belief marginal over stress bins.
    pub stress_marginal: Vec<f64>,
    pub twin_uncertainty: TwinUncertainty,
    /// Elapsed fraction of the episode.
    pub time_fraction: f64,
}

impl AgentObservation {
    /// Flat feature vector: crack marginal, stress marginal, twin
    /// uncertainty (mean, dispersion), time fraction.
    pub fn to_vector(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(self.crack_marginal.len() + self.stress_marginal.len() + 3);
        v.extend_from_slice(&self.crack_marginal);
        v.extend_from_slice(&self.stress_marginal);
        v.push(self.twin_uncertainty.mean);
        v.push(self.twin_uncertainty.dispersion);
        v.push(self.time_fraction);
        v
    }

    /// Probability that the component is in the failed crack state.
    pub fn failure_probability(&self) -> f64 {
        self.crack_marginal.last().copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepInfo {
    /// Step index the actions were applied at.
    pub time_step: usize,
    pub actions: Vec<Action>,
    /// Observation code per component (sentinel when nothing observed).
    pub observation_codes: Vec<usize>,
    /// Twin mode per component before the step.
    pub twin_modes: Vec<TwinMode>,
    /// Deterioration clock per component after the step.
    pub clocks: Vec<usize>,
    /// Reward before discounting.
    pub undiscounted_reward: f64,
    pub cost: CostBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub observations: Vec<AgentObservation>,
    /// Discounted reward, shared by every agent.
    pub reward: f64,
    pub done: bool,
    /// `None` when stepping an already finished episode.
    pub info: Option<StepInfo>,
}

pub struct StructEnv {
    config: Config,
    model: Arc<PomdpModel>,
    engine: BeliefUpdateEngine,
    cost_model: CostModel,
    agent_ids: Vec<String>,
    components: Vec<ComponentState>,
    rng: ChaCha8Rng,
    seed: u64,
    time_step: usize,
    done: bool,
}

impl StructEnv {
    /// Build an environment; the model must cover every clock value the
    /// horizon can reach.
    pub fn new(config: Config, model: Arc<PomdpModel>) -> Result<Self> {
        config.validate()?;
        model.validate()?;
        if model.t0.len() < config.env.ep_length {
            return Err(StructError::InvalidModel {
                field: "t0".to_string(),
                message: format!(
                    "{} clock slices cannot cover an episode of {} steps",
                    model.t0.len(),
                    config.env.ep_length
                ),
            });
        }

        let engine = BeliefUpdateEngine::new(Arc::clone(&model), &config.twin)?;
        let cost_model = CostModel::new(Arc::clone(&model), config.cost.clone(), &config.env);
        let n = config.env.n_comp;
        let agent_ids = (0..n).map(|i| format!("agent_{i}")).collect();
        let components = vec![model.initial_state(); n];

        Ok(Self {
            config,
            model,
            engine,
            cost_model,
            agent_ids,
            components,
            rng: ChaCha8Rng::seed_from_u64(0),
            seed: 0,
            time_step: 0,
            done: false,
        })
    }

    /// Reset the episode with an optional seed.
    pub fn reset(&mut self, seed: Option<u64>) -> Vec<AgentObservation> {
        let seed = seed.unwrap_or_else(|| self.rng.gen());
        self.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);

        self.components = vec![self.model.initial_state(); self.config.env.n_comp];
        self.time_step = 0;
        self.done = false;

        self.observations()
    }

    /// Apply one action per component.
    pub fn step(&mut self, actions: &[Action]) -> Result<StepResult> {
        if self.done {
            return Ok(StepResult {
                observations: self.observations(),
                reward: 0.0,
                done: true,
                info: None,
            });
        }

        let twin_modes = self
            .components
            .iter()
            .map(|c| TwinMode::from_belief(&c.twin_belief))
            .collect::<Result<Vec<_>>>()?;

        let updates = self
            .engine
            .advance_all(&self.components, actions, &mut self.rng)?;

        let beliefs: Vec<&[f64]> = self.components.iter().map(|c| c.belief.as_slice()).collect();
        let beliefs_next: Vec<&[f64]> = updates.iter().map(|u| u.state.belief.as_slice()).collect();
        let clocks: Vec<usize> = self.components.iter().map(|c| c.clock).collect();
        let cost = self
            .cost_model
            .breakdown(&beliefs, actions, &beliefs_next, &clocks)?;

        let undiscounted_reward = cost.reward();
        let reward = self
            .config
            .env
            .discount_reward
            .powi(self.time_step as i32)
            * undiscounted_reward;

        let applied_at = self.time_step;
        let observation_codes = updates.iter().map(|u| u.observation).collect();
        self.components = updates.into_iter().map(|u| u.state).collect();
        self.time_step += 1;
        self.done = self.time_step >= self.config.env.ep_length;

        Ok(StepResult {
            observations: self.observations(),
            reward,
            done: self.done,
            info: Some(StepInfo {
                time_step: applied_at,
                actions: actions.to_vec(),
                observation_codes,
                twin_modes,
                clocks: self.components.iter().map(|c| c.clock).collect(),
                undiscounted_reward,
                cost,
            }),
        })
    }

    /// Step with raw integer action codes, one per agent.
    pub fn step_codes(&mut self, codes: &[u8]) -> Result<StepResult> {
        let actions = codes
            .iter()
            .map(|&c| Action::from_code(c))
            .collect::<Result<Vec<_>>>()?;
        self.step(&actions)
    }

    pub fn observations(&self) -> Vec<AgentObservation> {
        let time_fraction = self.time_step as f64 / self.config.env.ep_length as f64;
        self.agent_ids
            .iter()
            .zip(&self.components)
            .map(|(id, c)| AgentObservation {
                agent_id: id.clone(),
                crack_marginal: self.model.crack_marginal(&c.belief),
                stress_marginal: self.model.stress_marginal(&c.belief),
                twin_uncertainty: c.twin_uncertainty,
                time_fraction,
            })
            .collect()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn model(&self) -> &PomdpModel {
        &self.model
    }

    pub fn agent_ids(&self) -> &[String] {
        &self.agent_ids
    }

    pub fn components(&self) -> &[ComponentState] {
        &self.components
    }

    pub fn num_agents(&self) -> usize {
        self.agent_ids.len()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}
