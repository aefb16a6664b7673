// src/belief.rs
//
// Per-component Bayesian filter.
//
// One call to `advance` moves a component through a single decision step:
//   1) resolve the current twin mode (one-hot belief),
//   2) propagate the crack/stress belief (do-nothing or repair transition,
//      indexed by the deterioration clock),
//   3) fuse whatever the action and twin mode observe, sampling a single
//      observation and conditioning on that same sample,
//   4) evolve the twin-mode belief and the twin noise parameter.
//
// Components are independent; the only shared resource is the RNG, which is
// passed in explicitly so runs are reproducible from a seed.

use std::borrow::Cow;
use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::config::TwinConfig;
use crate::error::{Result, StructError};
use crate::linalg::{check_distribution, Matrix};
use crate::model::PomdpModel;
use crate::twin_observation::DigitalTwinObservationModel;
use crate::types::{
    Action, ComponentState, ObservationChannel, TwinMode, TwinTransition, TwinUncertainty,
};

/// Smallest evidence `P(o | prior)` we are willing to condition on.
pub const EVIDENCE_FLOOR: f64 = 1e-12;

/// Result of advancing one component by one step.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentUpdate {
    /// Sampled observation code, or the model's no-observation sentinel.
    pub observation: usize,
    /// Twin noise level drawn this step, if the virtual sensor was queried.
    pub epsilon: Option<f64>,
    pub state: ComponentState,
}

/// Likelihood chosen for one step, plus the twin noise drawn to build it.
struct ObservationModel<'m> {
    likelihood: Cow<'m, Matrix>,
    epsilon: Option<f64>,
}

pub struct BeliefUpdateEngine {
    model: Arc<PomdpModel>,
    twin: DigitalTwinObservationModel,
    eps_baseline: f64,
    /// Per-state `[P(detect), P(no detect)]` from the inspection model.
    inspection_split: Vec<[f64; 2]>,
}

impl BeliefUpdateEngine {
    pub fn new(model: Arc<PomdpModel>, twin_cfg: &TwinConfig) -> Result<Self> {
        let twin = DigitalTwinObservationModel::new(&model, twin_cfg)?;
        let inspection_split = inspection_split(&model);
        Ok(Self {
            model,
            twin,
            eps_baseline: twin_cfg.eps_baseline,
            inspection_split,
        })
    }

    pub fn model(&self) -> &PomdpModel {
        &self.model
    }

    pub fn twin_model(&self) -> &DigitalTwinObservationModel {
        &self.twin
    }

    /// Advance a single component through `action`.
    pub fn advance<R: Rng + ?Sized>(
        &self,
        state: &ComponentState,
        action: Action,
        rng: &mut R,
    ) -> Result<ComponentUpdate> {
        self.check_state(state)?;
        let mode = TwinMode::from_belief(&state.twin_belief)?;

        // Physical twin.
        let (prior, clock) = if action.is_repair() {
            let tr = self.model.repair_transition(state.clock)?;
            (tr.left_mul(&state.belief)?, 0)
        } else {
            let t0 = self.model.do_nothing_transition(state.clock)?;
            (t0.left_mul(&state.belief)?, state.clock + 1)
        };

        let mut twin_uncertainty = state.twin_uncertainty;
        let mut observation = self.model.no_observation_code();
        let mut epsilon = None;

        let belief = match action.channel() {
            None => prior,
            Some(channel) => match self.observation_model(channel, mode, state, rng)? {
                None => prior,
                Some(obs_model) => {
                    let predictive = predictive(&prior, &obs_model.likelihood)?;
                    let sampled = sample_observation(&predictive, rng)?;
                    let posterior = posterior(&prior, &obs_model.likelihood, sampled)?;
                    if let Some(eps) = obs_model.epsilon {
                        twin_uncertainty.mean = eps;
                        epsilon = Some(eps);
                    }
                    observation = sampled;
                    posterior
                }
            },
        };

        // Digital twin.
        let twin_matrix = match action.twin_transition() {
            TwinTransition::Repair => &self.model.tr_twin,
            TwinTransition::Passive => &self.model.t0_twin,
            TwinTransition::Install => &self.model.ts_twin,
        };
        let twin_belief = twin_matrix.left_mul(&state.twin_belief)?;
        if action.twin_transition() != TwinTransition::Passive {
            twin_uncertainty = self.reset_uncertainty(twin_uncertainty);
        }

        Ok(ComponentUpdate {
            observation,
            epsilon,
            state: ComponentState {
                belief,
                twin_belief,
                twin_uncertainty,
                clock,
            },
        })
    }

    /// Advance every component, in index order, sharing `rng`.
    pub fn advance_all<R: Rng + ?Sized>(
        &self,
        states: &[ComponentState],
        actions: &[Action],
        rng: &mut R,
    ) -> Result<Vec<ComponentUpdate>> {
        if states.len() != actions.len() {
            return Err(StructError::DimensionMismatch {
                what: "actions per component",
                expected: states.len(),
                actual: actions.len(),
            });
        }
        states
            .iter()
            .zip(actions)
            .map(|(s, &a)| self.advance(s, a, rng))
            .collect()
    }

    /// Likelihood for a non-repair step, or `None` when nothing is observed.
    ///
    /// Every (channel, twin mode) pair is spelled out.
    fn observation_model<'m, R: Rng + ?Sized>(
        &'m self,
        channel: ObservationChannel,
        mode: TwinMode,
        state: &ComponentState,
        rng: &mut R,
    ) -> Result<Option<ObservationModel<'m>>> {
        let fixed = |m: &'m Matrix| {
            Some(ObservationModel {
                likelihood: Cow::Borrowed(m),
                epsilon: None,
            })
        };

        let obs = match (channel, mode) {
            (ObservationChannel::Passive, TwinMode::NoSensor) => None,
            (ObservationChannel::Passive, TwinMode::Physical) => fixed(&self.model.o_monitor),
            (ObservationChannel::Passive, TwinMode::Virtual) => {
                let (q_obs, eps) = self.twin.build(&state.twin_uncertainty, rng)?;
                Some(ObservationModel {
                    likelihood: Cow::Owned(q_obs),
                    epsilon: Some(eps),
                })
            }
            (ObservationChannel::Inspection, TwinMode::NoSensor) => fixed(&self.model.o_ins),
            (ObservationChannel::Inspection, TwinMode::Physical) => {
                fixed(&self.model.o_ins_monitor)
            }
            (ObservationChannel::Inspection, TwinMode::Virtual) => {
                let (q_obs, eps) = self.twin.build(&state.twin_uncertainty, rng)?;
                Some(ObservationModel {
                    likelihood: Cow::Owned(self.fuse_inspection(&q_obs)),
                    epsilon: Some(eps),
                })
            }
        };
        Ok(obs)
    }

    /// Joint (inspection outcome, observed stress) likelihood: detection
    /// outcomes occupy columns `[0, n)`, non-detection `[n, 2n)`.
    pub fn fuse_inspection(&self, q_obs: &Matrix) -> Matrix {
        let n = q_obs.cols();
        let mut out = Matrix::zeros(q_obs.rows(), 2 * n);
        for (s, split) in self.inspection_split.iter().enumerate() {
            for j in 0..n {
                let q = q_obs.get(s, j);
                out.set(s, j, q * split[0]);
                out.set(s, n + j, q * split[1]);
            }
        }
        out
    }

    fn reset_uncertainty(&self, current: TwinUncertainty) -> TwinUncertainty {
        TwinUncertainty {
            mean: self.eps_baseline,
            dispersion: current.dispersion,
        }
    }

    fn check_state(&self, state: &ComponentState) -> Result<()> {
        let n_states = self.model.n_states();
        if state.belief.len() != n_states {
            return Err(StructError::DimensionMismatch {
                what: "component belief length",
                expected: n_states,
                actual: state.belief.len(),
            });
        }
        check_distribution(&state.belief, "component belief")?;
        check_distribution(&state.twin_belief, "twin-mode")?;
        state.twin_uncertainty.validate()
    }
}

/// Inspection outcome probabilities per state, taken as the block mass of
/// the inspection model over its detect / no-detect halves.
fn inspection_split(model: &PomdpModel) -> Vec<[f64; 2]> {
    let n = model.n_st_stress();
    (0..model.o_ins.rows())
        .map(|s| {
            let row = model.o_ins.row(s);
            let detect: f64 = row[..n].iter().sum();
            let miss: f64 = row[n..].iter().sum();
            [detect, miss]
        })
        .collect()
}

/// Predictive distribution over observations: `p(o) = sum_s prior[s] L[s][o]`.
pub fn predictive(prior: &[f64], likelihood: &Matrix) -> Result<Vec<f64>> {
    likelihood.left_mul(prior)
}

/// Prior reweighted by likelihood column `column` and renormalised.
pub fn posterior(prior: &[f64], likelihood: &Matrix, column: usize) -> Result<Vec<f64>> {
    if prior.len() != likelihood.rows() {
        return Err(StructError::DimensionMismatch {
            what: "prior length vs likelihood rows",
            expected: likelihood.rows(),
            actual: prior.len(),
        });
    }
    if column >= likelihood.cols() {
        return Err(StructError::DimensionMismatch {
            what: "observation column",
            expected: likelihood.cols(),
            actual: column,
        });
    }
    let mut weighted: Vec<f64> = prior
        .iter()
        .zip(likelihood.column(column))
        .map(|(p, l)| p * l)
        .collect();
    let evidence: f64 = weighted.iter().sum();
    if !(evidence.is_finite() && evidence > EVIDENCE_FLOOR) {
        return Err(StructError::DegenerateEvidence {
            observation: column,
            evidence,
        });
    }
    for w in &mut weighted {
        *w /= evidence;
    }
    Ok(weighted)
}

/// Draw one observation index from a predictive distribution.
pub fn sample_observation<R: Rng + ?Sized>(predictive: &[f64], rng: &mut R) -> Result<usize> {
    let dist = WeightedIndex::new(predictive).map_err(|e| StructError::DegenerateDistribution {
        reason: e.to_string(),
    })?;
    Ok(dist.sample(rng))
}
