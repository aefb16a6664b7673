// src/cost.rs
//
// Immediate cost (negative reward) of one decision step.
//
// Two parts:
// - action costs: repair, sensor install, inspection, plus an optional
//   one-off campaign cost when any component is visited;
// - risk cost: change in k-out-of-n system failure probability across the
//   step, scaled by a large penalty.
//
// For the do-nothing family the "after" failure probability is recomputed
// from the propagated, pre-observation belief. The reward therefore measures
// what the action does to the structure, not what happened to be observed;
// the filter state that the episode carries forward is the posterior.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{CostConfig, EnvConfig};
use crate::error::{Result, StructError};
use crate::linalg::check_distribution;
use crate::model::PomdpModel;
use crate::reliability::system_failure_probability;
use crate::types::Action;

/// Breakdown of a step cost for telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Sum of per-component maintenance costs (positive magnitude).
    pub action_cost: f64,
    /// Failure-risk cost (positive magnitude).
    pub risk_cost: f64,
    /// Campaign cost charged this step (0 or the configured amount).
    pub campaign_cost: f64,
    pub pf_sys_before: f64,
    pub pf_sys_after: f64,
    /// Per-component failure probabilities used for `pf_sys_after`.
    pub pf_components_after: Vec<f64>,
}

impl CostBreakdown {
    /// Scalar reward: the negated total cost.
    pub fn reward(&self) -> f64 {
        -(self.action_cost + self.risk_cost + self.campaign_cost)
    }
}

pub struct CostModel {
    model: Arc<PomdpModel>,
    costs: CostConfig,
    n_comp: usize,
    k_comp: usize,
    campaign_enabled: bool,
}

impl CostModel {
    pub fn new(model: Arc<PomdpModel>, costs: CostConfig, env: &EnvConfig) -> Self {
        Self {
            model,
            costs,
            n_comp: env.n_comp,
            k_comp: env.k(),
            campaign_enabled: env.campaign_cost,
        }
    }

    /// Scalar reward for a step; always `<= 0`.
    pub fn cost<B: AsRef<[f64]>>(
        &self,
        beliefs: &[B],
        actions: &[Action],
        beliefs_next: &[B],
        clocks: &[usize],
    ) -> Result<f64> {
        Ok(self
            .breakdown(beliefs, actions, beliefs_next, clocks)?
            .reward())
    }

    pub fn breakdown<B: AsRef<[f64]>>(
        &self,
        beliefs: &[B],
        actions: &[Action],
        beliefs_next: &[B],
        clocks: &[usize],
    ) -> Result<CostBreakdown> {
        for (what, len) in [
            ("beliefs per component", beliefs.len()),
            ("actions per component", actions.len()),
            ("next beliefs per component", beliefs_next.len()),
            ("clocks per component", clocks.len()),
        ] {
            if len != self.n_comp {
                return Err(StructError::DimensionMismatch {
                    what,
                    expected: self.n_comp,
                    actual: len,
                });
            }
        }
        let n_states = self.model.n_states();
        for (what, b) in beliefs
            .iter()
            .map(|b| ("component belief", b.as_ref()))
            .chain(beliefs_next.iter().map(|b| ("next component belief", b.as_ref())))
        {
            if b.len() != n_states {
                return Err(StructError::DimensionMismatch {
                    what,
                    expected: n_states,
                    actual: b.len(),
                });
            }
            check_distribution(b, what)?;
        }

        let pf_before: Vec<f64> = beliefs
            .iter()
            .map(|b| self.component_pf(b.as_ref()))
            .collect();
        let mut pf_after: Vec<f64> = beliefs_next
            .iter()
            .map(|b| self.component_pf(b.as_ref()))
            .collect();

        let mut action_cost = 0.0;
        let mut campaign = false;
        for (i, &action) in actions.iter().enumerate() {
            match action {
                Action::PerfectRepair => action_cost += self.costs.repair,
                Action::PerfectRepairWithSensor => {
                    action_cost += self.costs.repair + self.costs.sensor
                }
                Action::DoNothing => {}
                Action::Inspect => action_cost += self.costs.inspection,
                Action::InstallSensor => action_cost += self.costs.sensor,
                Action::InspectAndInstall => action_cost += self.costs.inspection_and_sensor,
            }
            if action != Action::DoNothing {
                campaign = true;
            }
            if !action.is_repair() {
                let t0 = self.model.do_nothing_transition(clocks[i])?;
                let predicted = t0.left_mul(beliefs[i].as_ref())?;
                pf_after[i] = self.component_pf(&predicted);
            }
        }

        let (pf_sys_before, pf_sys_after) = if self.n_comp < 2 {
            (pf_before[0], pf_after[0])
        } else {
            (
                system_failure_probability(&pf_before, self.k_comp)?,
                system_failure_probability(&pf_after, self.k_comp)?,
            )
        };

        let risk_cost = if pf_sys_after < pf_sys_before {
            pf_sys_after * self.costs.failure_penalty
        } else {
            (pf_sys_after - pf_sys_before) * self.costs.failure_penalty
        };

        let campaign_cost = if campaign && self.campaign_enabled {
            self.costs.campaign
        } else {
            0.0
        };

        Ok(CostBreakdown {
            action_cost,
            risk_cost,
            campaign_cost,
            pf_sys_before,
            pf_sys_after,
            pf_components_after: pf_after,
        })
    }

    fn component_pf(&self, belief: &[f64]) -> f64 {
        // Beliefs are checked on entry; this only absorbs rounding within
        // STOCHASTIC_TOLERANCE.
        self.model.failure_probability(belief).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost_model(n_comp: usize, campaign: bool) -> CostModel {
        let env = EnvConfig {
            n_comp,
            k_comp: Some(n_comp),
            campaign_cost: campaign,
            ..EnvConfig::default()
        };
        CostModel::new(
            Arc::new(PomdpModel::default()),
            CostConfig::default(),
            &env,
        )
    }

    fn fresh(n: usize) -> Vec<Vec<f64>> {
        vec![PomdpModel::default().belief0; n]
    }

    #[test]
    fn do_nothing_on_new_structure_costs_nothing() {
        let cm = cost_model(3, false);
        let b = fresh(3);
        let r = cm
            .cost(&b, &[Action::DoNothing; 3], &b, &[0, 0, 0])
            .unwrap();
        // One step from as-new cannot reach the failed crack bin.
        assert_eq!(r, 0.0);
    }

    #[test]
    fn repair_and_sensor_costs_add_up() {
        let cm = cost_model(3, false);
        let b = fresh(3);
        let bd = cm
            .breakdown(
                &b,
                &[
                    Action::PerfectRepair,
                    Action::PerfectRepairWithSensor,
                    Action::InspectAndInstall,
                ],
                &b,
                &[0, 0, 0],
            )
            .unwrap();
        assert_eq!(bd.action_cost, 10.0 + 13.0 + 4.0);
        assert_eq!(bd.campaign_cost, 0.0);
    }

    #[test]
    fn campaign_charged_once() {
        let cm = cost_model(3, true);
        let b = fresh(3);
        let bd = cm
            .breakdown(&b, &[Action::Inspect; 3], &b, &[0, 0, 0])
            .unwrap();
        assert_eq!(bd.action_cost, 3.0);
        assert_eq!(bd.campaign_cost, 5.0);
        assert_eq!(bd.reward(), -8.0);
    }

    #[test]
    fn do_nothing_never_triggers_campaign() {
        let cm = cost_model(2, true);
        let b = fresh(2);
        let bd = cm
            .breakdown(&b, &[Action::DoNothing; 2], &b, &[0, 0])
            .unwrap();
        assert_eq!(bd.campaign_cost, 0.0);
    }

    #[test]
    fn risk_uses_predicted_not_posterior_belief() {
        let model = PomdpModel::default();
        let cm = cost_model(1, false);
        let mut before = model.belief0.clone();
        // Put everything one bin below failure.
        before.iter_mut().for_each(|p| *p = 0.0);
        let n_q = model.n_st_stress();
        let last_ok = (model.n_st_comp() - 2) * n_q;
        before[last_ok] = 1.0;

        // A (fictitious) posterior claiming the component is as-new.
        let after = model.belief0.clone();
        let bd = cm
            .breakdown(
                &[before.clone()],
                &[Action::Inspect],
                &[after],
                &[0],
            )
            .unwrap();
        let predicted = model.t0[0].left_mul(&before).unwrap();
        let pf_pred = model.failure_probability(&predicted);
        assert!(pf_pred > 0.0);
        assert!((bd.pf_sys_after - pf_pred).abs() < 1e-12);
        assert!((bd.risk_cost - pf_pred * 500.0).abs() < 1e-9);
    }

    #[test]
    fn repair_below_prior_risk_charges_residual() {
        let model = PomdpModel::default();
        let cm = cost_model(1, false);
        let mut failed = vec![0.0; model.n_states()];
        let n = failed.len();
        failed[n - 1] = 1.0;
        let bd = cm
            .breakdown(
                &[failed],
                &[Action::PerfectRepair],
                &[model.belief0.clone()],
                &[5],
            )
            .unwrap();
        assert_eq!(bd.pf_sys_before, 1.0);
        assert_eq!(bd.pf_sys_after, 0.0);
        assert_eq!(bd.risk_cost, 0.0);
        assert_eq!(bd.reward(), -10.0);
    }

    #[test]
    fn wrong_component_count_rejected() {
        let cm = cost_model(3, false);
        let b = fresh(2);
        assert!(matches!(
            cm.cost(&b, &[Action::DoNothing; 2], &b, &[0, 0]),
            Err(StructError::DimensionMismatch { .. })
        ));
    }
}
