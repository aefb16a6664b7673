// src/model.rs
//
// Static POMDP model for a single structural component with a digital twin.
//
// The model is produced offline (discretisation of a crack-growth / load
// model) and is read-only for the lifetime of the process. This module:
// - deserialises it from a JSON artifact,
// - validates shapes and stochasticity once, at load time,
// - offers a small deterministic parametric builder used by tests and the
//   research harness when no artifact is supplied.
//
// State layout: joint index `s = d * n_st_stress + q` (crack outermost), so
// the last `n_st_stress` states are the failed ones.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StructError};
use crate::linalg::{check_distribution, Matrix};
use crate::types::{ComponentState, TwinMode, TwinUncertainty, N_TWIN_MODES};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PomdpModel {
    /// Crack-depth bin edges (`n_st_comp + 1` values).
    pub d_interv: Vec<f64>,
    /// Stress-range bin edges (`n_st_stress + 1` values).
    pub q_interv: Vec<f64>,

    /// Do-nothing transitions, indexed by deterioration clock.
    pub t0: Vec<Matrix>,
    /// Perfect-repair transitions, indexed by deterioration clock.
    pub tr: Vec<Matrix>,

    /// Twin-mode transition when the monitoring setup is untouched.
    pub t0_twin: Matrix,
    /// Twin-mode transition after a perfect repair without sensor.
    pub tr_twin: Matrix,
    /// Twin-mode transition after a sensor install.
    pub ts_twin: Matrix,

    /// Inspection-only likelihood (`n_states x 2*n_st_stress`).
    pub o_ins: Matrix,
    /// Physical sensor likelihood (`n_states x n_st_stress`).
    pub o_monitor: Matrix,
    /// Inspection + physical sensor likelihood (`n_states x 2*n_st_stress`).
    pub o_ins_monitor: Matrix,

    pub belief0: Vec<f64>,
    pub belief0_twin: Vec<f64>,
    pub belief0_eps: TwinUncertainty,
}

impl PomdpModel {
    pub fn n_st_comp(&self) -> usize {
        self.d_interv.len().saturating_sub(1)
    }

    pub fn n_st_stress(&self) -> usize {
        self.q_interv.len().saturating_sub(1)
    }

    pub fn n_states(&self) -> usize {
        self.n_st_comp() * self.n_st_stress()
    }

    /// Observation code emitted when nothing was observed.
    pub fn no_observation_code(&self) -> usize {
        2 * self.n_st_stress()
    }

    /// Largest deterioration clock the transition tables cover.
    pub fn max_clock(&self) -> usize {
        self.t0.len().saturating_sub(1)
    }

    pub fn do_nothing_transition(&self, clock: usize) -> Result<&Matrix> {
        self.t0.get(clock).ok_or(StructError::ClockOutOfRange {
            clock,
            max: self.max_clock(),
        })
    }

    pub fn repair_transition(&self, clock: usize) -> Result<&Matrix> {
        self.tr.get(clock).ok_or(StructError::ClockOutOfRange {
            clock,
            max: self.tr.len().saturating_sub(1),
        })
    }

    /// Marginal failure probability: mass on the worst crack state.
    pub fn failure_probability(&self, belief: &[f64]) -> f64 {
        let n = self.n_st_stress();
        belief[belief.len().saturating_sub(n)..].iter().sum()
    }

    /// Crack-state marginal of a joint belief.
    pub fn crack_marginal(&self, belief: &[f64]) -> Vec<f64> {
        belief
            .chunks(self.n_st_stress())
            .map(|c| c.iter().sum())
            .collect()
    }

    /// Stress-state marginal of a joint belief.
    pub fn stress_marginal(&self, belief: &[f64]) -> Vec<f64> {
        let n = self.n_st_stress();
        let mut out = vec![0.0; n];
        for chunk in belief.chunks(n) {
            for (o, p) in out.iter_mut().zip(chunk) {
                *o += p;
            }
        }
        out
    }

    /// Fresh component state at episode start.
    pub fn initial_state(&self) -> ComponentState {
        ComponentState {
            belief: self.belief0.clone(),
            twin_belief: self.belief0_twin.clone(),
            twin_uncertainty: self.belief0_eps,
            clock: 0,
        }
    }

    /// Check every shape and stochasticity constraint the engine relies on.
    pub fn validate(&self) -> Result<()> {
        check_edges("d_interv", &self.d_interv)?;
        check_edges("q_interv", &self.q_interv)?;

        let n_states = self.n_states();
        let n_stress = self.n_st_stress();

        if self.t0.is_empty() {
            return Err(invalid("t0", "at least one clock slice is required"));
        }
        if self.tr.len() != self.t0.len() {
            return Err(invalid(
                "tr",
                format!(
                    "{} clock slices, t0 has {}",
                    self.tr.len(),
                    self.t0.len()
                ),
            ));
        }
        for (name, slices) in [("t0", &self.t0), ("tr", &self.tr)] {
            for (clock, m) in slices.iter().enumerate() {
                check_stochastic(&format!("{}[{}]", name, clock), m, n_states, n_states)?;
            }
        }

        check_stochastic("t0_twin", &self.t0_twin, N_TWIN_MODES, N_TWIN_MODES)?;
        check_stochastic("tr_twin", &self.tr_twin, N_TWIN_MODES, N_TWIN_MODES)?;
        check_stochastic("ts_twin", &self.ts_twin, N_TWIN_MODES, N_TWIN_MODES)?;

        check_stochastic("o_ins", &self.o_ins, n_states, 2 * n_stress)?;
        check_stochastic("o_monitor", &self.o_monitor, n_states, n_stress)?;
        check_stochastic("o_ins_monitor", &self.o_ins_monitor, n_states, 2 * n_stress)?;

        if self.belief0.len() != n_states {
            return Err(invalid(
                "belief0",
                format!("length {}, expected {}", self.belief0.len(), n_states),
            ));
        }
        check_distribution(&self.belief0, "initial belief")
            .map_err(|e| invalid("belief0", e.to_string()))?;
        check_distribution(&self.belief0_twin, "initial twin-mode")
            .map_err(|e| invalid("belief0_twin", e.to_string()))?;
        TwinMode::from_belief(&self.belief0_twin)
            .map_err(|e| invalid("belief0_twin", e.to_string()))?;
        self.belief0_eps
            .validate()
            .map_err(|e| invalid("belief0_eps", e.to_string()))?;

        Ok(())
    }

    /// Parse and validate a JSON model artifact.
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let model: PomdpModel =
            serde_json::from_str(s).context("failed to parse POMDP model JSON")?;
        model.validate().context("POMDP model failed validation")?;
        Ok(model)
    }

    /// Load and validate a JSON model artifact from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read model file {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("in model file {}", path.display()))
    }

    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialise POMDP model")
    }

    /// Build the parametric model described by `params`.
    pub fn synthetic(params: &SyntheticModelParams) -> Result<Self> {
        let model = build_synthetic(params);
        model.validate()?;
        Ok(model)
    }
}

impl Default for PomdpModel {
    fn default() -> Self {
        build_synthetic(&SyntheticModelParams::default())
    }
}

fn invalid(field: &str, message: impl Into<String>) -> StructError {
    StructError::InvalidModel {
        field: field.to_string(),
        message: message.into(),
    }
}

fn check_edges(field: &str, edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(invalid(field, "need at least two edges"));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(invalid(field, "edges must be finite"));
    }
    if edges.windows(2).any(|w| w[1] <= w[0]) {
        return Err(invalid(field, "edges must be strictly increasing"));
    }
    Ok(())
}

fn check_stochastic(field: &str, m: &Matrix, rows: usize, cols: usize) -> Result<()> {
    if m.rows() != rows || m.cols() != cols {
        return Err(invalid(
            field,
            format!(
                "shape {}x{}, expected {}x{}",
                m.rows(),
                m.cols(),
                rows,
                cols
            ),
        ));
    }
    if !m.is_row_stochastic() {
        return Err(invalid(field, "rows must be non-negative and sum to 1"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Parametric model
// ---------------------------------------------------------------------------

/// Knobs for the parametric crack-growth model.
///
/// Crack growth is a one-bin-per-step jump whose probability grows with the
/// stress bin and with the deterioration clock. Stress is a fixed (unknown)
/// property of the component and never changes state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticModelParams {
    pub crack_edges: Vec<f64>,
    pub stress_edges: Vec<f64>,
    /// Number of clock slices in the transition tables.
    pub clock_slices: usize,
    /// Per-step jump probability at the lowest stress, clock 0.
    pub growth_base: f64,
    /// Relative increase of the jump probability from lowest to highest stress.
    pub growth_stress: f64,
    /// Relative increase of the jump probability per clock step.
    pub growth_aging: f64,
    /// Probability of detection for the largest non-failed crack.
    pub pod_max: f64,
    /// Probability that the physical sensor reports the true stress bin.
    pub monitor_accuracy: f64,
    pub initial_twin_mode: TwinMode,
    pub initial_eps: TwinUncertainty,
}

impl Default for SyntheticModelParams {
    fn default() -> Self {
        Self {
            crack_edges: vec![0.0, 0.5, 1.0, 2.0, 5.0, 20.0],
            stress_edges: vec![0.5, 0.75, 1.0, 1.25, 1.5],
            clock_slices: 21,
            growth_base: 0.04,
            growth_stress: 1.5,
            growth_aging: 0.05,
            pod_max: 0.9,
            monitor_accuracy: 0.8,
            initial_twin_mode: TwinMode::NoSensor,
            initial_eps: TwinUncertainty::new(0.1, 0.2),
        }
    }
}

const MAX_JUMP_PROBABILITY: f64 = 0.95;

fn build_synthetic(p: &SyntheticModelParams) -> PomdpModel {
    let n_d = p.crack_edges.len().saturating_sub(1);
    let n_q = p.stress_edges.len().saturating_sub(1);
    let n_states = n_d * n_q;
    let idx = |d: usize, q: usize| d * n_q + q;

    // New components: crack-free, stress uniform.
    let mut belief0 = vec![0.0; n_states];
    for q in 0..n_q {
        belief0[idx(0, q)] = 1.0 / n_q as f64;
    }

    let stress_weight = |q: usize| {
        if n_q > 1 {
            q as f64 / (n_q - 1) as f64
        } else {
            0.0
        }
    };

    let mut t0 = Vec::with_capacity(p.clock_slices);
    let mut tr = Vec::with_capacity(p.clock_slices);
    for clock in 0..p.clock_slices {
        let mut m = Matrix::zeros(n_states, n_states);
        for d in 0..n_d {
            for q in 0..n_q {
                let s = idx(d, q);
                if d + 1 == n_d {
                    m.set(s, s, 1.0);
                    continue;
                }
                let jump = (p.growth_base
                    * (1.0 + p.growth_stress * stress_weight(q))
                    * (1.0 + p.growth_aging * clock as f64))
                    .clamp(0.0, MAX_JUMP_PROBABILITY);
                m.set(s, s, 1.0 - jump);
                m.set(s, idx(d + 1, q), jump);
            }
        }
        t0.push(m);

        // A perfect repair returns any state to the as-new distribution.
        let mut r = Matrix::zeros(n_states, n_states);
        for s in 0..n_states {
            for (j, &b) in belief0.iter().enumerate() {
                r.set(s, j, b);
            }
        }
        tr.push(r);
    }

    let physical = TwinMode::Physical.index();
    let virt = TwinMode::Virtual.index();
    let none = TwinMode::NoSensor.index();

    // A physical sensor reports for one step, after which the twin takes over.
    let mut t0_twin = Matrix::zeros(N_TWIN_MODES, N_TWIN_MODES);
    t0_twin.set(physical, virt, 1.0);
    t0_twin.set(virt, virt, 1.0);
    t0_twin.set(none, none, 1.0);

    let mut tr_twin = Matrix::zeros(N_TWIN_MODES, N_TWIN_MODES);
    let mut ts_twin = Matrix::zeros(N_TWIN_MODES, N_TWIN_MODES);
    for from in 0..N_TWIN_MODES {
        tr_twin.set(from, none, 1.0);
        ts_twin.set(from, physical, 1.0);
    }

    // Stress sensor: true bin with `monitor_accuracy`, remainder to neighbours.
    let mut q_obs = Matrix::zeros(n_q, n_q);
    for q in 0..n_q {
        let mut neighbours = Vec::new();
        if q > 0 {
            neighbours.push(q - 1);
        }
        if q + 1 < n_q {
            neighbours.push(q + 1);
        }
        if neighbours.is_empty() {
            q_obs.set(q, q, 1.0);
            continue;
        }
        q_obs.set(q, q, p.monitor_accuracy);
        let spill = (1.0 - p.monitor_accuracy) / neighbours.len() as f64;
        for nb in neighbours {
            q_obs.set(q, nb, spill);
        }
    }

    // Detection probability grows linearly with the crack bin.
    let pod = |d: usize| {
        if n_d > 1 {
            p.pod_max * d as f64 / (n_d - 1) as f64
        } else {
            0.0
        }
    };

    let mut o_monitor = Matrix::zeros(n_states, n_q);
    let mut o_ins = Matrix::zeros(n_states, 2 * n_q);
    let mut o_ins_monitor = Matrix::zeros(n_states, 2 * n_q);
    for d in 0..n_d {
        let outcome = [pod(d), 1.0 - pod(d)];
        for q in 0..n_q {
            let s = idx(d, q);
            for j in 0..n_q {
                o_monitor.set(s, j, q_obs.get(q, j));
                for (o, &po) in outcome.iter().enumerate() {
                    o_ins.set(s, o * n_q + j, po / n_q as f64);
                    o_ins_monitor.set(s, o * n_q + j, po * q_obs.get(q, j));
                }
            }
        }
    }

    PomdpModel {
        d_interv: p.crack_edges.clone(),
        q_interv: p.stress_edges.clone(),
        t0,
        tr,
        t0_twin,
        tr_twin,
        ts_twin,
        o_ins,
        o_monitor,
        o_ins_monitor,
        belief0,
        belief0_twin: p.initial_twin_mode.one_hot(),
        belief0_eps: p.initial_eps,
    }
}
