// src/config.rs
//
// Central configuration for the structwin engine.
//
// Three groups:
// - EnvConfig:  system layout (k-out-of-n), horizon, discounting
// - CostConfig: maintenance costs and the failure-risk penalty
// - TwinConfig: constants of the virtual-sensor noise model
//
// Defaults reproduce the reference 3-component series setup. Research runs
// can override a handful of fields through STRUCTWIN_* environment
// variables (see `Config::from_env`).

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Human-readable config / release version.
    pub version: String,
    pub env: EnvConfig,
    pub cost: CostConfig,
    pub twin: TwinConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Number of components (one agent per component).
    pub n_comp: usize,
    /// The system survives iff at least `k_comp` components survive.
    /// `None` means `n_comp - 1`.
    pub k_comp: Option<usize>,
    /// Charge a single campaign cost whenever any component is visited.
    pub campaign_cost: bool,
    /// Per-step reward discount.
    pub discount_reward: f64,
    /// Episode horizon in steps.
    pub ep_length: usize,
}

/// Maintenance costs, as positive magnitudes. The engine reports their
/// negation as reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    pub repair: f64,
    /// Sensor install; also added on top of `repair` for repair + sensor.
    pub sensor: f64,
    pub inspection: f64,
    pub inspection_and_sensor: f64,
    /// Scale applied to system failure probability (or its increase).
    pub failure_penalty: f64,
    /// One-off cost per step in which any visit happens.
    pub campaign: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwinConfig {
    /// Irreducible relative noise of the virtual sensor.
    pub base_dispersion: f64,
    /// Noise mean after a sensor (re)install or a perfect repair.
    pub eps_baseline: f64,
    /// Sub-points per stress bin when averaging the observation pdf.
    pub sub_points: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "structwin-v0.1.0".to_string(),
            env: EnvConfig::default(),
            cost: CostConfig::default(),
            twin: TwinConfig::default(),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            n_comp: 3,
            k_comp: Some(3),
            campaign_cost: false,
            discount_reward: 0.95,
            ep_length: 20,
        }
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            repair: 10.0,
            sensor: 3.0,
            inspection: 1.0,
            inspection_and_sensor: 4.0,
            failure_penalty: 500.0,
            campaign: 5.0,
        }
    }
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            base_dispersion: 0.07,
            eps_baseline: 0.1,
            sub_points: 100,
        }
    }
}

impl EnvConfig {
    /// Effective `k`, resolving the `n_comp - 1` default.
    pub fn k(&self) -> usize {
        self.k_comp
            .unwrap_or_else(|| self.n_comp.saturating_sub(1).max(1))
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_comp == 0 {
            return Err(StructError::InvalidK { k: self.k(), n: 0 });
        }
        let k = self.k();
        if k == 0 || k > self.n_comp {
            return Err(StructError::InvalidK { k, n: self.n_comp });
        }
        if !(self.discount_reward > 0.0 && self.discount_reward <= 1.0) {
            return Err(StructError::InvalidConfig {
                field: "discount_reward",
                message: format!("{} is outside (0, 1]", self.discount_reward),
            });
        }
        if self.ep_length == 0 {
            return Err(StructError::InvalidConfig {
                field: "ep_length",
                message: "horizon must be at least one step".to_string(),
            });
        }
        Ok(())
    }
}

impl CostConfig {
    /// Every cost is a finite, non-negative magnitude.
    pub fn validate(&self) -> Result<()> {
        for (field, v) in [
            ("cost.repair", self.repair),
            ("cost.sensor", self.sensor),
            ("cost.inspection", self.inspection),
            ("cost.inspection_and_sensor", self.inspection_and_sensor),
            ("cost.failure_penalty", self.failure_penalty),
            ("cost.campaign", self.campaign),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(StructError::InvalidConfig {
                    field,
                    message: format!("{v} must be a finite, non-negative magnitude"),
                });
            }
        }
        Ok(())
    }
}

impl TwinConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.base_dispersion.is_finite() && self.base_dispersion >= 0.0) {
            return Err(StructError::InvalidConfig {
                field: "twin.base_dispersion",
                message: format!("{} must be finite and >= 0", self.base_dispersion),
            });
        }
        if !(self.eps_baseline.is_finite() && self.eps_baseline >= 0.0) {
            return Err(StructError::InvalidConfig {
                field: "twin.eps_baseline",
                message: format!("{} must be finite and >= 0", self.eps_baseline),
            });
        }
        // The sub-point grid spans both bin edges.
        if self.sub_points < 2 {
            return Err(StructError::InvalidConfig {
                field: "twin.sub_points",
                message: format!("{} sub-points, need at least 2", self.sub_points),
            });
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.env.validate()?;
        self.cost.validate()?;
        self.twin.validate()
    }

    /// Default config with environment overrides applied.
    ///
    ///   - STRUCTWIN_N_COMP         (usize)
    ///   - STRUCTWIN_K_COMP         (usize)
    ///   - STRUCTWIN_CAMPAIGN_COST  (bool)
    ///   - STRUCTWIN_DISCOUNT       (f64)
    ///   - STRUCTWIN_EP_LENGTH      (usize)
    ///
    /// Any variable that fails to parse is ignored with a warning.
    pub fn from_env() -> Self {
        let mut cfg = Config::default();
        cfg.apply_overrides(|name| std::env::var(name).ok());
        cfg
    }

    /// Apply overrides from an arbitrary lookup (process env in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("STRUCTWIN_N_COMP") {
            override_field("STRUCTWIN_N_COMP", &raw, &mut self.env.n_comp);
        }

        if let Some(raw) = lookup("STRUCTWIN_K_COMP") {
            let mut k = self.env.k();
            if override_field("STRUCTWIN_K_COMP", &raw, &mut k) {
                self.env.k_comp = Some(k);
            }
        } else if lookup("STRUCTWIN_N_COMP").is_some() {
            // Keep the series default consistent with a new component count.
            self.env.k_comp = Some(self.env.n_comp);
        }

        if let Some(raw) = lookup("STRUCTWIN_CAMPAIGN_COST") {
            override_field("STRUCTWIN_CAMPAIGN_COST", &raw, &mut self.env.campaign_cost);
        }

        if let Some(raw) = lookup("STRUCTWIN_DISCOUNT") {
            override_field("STRUCTWIN_DISCOUNT", &raw, &mut self.env.discount_reward);
        }

        if let Some(raw) = lookup("STRUCTWIN_EP_LENGTH") {
            override_field("STRUCTWIN_EP_LENGTH", &raw, &mut self.env.ep_length);
        }
    }
}

/// Parse `raw` into `field`, logging the outcome. Returns whether it applied.
fn override_field<T>(name: &str, raw: &str, field: &mut T) -> bool
where
    T: std::str::FromStr + std::fmt::Display,
{
    match raw.trim().parse::<T>() {
        Ok(v) => {
            eprintln!("[config] {name} = {v} (overrode default)");
            *field = v;
            true
        }
        Err(_) => {
            eprintln!(
                "[config] WARN: could not parse {} = {:?}; using default {}",
                name, raw, field
            );
            false
        }
    }
}
