// src/twin_observation.rs
//
// Observation model of the virtual (digital-twin) load sensor.
//
// The twin's measurement noise is itself uncertain: every time the twin is
// queried a fresh noise level epsilon is drawn from a truncated normal, and a
// stress-observation likelihood is rebuilt for that epsilon. Nothing is
// cached because epsilon depends on the maintenance history.
//
// The random draw lives only in `sample_epsilon`; the likelihood
// construction (`likelihood_for_epsilon`) is deterministic.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::TwinConfig;
use crate::error::{Result, StructError};
use crate::linalg::Matrix;
use crate::model::PomdpModel;
use crate::types::TwinUncertainty;

/// Builds virtual-sensor likelihoods over the model's stress bins.
#[derive(Debug, Clone)]
pub struct DigitalTwinObservationModel {
    q_interv: Vec<f64>,
    n_st_comp: usize,
    base_dispersion: f64,
    sub_points: usize,
}

impl DigitalTwinObservationModel {
    pub fn new(model: &PomdpModel, cfg: &TwinConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            q_interv: model.q_interv.clone(),
            n_st_comp: model.n_st_comp(),
            base_dispersion: cfg.base_dispersion,
            sub_points: cfg.sub_points,
        })
    }

    pub fn n_st_stress(&self) -> usize {
        self.q_interv.len().saturating_sub(1)
    }

    /// Draw a noise level from `Normal(mean, mean * dispersion)`, resampling
    /// while negative.
    pub fn sample_epsilon<R: Rng + ?Sized>(
        &self,
        beps: &TwinUncertainty,
        rng: &mut R,
    ) -> Result<f64> {
        beps.validate()?;
        let normal = Normal::new(beps.mean, beps.mean * beps.dispersion).map_err(|_| {
            StructError::InvalidTwinUncertainty {
                mean: beps.mean,
                dispersion: beps.dispersion,
            }
        })?;
        // mean >= 0, so each draw is accepted with probability >= 1/2.
        loop {
            let eps = normal.sample(rng);
            if eps >= 0.0 {
                return Ok(eps);
            }
        }
    }

    /// True-stress-bin x observed-stress-bin block for a given epsilon.
    pub fn stress_block(&self, epsilon: f64) -> Matrix {
        let n = self.n_st_stress();
        let m = self.sub_points;

        // Reference edges; the outer edges absorb the tails.
        let mut edges = Vec::with_capacity(n + 1);
        edges.push(f64::NEG_INFINITY);
        edges.extend_from_slice(&self.q_interv[1..n]);
        edges.push(f64::INFINITY);

        let mut block = Matrix::zeros(n, n);
        let mut cdf = vec![0.0; n + 1];
        for k in 0..n {
            let lo = self.q_interv[k];
            let hi = self.q_interv[k + 1];
            let mut row = vec![0.0; n];
            for p in 0..m {
                let x = lo + (hi - lo) * p as f64 / (m - 1) as f64;
                let sigma = (self.base_dispersion + epsilon) * x;
                for (c, &edge) in cdf.iter_mut().zip(&edges) {
                    *c = normal_cdf(edge, x, sigma);
                }
                // Keep the CDF monotone so differences stay non-negative.
                for j in 1..=n {
                    if cdf[j] < cdf[j - 1] {
                        cdf[j] = cdf[j - 1];
                    }
                }
                for (j, r) in row.iter_mut().enumerate() {
                    *r += cdf[j + 1] - cdf[j];
                }
            }
            for (j, r) in row.into_iter().enumerate() {
                block.set(k, j, r / m as f64);
            }
        }
        block
    }

    /// Full likelihood (`n_states x n_st_stress`): the stress block tiled over
    /// every crack bin, since the twin does not see cracks.
    pub fn likelihood_for_epsilon(&self, epsilon: f64) -> Matrix {
        let n = self.n_st_stress();
        let block = self.stress_block(epsilon);
        let mut out = Matrix::zeros(self.n_st_comp * n, n);
        for d in 0..self.n_st_comp {
            for q in 0..n {
                for j in 0..n {
                    out.set(d * n + q, j, block.get(q, j));
                }
            }
        }
        out
    }

    /// Sample epsilon and build the matching likelihood.
    pub fn build<R: Rng + ?Sized>(
        &self,
        beps: &TwinUncertainty,
        rng: &mut R,
    ) -> Result<(Matrix, f64)> {
        let epsilon = self.sample_epsilon(beps, rng)?;
        Ok((self.likelihood_for_epsilon(epsilon), epsilon))
    }
}

/// Gaussian CDF; a zero standard deviation is a point mass at `mu`.
pub fn normal_cdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return if x >= mu { 1.0 } else { 0.0 };
    }
    let z = (x - mu) / sigma;
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

/// Complementary error function approximation.
fn erfc(x: f64) -> f64 {
    // Abramowitz & Stegun approximation 7.1.26
    let t = 1.0 / (1.0 + 0.3275911 * x.abs());
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let result = poly * (-x * x).exp();
    if x >= 0.0 {
        result
    } else {
        2.0 - result
    }
}
