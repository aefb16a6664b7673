// src/linalg.rs
//
// Minimal dense row-major matrix used for transition and observation models.
// Serialised as nested row arrays so model artifacts stay human-readable.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructError};

/// Tolerance used when checking that rows / vectors sum to one.
pub const STOCHASTIC_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Build from rows; all rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(StructError::DimensionMismatch {
                    what: "matrix row length",
                    expected: n_cols,
                    actual: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, v: f64) {
        self.data[r * self.cols + c] = v;
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn column(&self, c: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.rows).map(move |r| self.get(r, c))
    }

    /// Row vector times matrix: `out[j] = sum_i v[i] * self[i][j]`.
    pub fn left_mul(&self, v: &[f64]) -> Result<Vec<f64>> {
        if v.len() != self.rows {
            return Err(StructError::DimensionMismatch {
                what: "vector-matrix product",
                expected: self.rows,
                actual: v.len(),
            });
        }
        let mut out = vec![0.0; self.cols];
        for (i, &vi) in v.iter().enumerate() {
            if vi == 0.0 {
                continue;
            }
            for (o, &m) in out.iter_mut().zip(self.row(i)) {
                *o += vi * m;
            }
        }
        Ok(out)
    }

    /// Every entry non-negative and every row summing to one.
    pub fn is_row_stochastic(&self) -> bool {
        (0..self.rows).all(|r| is_distribution(self.row(r)))
    }
}

impl TryFrom<Vec<Vec<f64>>> for Matrix {
    type Error = StructError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Matrix::from_rows(rows)
    }
}

impl From<Matrix> for Vec<Vec<f64>> {
    fn from(m: Matrix) -> Self {
        (0..m.rows).map(|r| m.row(r).to_vec()).collect()
    }
}

/// Non-negative, finite, sums to one within `STOCHASTIC_TOLERANCE`.
pub fn is_distribution(v: &[f64]) -> bool {
    if v.iter().any(|x| !x.is_finite() || *x < 0.0) {
        return false;
    }
    (v.iter().sum::<f64>() - 1.0).abs() <= STOCHASTIC_TOLERANCE
}

/// Validate a probability vector, reporting its sum on failure.
pub fn check_distribution(v: &[f64], what: &'static str) -> Result<()> {
    if is_distribution(v) {
        Ok(())
    } else {
        Err(StructError::InvalidBelief {
            what,
            sum: v.iter().sum(),
        })
    }
}
