// src/reliability.rs
//
// System reliability of a k-out-of-n structure with independent components.
//
// The system survives iff at least `k` of its `n` components survive. The
// failure probability is evaluated with a linear-time recursion over a
// working array indexed by "components survived so far", folding mass into
// the success boundary once the outcome can no longer change. Series
// (`k == n`) and parallel (`k == 1`) systems go through the same recursion.

use crate::error::{Result, StructError};

/// Probability that fewer than `k` of the `pf.len()` components survive.
///
/// `pf[i]` is the failure probability of component `i`. A single component
/// returns its own failure probability.
pub fn system_failure_probability(pf: &[f64], k: usize) -> Result<f64> {
    let n = pf.len();
    if n == 0 || k == 0 || k > n {
        return Err(StructError::InvalidK { k, n });
    }
    for (index, &value) in pf.iter().enumerate() {
        if !(0.0..=1.0).contains(&value) {
            return Err(StructError::InvalidProbability { index, value });
        }
    }
    if n < 2 {
        return Ok(pf[0]);
    }

    // 1-based working array; a[m] accumulates the "k survived" boundary.
    let nk = n - k;
    let m = k + 1;
    let mut a = vec![0.0; m + 1];
    a[1] = 1.0;
    let mut lower = 1;

    for j in 1..=n {
        let mut upper = j + 1;
        let rel = 1.0 - pf[j - 1];
        if nk < j {
            lower = upper - nk;
        }
        if k < j {
            a[m] += a[k] * rel;
            upper = k;
        }
        let mut i = upper;
        while i >= lower {
            a[i] += (a[i - 1] - a[i]) * rel;
            i -= 1;
        }
    }

    Ok(1.0 - a[m])
}
