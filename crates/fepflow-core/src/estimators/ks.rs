use super::{EstimatorError, gauss};
use tracing::instrument;

/// Significance level the acceptance threshold is computed at.
const ALPHA: f64 = 0.05;

/// Series terms for the Kolmogorov distribution tail.
const KOLMOGOROV_TERMS: usize = 100;

/// Result of the Kolmogorov-Smirnov normality check on a work sample.
///
/// The Crooks Gaussian Intersection assumes normal work distributions; this
/// test quantifies how well that assumption holds.
#[derive(Debug, Clone, PartialEq)]
pub struct KsResult {
    /// sqrt(N) * Dmax, the scaled maximum deviation from the fitted normal.
    pub quality: f64,
    /// Acceptance threshold at the 5% significance level.
    pub lambda0: f64,
    /// Raw maximum CDF deviation.
    pub dmax: f64,
    pub ok: bool,
}

/// Tests a work sample against the normal distribution fitted to its own
/// mean and standard deviation.
#[instrument(skip_all, name = "ks_norm_test")]
pub fn ks_norm_test(data: &[f64]) -> Result<KsResult, EstimatorError> {
    if data.is_empty() {
        return Err(EstimatorError::EmptyWorkSet("tested"));
    }
    let mean = gauss::mean(data);
    let std = gauss::std_dev(data);
    if std == 0.0 {
        return Err(EstimatorError::Degenerate("tested"));
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len() as f64;
    let mut dmax: f64 = 0.0;
    for (i, x) in sorted.iter().enumerate() {
        let cdf = gauss::normal_cdf(*x, mean, std);
        let d_plus = (i + 1) as f64 / n - cdf;
        let d_minus = cdf - i as f64 / n;
        dmax = dmax.max(d_plus).max(d_minus);
    }

    let quality = n.sqrt() * dmax;
    let lambda0 = kolmogorov_threshold(ALPHA);

    Ok(KsResult {
        quality,
        lambda0,
        dmax,
        ok: quality <= lambda0,
    })
}

/// Survival function of the Kolmogorov distribution.
fn kolmogorov_tail(lambda: f64) -> f64 {
    let mut sum = 0.0;
    for j in 1..=KOLMOGOROV_TERMS {
        let jf = j as f64;
        let term = (-2.0 * jf * jf * lambda * lambda).exp();
        sum += if j % 2 == 1 { term } else { -term };
    }
    2.0 * sum
}

/// The lambda at which the Kolmogorov tail equals `alpha`, found by
/// bisection. The tail is monotonically decreasing.
fn kolmogorov_threshold(alpha: f64) -> f64 {
    let mut lo = 0.1;
    let mut hi = 5.0;
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if kolmogorov_tail(mid) > alpha {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-12 {
            break;
        }
    }
    0.5 * (lo + hi)
}
