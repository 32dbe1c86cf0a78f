use super::{EstimatorError, block_error, bootstrap_error, gauss};
use crate::core::units::KB;
use rand::thread_rng;
use tracing::{debug, instrument, warn};

const MAX_BRACKET_EXPANSIONS: usize = 100;
const BISECTION_ITERATIONS: usize = 200;
const TOLERANCE: f64 = 1e-10;

/// Bennett Acceptance Ratio estimate.
///
/// Solves the implicit BAR equation for the free energy by root finding on
/// the difference of the forward and reverse Fermi-function sums, including
/// the ln(nf/nr) sample-size term.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub dg: f64,
    /// Analytical standard error.
    pub err: f64,
    pub err_boot: Option<f64>,
    pub err_blocks: Option<f64>,
    /// Convergence diagnostic: the imbalance of the relative fluctuations of
    /// the forward and reverse Fermi averages (Hahn & Then, 2010). Values
    /// near zero indicate balanced sampling of both directions.
    pub conv: f64,
    pub conv_err_boot: Option<f64>,
    pub temperature: f64,
}

impl Bar {
    #[instrument(skip_all, name = "bar_estimator")]
    pub fn new(
        wf: &[f64],
        wr: &[f64],
        temperature: f64,
        nboots: usize,
        nblocks: usize,
    ) -> Result<Self, EstimatorError> {
        if wf.is_empty() {
            return Err(EstimatorError::EmptyWorkSet("forward"));
        }
        if wr.is_empty() {
            return Err(EstimatorError::EmptyWorkSet("reverse"));
        }

        let beta = 1.0 / (KB * temperature);
        let dg = solve_dg(wf, wr, beta)?;
        debug!(dg, "BAR equation solved.");

        let err = analytical_error(dg, wf, wr, beta);
        let conv = convergence(dg, wf, wr, beta);

        let mut rng = thread_rng();
        let err_boot = bootstrap_error(wf, wr, nboots, &mut rng, |f, r| {
            solve_dg(f, r, beta).unwrap_or(dg)
        });
        let conv_err_boot = bootstrap_error(wf, wr, nboots, &mut rng, |f, r| {
            let block_dg = solve_dg(f, r, beta).unwrap_or(dg);
            convergence(block_dg, f, r, beta)
        });
        let err_blocks = block_error(wf, wr, nblocks, |f, r| {
            solve_dg(f, r, beta).unwrap_or(dg)
        })?;

        Ok(Self {
            dg,
            err,
            err_boot,
            err_blocks,
            conv,
            conv_err_boot,
            temperature,
        })
    }
}

#[inline]
fn fermi(x: f64) -> f64 {
    1.0 / (1.0 + x.exp())
}

fn log_ratio(wf: &[f64], wr: &[f64], beta: f64) -> f64 {
    (wf.len() as f64 / wr.len() as f64).ln() / beta
}

/// The BAR residual at a trial dg. Monotonically increasing in dg, which
/// the bracketing below relies on.
fn residual(dg: f64, wf: &[f64], wr: &[f64], beta: f64, m: f64) -> f64 {
    // Reverse works are already reported in the 0 -> 1 frame, hence the
    // mirrored argument.
    let sf: f64 = wf.iter().map(|w| fermi(beta * (m + w - dg))).sum();
    let sr: f64 = wr.iter().map(|w| fermi(beta * (dg - w - m))).sum();
    sf - sr
}

fn solve_dg(wf: &[f64], wr: &[f64], beta: f64) -> Result<f64, EstimatorError> {
    let m = log_ratio(wf, wr, beta);

    let all: Vec<f64> = wf.iter().chain(wr.iter()).cloned().collect();
    let start = gauss::mean(&all);

    // Expand an interval around the combined mean until it brackets the root.
    let mut half_width = 1.0;
    let mut expansions = 0;
    let (mut lo, mut hi) = loop {
        let lo = start - half_width;
        let hi = start + half_width;
        if residual(lo, wf, wr, beta, m) <= 0.0 && residual(hi, wf, wr, beta, m) >= 0.0 {
            break (lo, hi);
        }
        expansions += 1;
        if expansions > MAX_BRACKET_EXPANSIONS {
            return Err(EstimatorError::NoConvergence(expansions));
        }
        half_width *= 2.0;
    };

    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if residual(mid, wf, wr, beta, m) <= 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < TOLERANCE {
            break;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// Bennett's analytical variance estimate.
fn analytical_error(dg: f64, wf: &[f64], wr: &[f64], beta: f64) -> f64 {
    let m = log_ratio(wf, wr, beta);
    let nf = wf.len() as f64;
    let nr = wr.len() as f64;
    let n = nf + nr;

    let sum: f64 = wf
        .iter()
        .chain(wr.iter())
        .map(|w| 1.0 / (2.0 + 2.0 * (beta * (m + w - dg)).cosh()))
        .sum();
    let avg = sum / n;

    let inner = 1.0 / avg - (n / nf + n / nr);
    if inner <= 0.0 {
        warn!("BAR analytical variance collapsed to zero; overlap is essentially complete.");
        return 0.0;
    }
    inner.sqrt() / (beta * n.sqrt())
}

/// Directional imbalance of the relative fluctuation of the Fermi averages.
fn convergence(dg: f64, wf: &[f64], wr: &[f64], beta: f64) -> f64 {
    let m = log_ratio(wf, wr, beta);
    let ff: Vec<f64> = wf.iter().map(|w| fermi(beta * (m + w - dg))).collect();
    let fr: Vec<f64> = wr.iter().map(|w| fermi(beta * (dg - w - m))).collect();

    let rel = |values: &[f64]| {
        let mean = gauss::mean(values);
        if mean == 0.0 {
            return 0.0;
        }
        gauss::variance(values) / (values.len() as f64 * mean * mean)
    };
    rel(&fr) - rel(&ff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    const T: f64 = 298.15;

    fn gaussian_sample(mean: f64, std: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = Normal::new(mean, std).unwrap();
        (0..n).map(|_| dist.sample(&mut rng)).collect()
    }

    #[test]
    fn dissipation_free_works_give_the_exact_free_energy() {
        // With no dissipation both directions report W = dg exactly.
        let wf = vec![5.0, 5.0, 5.0];
        let wr = vec![5.0, 5.0, 5.0];
        let bar = Bar::new(&wf, &wr, T, 0, 1).unwrap();
        assert!((bar.dg - 5.0).abs() < 1e-6);
    }

    #[test]
    fn symmetric_dissipation_recovers_the_midpoint() {
        let beta = 1.0 / (KB * T);
        // Symmetric overlapping distributions around dg = 10.
        let wf = gaussian_sample(10.0 + 1.0 / beta, (2.0 / beta).sqrt(), 4000, 7);
        let wr = gaussian_sample(10.0 - 1.0 / beta, (2.0 / beta).sqrt(), 4000, 8);
        let bar = Bar::new(&wf, &wr, T, 0, 1).unwrap();
        assert!((bar.dg - 10.0).abs() < 0.2);
        assert!(bar.err > 0.0);
    }

    #[test]
    fn unbalanced_sample_sizes_are_handled_through_the_log_ratio_term() {
        let wf = vec![5.0; 100];
        let wr = vec![5.0; 10];
        let bar = Bar::new(&wf, &wr, T, 0, 1).unwrap();
        assert!((bar.dg - 5.0).abs() < 1e-6);
    }

    #[test]
    fn bootstrap_and_block_errors_are_reported_when_requested() {
        let wf = gaussian_sample(12.0, 2.0, 200, 9);
        let wr = gaussian_sample(8.0, 2.0, 200, 10);
        let bar = Bar::new(&wf, &wr, T, 20, 4).unwrap();
        assert!(bar.err_boot.unwrap() > 0.0);
        assert!(bar.err_blocks.unwrap() > 0.0);
        assert!(bar.conv_err_boot.is_some());
    }

    #[test]
    fn balanced_directions_have_a_small_convergence_measure() {
        let wf = gaussian_sample(12.0, 2.0, 2000, 11);
        let wr = gaussian_sample(8.0, 2.0, 2000, 12);
        let bar = Bar::new(&wf, &wr, T, 0, 1).unwrap();
        assert!(bar.conv.abs() < 0.1);
    }

    #[test]
    fn empty_reverse_set_is_rejected() {
        assert!(matches!(
            Bar::new(&[1.0], &[], T, 0, 1),
            Err(EstimatorError::EmptyWorkSet("reverse"))
        ));
    }

    #[test]
    fn residual_is_monotonically_increasing_in_dg() {
        let beta = 1.0 / (KB * T);
        let wf = [4.0, 5.0, 6.0];
        let wr = [3.0, 5.0, 7.0];
        let m = log_ratio(&wf, &wr, beta);
        let values: Vec<f64> = (-10..=10)
            .map(|i| residual(i as f64, &wf, &wr, beta, m))
            .collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }
}
