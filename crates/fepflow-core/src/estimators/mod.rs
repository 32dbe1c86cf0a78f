//! Free energy estimators for fast-growth thermodynamic integration work
//! data: Crooks Gaussian Intersection, Bennett Acceptance Ratio, and the
//! Jarzynski equality, plus a Kolmogorov-Smirnov normality check.
//!
//! All estimators take forward and reverse work values in kJ/mol, expressed
//! in the 0 -> 1 lambda frame (see [`crate::core::io::xvg`]).

pub mod bar;
pub mod crooks;
pub mod gauss;
pub mod jarz;
pub mod ks;

use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum EstimatorError {
    #[error("No work values for the {0} transformation")]
    EmptyWorkSet(&'static str),

    #[error("Work distribution for the {0} transformation has zero width")]
    Degenerate(&'static str),

    #[error("Failed to bracket the BAR solution after {0} interval expansions")]
    NoConvergence(usize),

    #[error("{nblocks} blocks requested but only {n} work values available")]
    TooManyBlocks { nblocks: usize, n: usize },
}

/// Resamples one work set with replacement.
fn resample<R: Rng>(values: &[f64], rng: &mut R) -> Vec<f64> {
    (0..values.len())
        .map(|_| values[rng.gen_range(0..values.len())])
        .collect()
}

/// Bootstrap standard error of an estimate over a forward/reverse pair.
pub(crate) fn bootstrap_error<R: Rng>(
    wf: &[f64],
    wr: &[f64],
    nboots: usize,
    rng: &mut R,
    estimate: impl Fn(&[f64], &[f64]) -> f64,
) -> Option<f64> {
    if nboots == 0 {
        return None;
    }
    let estimates: Vec<f64> = (0..nboots)
        .map(|_| estimate(&resample(wf, rng), &resample(wr, rng)))
        .collect();
    Some(gauss::std_dev(&estimates))
}

/// Bootstrap standard error of a single-direction estimate.
pub(crate) fn bootstrap_error_single<R: Rng>(
    values: &[f64],
    nboots: usize,
    rng: &mut R,
    estimate: impl Fn(&[f64]) -> f64,
) -> Option<f64> {
    if nboots == 0 {
        return None;
    }
    let estimates: Vec<f64> = (0..nboots)
        .map(|_| estimate(&resample(values, rng)))
        .collect();
    Some(gauss::std_dev(&estimates))
}

/// Splits a slice into `nblocks` contiguous, near-equal chunks. The dgdl
/// files of each repeat are read contiguously, so contiguous blocks line up
/// with independent repeats.
fn blocks(values: &[f64], nblocks: usize) -> Vec<&[f64]> {
    let n = values.len();
    let base = n / nblocks;
    let extra = n % nblocks;
    let mut out = Vec::with_capacity(nblocks);
    let mut start = 0;
    for b in 0..nblocks {
        let len = base + usize::from(b < extra);
        out.push(&values[start..start + len]);
        start += len;
    }
    out
}

/// Standard error across per-block estimates of a forward/reverse pair.
pub(crate) fn block_error(
    wf: &[f64],
    wr: &[f64],
    nblocks: usize,
    estimate: impl Fn(&[f64], &[f64]) -> f64,
) -> Result<Option<f64>, EstimatorError> {
    if nblocks <= 1 {
        return Ok(None);
    }
    let n = wf.len().min(wr.len());
    if nblocks > n {
        return Err(EstimatorError::TooManyBlocks { nblocks, n });
    }
    let estimates: Vec<f64> = blocks(wf, nblocks)
        .into_iter()
        .zip(blocks(wr, nblocks))
        .map(|(f, r)| estimate(f, r))
        .collect();
    Ok(Some(
        gauss::std_dev(&estimates) / (nblocks as f64).sqrt(),
    ))
}

/// Standard error across per-block estimates of a single direction.
pub(crate) fn block_error_single(
    values: &[f64],
    nblocks: usize,
    estimate: impl Fn(&[f64]) -> f64,
) -> Result<Option<f64>, EstimatorError> {
    if nblocks <= 1 {
        return Ok(None);
    }
    if nblocks > values.len() {
        return Err(EstimatorError::TooManyBlocks {
            nblocks,
            n: values.len(),
        });
    }
    let estimates: Vec<f64> = blocks(values, nblocks)
        .into_iter()
        .map(estimate)
        .collect();
    Ok(Some(
        gauss::std_dev(&estimates) / (nblocks as f64).sqrt(),
    ))
}
