use super::{EstimatorError, block_error, bootstrap_error, gauss};
use rand::Rng;
use rand::thread_rng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, instrument};

/// Parametric bootstrap sample count for the intersection error. This error
/// is always reported, independent of the nonparametric bootstrap setting.
const PARAMETRIC_BOOTS: usize = 100;

/// Crooks Gaussian Intersection estimate.
///
/// Fits Gaussians to the forward and reverse work distributions; the free
/// energy is the intersection point of the two curves. When the curves do
/// not usefully intersect, the mean of the two distribution means is used
/// and [`Crooks::intersects`] records the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct Crooks {
    pub mean_forward: f64,
    pub std_forward: f64,
    pub mean_reverse: f64,
    pub std_reverse: f64,
    pub dg: f64,
    pub intersects: bool,
    /// Parametric bootstrap error from the fitted Gaussians.
    pub err_boot_parametric: f64,
    /// Nonparametric bootstrap error over the work values, if requested.
    pub err_boot: Option<f64>,
    /// Block-averaged error, if more than one block was requested.
    pub err_blocks: Option<f64>,
}

impl Crooks {
    #[instrument(skip_all, name = "crooks_estimator")]
    pub fn new(
        wf: &[f64],
        wr: &[f64],
        nboots: usize,
        nblocks: usize,
    ) -> Result<Self, EstimatorError> {
        if wf.is_empty() {
            return Err(EstimatorError::EmptyWorkSet("forward"));
        }
        if wr.is_empty() {
            return Err(EstimatorError::EmptyWorkSet("reverse"));
        }

        let (mean_forward, std_forward) = (gauss::mean(wf), gauss::std_dev(wf));
        let (mean_reverse, std_reverse) = (gauss::mean(wr), gauss::std_dev(wr));
        if std_forward == 0.0 {
            return Err(EstimatorError::Degenerate("forward"));
        }
        if std_reverse == 0.0 {
            return Err(EstimatorError::Degenerate("reverse"));
        }

        let (dg, intersects) =
            intersection(mean_forward, std_forward, mean_reverse, std_reverse);
        debug!(dg, intersects, "Gaussian intersection computed.");

        let mut rng = thread_rng();
        let err_boot_parametric = parametric_bootstrap(
            mean_forward,
            std_forward,
            wf.len(),
            mean_reverse,
            std_reverse,
            wr.len(),
            &mut rng,
        )?;

        let err_boot = bootstrap_error(wf, wr, nboots, &mut rng, |f, r| point_estimate(f, r));
        let err_blocks = block_error(wf, wr, nblocks, |f, r| point_estimate(f, r))?;

        Ok(Self {
            mean_forward,
            std_forward,
            mean_reverse,
            std_reverse,
            dg,
            intersects,
            err_boot_parametric,
            err_boot,
            err_blocks,
        })
    }
}

fn point_estimate(wf: &[f64], wr: &[f64]) -> f64 {
    intersection(
        gauss::mean(wf),
        gauss::std_dev(wf),
        gauss::mean(wr),
        gauss::std_dev(wr),
    )
    .0
}

/// Intersection of two Gaussian pdfs. Returns the crossing point between the
/// two means when it exists, otherwise the midpoint of the means with a
/// `false` flag.
fn intersection(mf: f64, devf: f64, mr: f64, devr: f64) -> (f64, bool) {
    let midpoint = 0.5 * (mf + mr);

    let a = 1.0 / (devr * devr) - 1.0 / (devf * devf);
    let b = -2.0 * (mr / (devr * devr) - mf / (devf * devf));
    let c = (mr * mr) / (devr * devr) - (mf * mf) / (devf * devf)
        - 2.0 * (devr / devf).ln();

    // Equal widths degenerate to a linear equation whose root is the midpoint.
    if a.abs() < 1e-12 {
        if b.abs() < 1e-12 {
            return (midpoint, false);
        }
        return (-c / b, true);
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return (midpoint, false);
    }

    let sqrt_d = discriminant.sqrt();
    let roots = [(-b + sqrt_d) / (2.0 * a), (-b - sqrt_d) / (2.0 * a)];

    let (lo, hi) = if mf <= mr { (mf, mr) } else { (mr, mf) };
    let inside: Vec<f64> = roots
        .iter()
        .cloned()
        .filter(|r| *r >= lo && *r <= hi)
        .collect();
    match inside.as_slice() {
        [root] => (*root, true),
        [r1, r2] => {
            // Both crossings inside: take the one closer to the midpoint.
            if (r1 - midpoint).abs() <= (r2 - midpoint).abs() {
                (*r1, true)
            } else {
                (*r2, true)
            }
        }
        _ => (midpoint, false),
    }
}

fn parametric_bootstrap<R: Rng>(
    mf: f64,
    devf: f64,
    nf: usize,
    mr: f64,
    devr: f64,
    nr: usize,
    rng: &mut R,
) -> Result<f64, EstimatorError> {
    let forward =
        Normal::new(mf, devf).map_err(|_| EstimatorError::Degenerate("forward"))?;
    let reverse =
        Normal::new(mr, devr).map_err(|_| EstimatorError::Degenerate("reverse"))?;

    let estimates: Vec<f64> = (0..PARAMETRIC_BOOTS)
        .map(|_| {
            let sample_f: Vec<f64> = (0..nf).map(|_| forward.sample(rng)).collect();
            let sample_r: Vec<f64> = (0..nr).map(|_| reverse.sample(rng)).collect();
            point_estimate(&sample_f, &sample_r)
        })
        .collect();
    Ok(gauss::std_dev(&estimates))
}
