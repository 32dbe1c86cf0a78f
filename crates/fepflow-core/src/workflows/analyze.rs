use crate::core::io::integ;
use crate::core::io::xvg::{self, LambdaStart};
use crate::core::units::Unit;
use crate::core::work::{Selection, WorkSet, natural_sort};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::estimators::bar::Bar;
use crate::estimators::crooks::Crooks;
use crate::estimators::jarz::Jarz;
use crate::estimators::ks::{KsResult, ks_norm_test};
use rand::thread_rng;
use std::path::PathBuf;
use tracing::{info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Cgi,
    Bar,
    Jarz,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Cgi, Method::Bar, Method::Jarz];
}

/// Inputs and knobs of one analysis run. Work data comes either from
/// dgdl.xvg files or from previously written integrated-work tables.
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub files_forward: Vec<String>,
    pub files_reverse: Vec<String>,
    pub methods: Vec<Method>,
    pub temperature: f64,
    pub selection: Selection,
    /// Negate reverse works; for studies where both legs ran lambda 0 -> 1.
    pub reverse_b: bool,
    /// Stop after writing the integrated-work tables.
    pub integ_only: bool,
    /// Read cached integrated work instead of the xvg inputs.
    pub integ_in: Option<(PathBuf, PathBuf)>,
    pub integ_out: (PathBuf, PathBuf),
    pub nboots: usize,
    pub nblocks: usize,
    pub unit: Unit,
    pub precision: usize,
    pub do_ks_test: bool,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            files_forward: Vec::new(),
            files_reverse: Vec::new(),
            methods: Method::ALL.to_vec(),
            temperature: 298.15,
            selection: Selection::All,
            reverse_b: false,
            integ_only: false,
            integ_in: None,
            integ_out: (PathBuf::from("integA.dat"), PathBuf::from("integB.dat")),
            nboots: 0,
            nblocks: 1,
            unit: Unit::KiloJoule,
            precision: 2,
            do_ks_test: true,
        }
    }
}

/// Everything the estimators produced, plus the inputs the report needs to
/// render itself.
#[derive(Debug, Clone)]
pub struct AnalysisResults {
    pub forward: WorkSet,
    pub reverse: WorkSet,
    pub crooks: Option<Crooks>,
    pub bar: Option<Bar>,
    pub jarz: Option<Jarz>,
    pub ks_forward: Option<KsResult>,
    pub ks_reverse: Option<KsResult>,
    pub unit: Unit,
    pub temperature: f64,
    pub precision: usize,
}

/// Runs the analysis: select files, integrate (or load cached work), then
/// dispatch the requested estimators. Returns `None` in integration-only
/// mode.
#[instrument(skip_all, name = "analysis_workflow")]
pub fn run(
    config: &AnalyzeConfig,
    reporter: &ProgressReporter,
) -> Result<Option<AnalysisResults>, EngineError> {
    let (forward, reverse) = match &config.integ_in {
        Some((path_a, path_b)) => {
            info!(
                forward = %path_a.display(),
                reverse = %path_b.display(),
                "Reading cached integrated work values."
            );
            (integ::read_integ(path_a)?, integ::read_integ(path_b)?)
        }
        None => {
            let sets = integrate_inputs(config, reporter)?;
            integ::write_integ(&config.integ_out.0, &sets.0)?;
            integ::write_integ(&config.integ_out.1, &sets.1)?;
            if config.integ_only {
                info!("Integration done; skipping analysis.");
                reporter.report(Progress::Message(
                    "Integration done. Skipping analysis.".to_string(),
                ));
                return Ok(None);
            }
            sets
        }
    };

    info!(
        n_forward = forward.len(),
        n_reverse = reverse.len(),
        temperature = config.temperature,
        "Starting estimators."
    );
    reporter.report(Progress::PhaseStart { name: "Analysis" });

    let crooks = if config.methods.contains(&Method::Cgi) {
        reporter.report(Progress::StatusUpdate {
            text: "Crooks Gaussian Intersection".to_string(),
        });
        Some(Crooks::new(
            &forward.values,
            &reverse.values,
            config.nboots,
            config.nblocks,
        )?)
    } else {
        None
    };

    let (ks_forward, ks_reverse) = if config.do_ks_test {
        reporter.report(Progress::StatusUpdate {
            text: "KS normality test".to_string(),
        });
        (
            Some(ks_norm_test(&forward.values)?),
            Some(ks_norm_test(&reverse.values)?),
        )
    } else {
        (None, None)
    };

    let bar = if config.methods.contains(&Method::Bar) {
        reporter.report(Progress::StatusUpdate {
            text: "Bennett Acceptance Ratio".to_string(),
        });
        Some(Bar::new(
            &forward.values,
            &reverse.values,
            config.temperature,
            config.nboots,
            config.nblocks,
        )?)
    } else {
        None
    };

    let jarz = if config.methods.contains(&Method::Jarz) {
        reporter.report(Progress::StatusUpdate {
            text: "Jarzynski estimator".to_string(),
        });
        Some(Jarz::new(
            &forward.values,
            &reverse.values,
            config.temperature,
            config.nboots,
            config.nblocks,
        )?)
    } else {
        None
    };

    reporter.report(Progress::PhaseFinish);

    Ok(Some(AnalysisResults {
        forward,
        reverse,
        crooks,
        bar,
        jarz,
        ks_forward,
        ks_reverse,
        unit: config.unit,
        temperature: config.temperature,
        precision: config.precision,
    }))
}

/// Sorts, selects, and integrates both xvg file lists.
fn integrate_inputs(
    config: &AnalyzeConfig,
    reporter: &ProgressReporter,
) -> Result<(WorkSet, WorkSet), EngineError> {
    let mut rng = thread_rng();

    let mut files_forward = config.files_forward.clone();
    let mut files_reverse = config.files_reverse.clone();
    natural_sort(&mut files_forward);
    natural_sort(&mut files_reverse);

    let files_forward = config.selection.apply(files_forward, &mut rng)?;
    let files_reverse = config.selection.apply(files_reverse, &mut rng)?;
    info!(
        n_forward = files_forward.len(),
        n_reverse = files_reverse.len(),
        "Integrating dgdl files."
    );

    reporter.report(Progress::PhaseStart {
        name: "Integration",
    });
    reporter.report(Progress::TaskStart {
        total_steps: (files_forward.len() + files_reverse.len()) as u64,
    });

    let forward = integrate_set(
        &files_forward,
        LambdaStart::Zero,
        false,
        reporter,
    )?;
    let reverse = integrate_set(
        &files_reverse,
        LambdaStart::One,
        config.reverse_b,
        reporter,
    )?;

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    Ok((forward, reverse))
}

fn integrate_set(
    files: &[String],
    lambda0: LambdaStart,
    invert: bool,
    reporter: &ProgressReporter,
) -> Result<WorkSet, EngineError> {
    #[cfg(feature = "parallel")]
    let iterator = files.par_iter();

    #[cfg(not(feature = "parallel"))]
    let iterator = files.iter();

    let values: Vec<f64> = iterator
        .map(|file| {
            let work = xvg::integrate_work(file.as_ref(), lambda0, invert)?;
            reporter.report(Progress::TaskIncrement);
            Ok(work)
        })
        .collect::<Result<_, EngineError>>()?;

    Ok(WorkSet::new(files.to_vec(), values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_constant_xvg(dir: &Path, name: &str, dhdl: f64) -> String {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        writeln!(f, "# dgdl").unwrap();
        for i in 0..11 {
            writeln!(f, "{} {}", i, dhdl).unwrap();
        }
        path.display().to_string()
    }

    /// Forward files around w + 1, reverse files around w - 1; both legs
    /// carry positive 0 -> 1-frame work and their gaussians intersect at w.
    fn seed_inputs(dir: &Path, n: usize, w: f64) -> (Vec<String>, Vec<String>) {
        let forward: Vec<String> = (0..n)
            .map(|i| {
                write_constant_xvg(dir, &format!("dgdl_f{i}.xvg"), w + 1.0 + (i as f64 - 1.0))
            })
            .collect();
        let reverse: Vec<String> = (0..n)
            .map(|i| {
                write_constant_xvg(dir, &format!("dgdl_r{i}.xvg"), w - 1.0 + (i as f64 - 1.0))
            })
            .collect();
        (forward, reverse)
    }

    fn config(dir: &Path, forward: Vec<String>, reverse: Vec<String>) -> AnalyzeConfig {
        AnalyzeConfig {
            files_forward: forward,
            files_reverse: reverse,
            integ_out: (dir.join("integA.dat"), dir.join("integB.dat")),
            ..AnalyzeConfig::default()
        }
    }

    #[test]
    fn full_run_produces_all_three_estimates_and_ks_results() {
        let dir = tempdir().unwrap();
        let (forward, reverse) = seed_inputs(dir.path(), 3, 10.0);
        let cfg = config(dir.path(), forward, reverse);

        let results = run(&cfg, &ProgressReporter::new()).unwrap().unwrap();
        assert_eq!(results.forward.len(), 3);
        assert_eq!(results.reverse.len(), 3);
        let crooks = results.crooks.unwrap();
        assert!((crooks.dg - 10.0).abs() < 0.5);
        assert!(results.bar.is_some());
        assert!(results.jarz.is_some());
        assert!(results.ks_forward.is_some());
        assert!(results.ks_reverse.is_some());
    }

    #[test]
    fn integ_only_writes_tables_and_returns_nothing() {
        let dir = tempdir().unwrap();
        let (forward, reverse) = seed_inputs(dir.path(), 3, 10.0);
        let mut cfg = config(dir.path(), forward, reverse);
        cfg.integ_only = true;

        let results = run(&cfg, &ProgressReporter::new()).unwrap();
        assert!(results.is_none());
        assert!(cfg.integ_out.0.exists());
        assert!(cfg.integ_out.1.exists());
    }

    #[test]
    fn cached_tables_feed_a_second_run_without_xvg_files() {
        let dir = tempdir().unwrap();
        let (forward, reverse) = seed_inputs(dir.path(), 3, 10.0);
        let mut cfg = config(dir.path(), forward, reverse);
        cfg.integ_only = true;
        run(&cfg, &ProgressReporter::new()).unwrap();

        let mut cached = config(dir.path(), Vec::new(), Vec::new());
        cached.integ_in = Some((cfg.integ_out.0.clone(), cfg.integ_out.1.clone()));
        let results = run(&cached, &ProgressReporter::new()).unwrap().unwrap();
        assert_eq!(results.forward.len(), 3);
        assert!((results.crooks.unwrap().dg - 10.0).abs() < 0.5);
    }

    #[test]
    fn reverse_work_is_reported_in_the_forward_frame() {
        let dir = tempdir().unwrap();
        let (forward, reverse) = seed_inputs(dir.path(), 3, 10.0);
        let mut cfg = config(dir.path(), forward, reverse);
        cfg.methods = vec![Method::Jarz];
        cfg.do_ks_test = false;

        let results = run(&cfg, &ProgressReporter::new()).unwrap().unwrap();
        // Reverse dH/dl around +9 integrates to +9: the descending ramp is
        // not negated, it already reads in the 0 -> 1 frame.
        let mean: f64 =
            results.reverse.values.iter().sum::<f64>() / results.reverse.len() as f64;
        assert!((mean - 9.0).abs() < 1e-9);
        assert!(results.reverse.values.iter().all(|&w| w > 0.0));
    }

    #[test]
    fn crooks_recovers_dg_from_dissipated_work() {
        // Forward works around 12, reverse works around 8; the intersection
        // sits at the true dG of 10, not at the dissipation of 2.
        let dir = tempdir().unwrap();
        let forward: Vec<String> = (0..5)
            .map(|i| {
                write_constant_xvg(dir.path(), &format!("dgdl_f{i}.xvg"), 12.0 + (i as f64 - 2.0))
            })
            .collect();
        let reverse: Vec<String> = (0..5)
            .map(|i| {
                write_constant_xvg(dir.path(), &format!("dgdl_r{i}.xvg"), 8.0 + (i as f64 - 2.0))
            })
            .collect();
        let mut cfg = config(dir.path(), forward, reverse);
        cfg.methods = vec![Method::Cgi];
        cfg.do_ks_test = false;

        let results = run(&cfg, &ProgressReporter::new()).unwrap().unwrap();
        let crooks = results.crooks.unwrap();
        assert!((crooks.dg - 10.0).abs() < 0.5);
        assert!((crooks.dg - 2.0).abs() > 5.0);
    }

    #[test]
    fn method_subset_skips_the_others() {
        let dir = tempdir().unwrap();
        let (forward, reverse) = seed_inputs(dir.path(), 3, 10.0);
        let mut cfg = config(dir.path(), forward, reverse);
        cfg.methods = vec![Method::Bar];
        cfg.do_ks_test = false;

        let results = run(&cfg, &ProgressReporter::new()).unwrap().unwrap();
        assert!(results.crooks.is_none());
        assert!(results.bar.is_some());
        assert!(results.jarz.is_none());
        assert!(results.ks_forward.is_none());
    }

    #[test]
    fn skip_selection_thins_both_file_lists() {
        let dir = tempdir().unwrap();
        let (forward, reverse) = seed_inputs(dir.path(), 5, 10.0);
        let mut cfg = config(dir.path(), forward, reverse);
        cfg.selection = Selection::Skip(2);
        cfg.methods = vec![Method::Jarz];
        cfg.do_ks_test = false;

        let results = run(&cfg, &ProgressReporter::new()).unwrap().unwrap();
        assert_eq!(results.forward.len(), 3);
        assert_eq!(results.reverse.len(), 3);
        // The last file always survives skip selection.
        assert!(results.forward.files.iter().any(|f| f.contains("dgdl_f4")));
    }
}
