use crate::engine::command::stage_invocations;
use crate::engine::config::StudySettings;
use crate::engine::error::EngineError;
use crate::engine::job::SimJob;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::scheduler::JobRunner;
use crate::engine::stage::Stage;
use std::fs;
use tracing::{info, instrument};

/// What the pipeline did for each cell of the study matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquilSummary {
    pub completed: Vec<String>,
    pub skipped: Vec<String>,
}

/// Runs the equilibration chain for every protein, repeat, and morph state
/// of the study. Jobs whose `confout.gro` already exists are skipped, so a
/// crashed or interrupted study resumes where it stopped.
#[instrument(skip_all, name = "equilibration_workflow")]
pub fn run(
    settings: &StudySettings,
    proteins: &[String],
    runner: &dyn JobRunner,
    reporter: &ProgressReporter,
) -> Result<EquilSummary, EngineError> {
    // === Phase 0: Lay out the repeat/stage directory tree ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let jobs = expand_jobs(settings, proteins);
    info!(
        num_jobs = jobs.len(),
        proteins = proteins.len(),
        "Preparing study folders."
    );
    for job in &jobs {
        let dir = job.sim_dir();
        fs::create_dir_all(&dir).map_err(|e| EngineError::io(&dir, e))?;
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Run the chain, stage by stage ===
    reporter.report(Progress::PhaseStart {
        name: "Equilibration",
    });
    reporter.report(Progress::TaskStart {
        total_steps: jobs.len() as u64,
    });

    let mut summary = EquilSummary::default();
    for job in &jobs {
        let name = job.job_name();
        if job.is_complete() {
            info!(job = %name, "Output already present; skipping.");
            summary.skipped.push(name);
            reporter.report(Progress::TaskIncrement);
            continue;
        }

        reporter.report(Progress::StatusUpdate {
            text: format!("{} ({}/{})", name, summary.completed.len() + summary.skipped.len() + 1, jobs.len()),
        });
        check_inputs(job, settings)?;

        runner.run(job, &stage_invocations(job, settings), settings)?;

        if !job.is_complete() {
            return Err(EngineError::IncompleteJob {
                job: name,
                expected: job.confout(),
            });
        }
        info!(job = %job.job_name(), "Stage finished.");
        summary.completed.push(job.job_name());
        reporter.report(Progress::TaskIncrement);
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    info!(
        completed = summary.completed.len(),
        skipped = summary.skipped.len(),
        "Equilibration workflow complete."
    );
    Ok(summary)
}

/// Expands the study matrix in dependency order: stages innermost, so every
/// prerequisite precedes its dependent in the list.
fn expand_jobs(settings: &StudySettings, proteins: &[String]) -> Vec<SimJob> {
    let mut jobs = Vec::new();
    for protein in proteins {
        let folder = settings.base_path.join(protein);
        for repeat in 1..=settings.n_repeats {
            for state in &settings.states {
                for stage in Stage::ALL {
                    jobs.push(SimJob::new(
                        protein.clone(),
                        repeat,
                        state.clone(),
                        stage,
                        folder.clone(),
                    ));
                }
            }
        }
    }
    jobs
}

fn check_inputs(job: &SimJob, settings: &StudySettings) -> Result<(), EngineError> {
    for path in [job.topology(), job.structure(), job.mdp(settings)] {
        if !path.exists() {
            return Err(EngineError::MissingInput {
                path,
                job: job.job_name(),
            });
        }
    }
    Ok(())
}
