use crate::engine::command::GmxInvocation;
use crate::engine::config::StudySettings;
use crate::engine::error::EngineError;
use crate::engine::job::SimJob;
use std::fs;
use std::process::Command;
use tracing::{debug, info};

/// Executes the grompp/mdrun pair of one simulation job. The equilibration
/// workflow only depends on this seam, so batch submission and local
/// execution stay interchangeable.
pub trait JobRunner {
    fn run(
        &self,
        job: &SimJob,
        invocations: &[GmxInvocation],
        settings: &StudySettings,
    ) -> Result<(), EngineError>;
}

/// Runs every invocation directly as a child process, in order.
#[derive(Debug, Default)]
pub struct LocalRunner;

impl JobRunner for LocalRunner {
    fn run(
        &self,
        job: &SimJob,
        invocations: &[GmxInvocation],
        settings: &StudySettings,
    ) -> Result<(), EngineError> {
        for invocation in invocations {
            debug!(job = %job.job_name(), command = %invocation.render(), "Spawning.");
            let output = invocation
                .to_command(settings)
                .output()
                .map_err(|source| EngineError::ProcessFailed {
                    program: invocation.program.clone(),
                    status: "failed to start".to_string(),
                    stderr: source.to_string(),
                })?;

            if !output.status.success() {
                return Err(EngineError::ProcessFailed {
                    program: invocation.program.clone(),
                    status: output
                        .status
                        .code()
                        .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }
        }
        Ok(())
    }
}

/// Submits each job to the SGE batch queue as a rendered qsub script and
/// waits for it, so stage ordering is preserved across submissions.
#[derive(Debug)]
pub struct SgeScheduler {
    submit_program: String,
}

impl Default for SgeScheduler {
    fn default() -> Self {
        Self::with_submit_program("qsub")
    }
}

impl SgeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the submit command, e.g. for site-local qsub wrappers.
    pub fn with_submit_program(program: impl Into<String>) -> Self {
        Self {
            submit_program: program.into(),
        }
    }
    /// Renders the batch script: SGE directives, the GMXLIB export, and the
    /// shell lines of the invocations.
    pub fn render_script(
        job: &SimJob,
        invocations: &[GmxInvocation],
        settings: &StudySettings,
    ) -> String {
        let mut script = String::new();
        script.push_str("#!/bin/bash\n");
        script.push_str(&format!("#$ -N {}\n", job.job_name()));
        script.push_str(&format!(
            "#$ -pe {} {}\n",
            settings.parallel_env,
            job.cores()
        ));
        script.push_str("#$ -cwd\n");
        script.push_str("#$ -j y\n");
        script.push_str("set -e\n");
        script.push_str(&format!(
            "export GMXLIB={}\n",
            settings.gmxlib.display()
        ));
        for invocation in invocations {
            script.push_str(&invocation.render());
            script.push('\n');
        }
        script
    }
}

impl JobRunner for SgeScheduler {
    fn run(
        &self,
        job: &SimJob,
        invocations: &[GmxInvocation],
        settings: &StudySettings,
    ) -> Result<(), EngineError> {
        let script = Self::render_script(job, invocations, settings);
        let script_path = job.sim_dir().join("job.sh");
        fs::write(&script_path, script).map_err(|e| EngineError::io(&script_path, e))?;

        info!(job = %job.job_name(), script = %script_path.display(), "Submitting to SGE.");
        let output = Command::new(&self.submit_program)
            .arg("-sync")
            .arg("y")
            .arg(&script_path)
            .current_dir(job.sim_dir())
            .output()
            .map_err(|source| EngineError::SchedulerUnavailable {
                program: self.submit_program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(EngineError::ProcessFailed {
                program: self.submit_program.clone(),
                status: output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::command::stage_invocations;
    use crate::engine::stage::Stage;
    use std::path::PathBuf;

    fn settings() -> StudySettings {
        StudySettings::builder()
            .base_path(PathBuf::from("/study"))
            .top_path(PathBuf::from("."))
            .mdp_path(PathBuf::from("/study/mdp"))
            .gmxlib(PathBuf::from("/data/mutff"))
            .mdrun("mdrun".to_string())
            .mdrun_double("mdrun".to_string())
            .mdrun_opts("-ntmpi 1".to_string())
            .parallel_env("openmp_fast".to_string())
            .n_repeats(1)
            .states(vec!["A".to_string()])
            .build()
            .unwrap()
    }

    #[test]
    fn script_carries_the_sge_directives_and_job_name() {
        let s = settings();
        let job = SimJob::new("p1", 1, "A", Stage::NvtPosre, PathBuf::from("/study/p1"));
        let script = SgeScheduler::render_script(&job, &stage_invocations(&job, &s), &s);

        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("#$ -N fepflow_nvt_posre_pp1_1_A\n"));
        assert!(script.contains("#$ -pe openmp_fast 4\n"));
        assert!(script.contains("#$ -cwd\n"));
        assert!(script.contains("export GMXLIB=/data/mutff\n"));
    }

    #[test]
    fn script_lists_grompp_before_mdrun() {
        let s = settings();
        let job = SimJob::new("p1", 1, "A", Stage::Em, PathBuf::from("/study/p1"));
        let script = SgeScheduler::render_script(&job, &stage_invocations(&job, &s), &s);

        let grompp_at = script.find("grompp").unwrap();
        let mdrun_at = script.find("\nmdrun").unwrap();
        assert!(grompp_at < mdrun_at);
    }

    #[test]
    fn minimization_requests_two_slots() {
        let s = settings();
        let job = SimJob::new("p1", 1, "A", Stage::Em, PathBuf::from("/study/p1"));
        let script = SgeScheduler::render_script(&job, &stage_invocations(&job, &s), &s);
        assert!(script.contains("#$ -pe openmp_fast 2\n"));
    }

    #[test]
    fn local_runner_propagates_a_failing_command() {
        let s = settings();
        let dir = tempfile::tempdir().unwrap();
        let job = SimJob::new("p1", 1, "A", Stage::Em, dir.path().to_path_buf());
        std::fs::create_dir_all(job.sim_dir()).unwrap();

        let invocation = GmxInvocation {
            program: "false".to_string(),
            args: Vec::new(),
            workdir: job.sim_dir(),
        };
        let result = LocalRunner.run(&job, &[invocation], &s);
        assert!(matches!(result, Err(EngineError::ProcessFailed { .. })));
    }

    #[test]
    fn missing_submit_program_is_a_reported_error() {
        let s = settings();
        let dir = tempfile::tempdir().unwrap();
        let job = SimJob::new("p1", 1, "A", Stage::Em, dir.path().to_path_buf());
        std::fs::create_dir_all(job.sim_dir()).unwrap();

        let scheduler = SgeScheduler::with_submit_program("/nonexistent/qsub");
        let result = scheduler.run(&job, &stage_invocations(&job, &s), &s);
        match result {
            Err(EngineError::SchedulerUnavailable { program, .. }) => {
                assert_eq!(program, "/nonexistent/qsub");
            }
            other => panic!("expected SchedulerUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn local_runner_succeeds_on_a_trivial_command() {
        let s = settings();
        let dir = tempfile::tempdir().unwrap();
        let job = SimJob::new("p1", 1, "A", Stage::Em, dir.path().to_path_buf());
        std::fs::create_dir_all(job.sim_dir()).unwrap();

        let invocation = GmxInvocation {
            program: "true".to_string(),
            args: Vec::new(),
            workdir: job.sim_dir(),
        };
        assert!(LocalRunner.run(&job, &[invocation], &s).is_ok());
    }
}
