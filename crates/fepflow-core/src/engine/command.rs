use crate::engine::config::StudySettings;
use crate::engine::job::SimJob;
use std::path::PathBuf;
use std::process::Command;

/// A fully resolved GROMACS child-process invocation: program, argument
/// list, and working directory. Kept as plain data so the argument list can
/// be inspected, logged, and rendered into batch scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmxInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: PathBuf,
}

impl GmxInvocation {
    /// Builds the runnable command, exporting GMXLIB so GROMACS finds the
    /// study's force-field data. The variable is scoped to the child, never
    /// set on the parent process.
    pub fn to_command(&self, settings: &StudySettings) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.workdir)
            .env("GMXLIB", &settings.gmxlib);
        cmd
    }

    /// The invocation as a shell line for batch scripts and logs.
    pub fn render(&self) -> String {
        let mut parts = vec![shell_quote(&self.program)];
        parts.extend(self.args.iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }
}

fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,".contains(c))
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// The preprocessing step: compiles mdp + structure + topology into the
/// stage's run input file.
pub fn grompp(job: &SimJob, settings: &StudySettings) -> GmxInvocation {
    let args = vec![
        "-f".to_string(),
        job.mdp(settings).display().to_string(),
        "-c".to_string(),
        job.structure().display().to_string(),
        "-r".to_string(),
        job.posre_reference(settings).display().to_string(),
        "-p".to_string(),
        job.topology().display().to_string(),
        "-o".to_string(),
        "topol.tpr".to_string(),
        "-maxwarn".to_string(),
        "3".to_string(),
    ];
    GmxInvocation {
        program: "grompp".to_string(),
        args,
        workdir: job.sim_dir(),
    }
}

/// The simulation step. Extra user options from `mdrun_opts` are appended
/// verbatim, whitespace separated.
pub fn mdrun(job: &SimJob, settings: &StudySettings) -> GmxInvocation {
    let mut args = vec!["-s".to_string(), "topol.tpr".to_string()];
    args.extend(settings.mdrun_opts.split_whitespace().map(str::to_string));
    GmxInvocation {
        program: settings.mdrun_binary().to_string(),
        args,
        workdir: job.sim_dir(),
    }
}

/// The grompp + mdrun pair for one job, in execution order.
pub fn stage_invocations(job: &SimJob, settings: &StudySettings) -> Vec<GmxInvocation> {
    vec![grompp(job, settings), mdrun(job, settings)]
}
