use crate::cli::EquilArgs;
use crate::error::{CliError, Result};
use fepflow::engine::config::{SchedulerKind, StudySettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Study-level settings loaded from a TOML file. Every field is optional;
/// CLI arguments win over file values, and both fall back to the defaults
/// documented in the CLI help.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialStudyConfig {
    base_path: Option<PathBuf>,
    top_path: Option<PathBuf>,
    mdp_path: Option<PathBuf>,
    gmxlib: Option<PathBuf>,
    mdrun: Option<String>,
    mdrun_double: Option<String>,
    mdrun_opts: Option<String>,
    /// "local" or "sge".
    scheduler: Option<String>,
    parallel_env: Option<String>,
    repeats: Option<usize>,
    states: Option<Vec<String>>,
    double: Option<bool>,
    restrain_to_em: Option<bool>,
    posre_ref: Option<PathBuf>,
}

impl PartialStudyConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading study configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(self, args: &EquilArgs) -> Result<StudySettings> {
        let scheduler = if args.rem_sched {
            SchedulerKind::Sge
        } else {
            match self.scheduler.as_deref() {
                None | Some("local") => SchedulerKind::Local,
                Some("sge") => SchedulerKind::Sge,
                Some(other) => {
                    return Err(CliError::Config(format!(
                        "Unknown scheduler '{}'; expected 'local' or 'sge'.",
                        other
                    )));
                }
            }
        };

        StudySettings::builder()
            .base_path(
                args.base_path
                    .clone()
                    .or(self.base_path)
                    .unwrap_or_else(|| PathBuf::from(".")),
            )
            .top_path(
                args.top_path
                    .clone()
                    .or(self.top_path)
                    .unwrap_or_else(|| PathBuf::from(".")),
            )
            .mdp_path(
                args.mdp_path
                    .clone()
                    .or(self.mdp_path)
                    .unwrap_or_else(|| PathBuf::from("./mdp")),
            )
            .gmxlib(
                args.gmxlib
                    .clone()
                    .or(self.gmxlib)
                    .unwrap_or_else(|| PathBuf::from("../../../data/mutff")),
            )
            .mdrun(
                args.mdrun
                    .clone()
                    .or(self.mdrun)
                    .unwrap_or_else(|| "mdrun".to_string()),
            )
            .mdrun_double(
                args.mdrun_double
                    .clone()
                    .or(self.mdrun_double)
                    .unwrap_or_else(|| "mdrun".to_string()),
            )
            .mdrun_opts(
                args.mdrun_opts
                    .clone()
                    .or(self.mdrun_opts)
                    .unwrap_or_else(|| " -ntmpi 1 -notunepme ".to_string()),
            )
            .scheduler(scheduler)
            .parallel_env(
                args.parallel_env
                    .clone()
                    .or(self.parallel_env)
                    .unwrap_or_else(|| "openmp_fast".to_string()),
            )
            .n_repeats(args.repeats.or(self.repeats).unwrap_or(3))
            .states(
                args.states
                    .clone()
                    .or(self.states)
                    .unwrap_or_else(|| vec!["A".to_string(), "B".to_string()]),
            )
            .use_double_precision(args.double || self.double.unwrap_or(false))
            .restrain_to_em(args.restrain_to_em || self.restrain_to_em.unwrap_or(false))
            .posre_ref_override(args.posre_ref.clone().or(self.posre_ref))
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    fn equil_args(args: &[&str]) -> EquilArgs {
        let mut full = vec!["fepflow", "equil"];
        full.extend_from_slice(args);
        let cli = Cli::parse_from(full);
        match cli.command {
            Commands::Equil(args) => args,
            _ => panic!("expected equil subcommand"),
        }
    }

    #[test]
    fn defaults_reproduce_the_documented_launcher_invocation() {
        let settings = PartialStudyConfig::default()
            .merge_with_cli(&equil_args(&["prot1"]))
            .unwrap();

        assert_eq!(settings.gmxlib, PathBuf::from("../../../data/mutff"));
        assert_eq!(settings.mdrun, "mdrun");
        assert_eq!(settings.mdrun_double, "mdrun");
        assert_eq!(settings.mdrun_opts, " -ntmpi 1 -notunepme ");
        assert_eq!(settings.top_path, PathBuf::from("."));
        assert_eq!(settings.mdp_path, PathBuf::from("./mdp"));
        assert_eq!(settings.scheduler, SchedulerKind::Local);
        assert_eq!(settings.n_repeats, 3);
        assert_eq!(settings.states, vec!["A", "B"]);
    }

    #[test]
    fn file_values_fill_in_unset_cli_options() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("study.toml");
        fs::write(
            &path,
            r#"
            mdrun = "gmx mdrun"
            repeats = 5
            states = ["A"]
            scheduler = "sge"
            parallel-env = "smp"
            "#,
        )
        .unwrap();

        let settings = PartialStudyConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&equil_args(&["prot1"]))
            .unwrap();

        assert_eq!(settings.mdrun, "gmx mdrun");
        assert_eq!(settings.n_repeats, 5);
        assert_eq!(settings.states, vec!["A"]);
        assert_eq!(settings.scheduler, SchedulerKind::Sge);
        assert_eq!(settings.parallel_env, "smp");
    }

    #[test]
    fn cli_arguments_override_file_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("study.toml");
        fs::write(&path, "mdrun = \"mdrun_file\"\nrepeats = 5\n").unwrap();

        let settings = PartialStudyConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&equil_args(&["prot1", "--mdrun", "mdrun_cli", "-n", "2"]))
            .unwrap();

        assert_eq!(settings.mdrun, "mdrun_cli");
        assert_eq!(settings.n_repeats, 2);
    }

    #[test]
    fn rem_sched_flag_forces_the_batch_scheduler() {
        let settings = PartialStudyConfig::default()
            .merge_with_cli(&equil_args(&["prot1", "--rem-sched"]))
            .unwrap();
        assert_eq!(settings.scheduler, SchedulerKind::Sge);
    }

    #[test]
    fn unknown_scheduler_name_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("study.toml");
        fs::write(&path, "scheduler = \"slurm\"\n").unwrap();

        let result = PartialStudyConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&equil_args(&["prot1"]));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("study.toml");
        fs::write(&path, "no-such-key = 1\n").unwrap();

        let result = PartialStudyConfig::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn zero_repeats_from_the_cli_are_rejected() {
        let result = PartialStudyConfig::default()
            .merge_with_cli(&equil_args(&["prot1", "-n", "0"]));
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
