use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// How simulation jobs are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerKind {
    /// Run grompp/mdrun directly as child processes.
    #[default]
    Local,
    /// Submit each job to the SGE batch queue and wait for it.
    Sge,
}

/// Settings shared by every job of a study: binary names, path layout, and
/// the repeat/state matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct StudySettings {
    pub base_path: PathBuf,
    pub top_path: PathBuf,
    pub mdp_path: PathBuf,
    /// Force-field data directory exported as GMXLIB to every child process.
    pub gmxlib: PathBuf,
    pub mdrun: String,
    pub mdrun_double: String,
    /// Extra mdrun arguments, whitespace separated.
    pub mdrun_opts: String,
    pub scheduler: SchedulerKind,
    /// SGE parallel environment requested for batch jobs.
    pub parallel_env: String,
    pub n_repeats: usize,
    /// Morph state suffixes, one equilibration chain per state.
    pub states: Vec<String>,
    pub use_double_precision: bool,
    /// Restrain later stages to the minimized structure instead of the
    /// initial ion-solvated one.
    pub restrain_to_em: bool,
    pub posre_ref_override: Option<PathBuf>,
}

impl StudySettings {
    pub fn builder() -> StudySettingsBuilder {
        StudySettingsBuilder::default()
    }

    /// The mdrun binary the current precision setting selects.
    pub fn mdrun_binary(&self) -> &str {
        if self.use_double_precision {
            &self.mdrun_double
        } else {
            &self.mdrun
        }
    }
}

#[derive(Default)]
pub struct StudySettingsBuilder {
    base_path: Option<PathBuf>,
    top_path: Option<PathBuf>,
    mdp_path: Option<PathBuf>,
    gmxlib: Option<PathBuf>,
    mdrun: Option<String>,
    mdrun_double: Option<String>,
    mdrun_opts: Option<String>,
    scheduler: SchedulerKind,
    parallel_env: Option<String>,
    n_repeats: Option<usize>,
    states: Option<Vec<String>>,
    use_double_precision: bool,
    restrain_to_em: bool,
    posre_ref_override: Option<PathBuf>,
}

impl StudySettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_path(mut self, path: PathBuf) -> Self {
        self.base_path = Some(path);
        self
    }
    pub fn top_path(mut self, path: PathBuf) -> Self {
        self.top_path = Some(path);
        self
    }
    pub fn mdp_path(mut self, path: PathBuf) -> Self {
        self.mdp_path = Some(path);
        self
    }
    pub fn gmxlib(mut self, path: PathBuf) -> Self {
        self.gmxlib = Some(path);
        self
    }
    pub fn mdrun(mut self, binary: String) -> Self {
        self.mdrun = Some(binary);
        self
    }
    pub fn mdrun_double(mut self, binary: String) -> Self {
        self.mdrun_double = Some(binary);
        self
    }
    pub fn mdrun_opts(mut self, opts: String) -> Self {
        self.mdrun_opts = Some(opts);
        self
    }
    pub fn scheduler(mut self, kind: SchedulerKind) -> Self {
        self.scheduler = kind;
        self
    }
    pub fn parallel_env(mut self, pe: String) -> Self {
        self.parallel_env = Some(pe);
        self
    }
    pub fn n_repeats(mut self, n: usize) -> Self {
        self.n_repeats = Some(n);
        self
    }
    pub fn states(mut self, states: Vec<String>) -> Self {
        self.states = Some(states);
        self
    }
    pub fn use_double_precision(mut self, enabled: bool) -> Self {
        self.use_double_precision = enabled;
        self
    }
    pub fn restrain_to_em(mut self, enabled: bool) -> Self {
        self.restrain_to_em = enabled;
        self
    }
    pub fn posre_ref_override(mut self, path: Option<PathBuf>) -> Self {
        self.posre_ref_override = path;
        self
    }

    pub fn build(self) -> Result<StudySettings, ConfigError> {
        let n_repeats = self
            .n_repeats
            .ok_or(ConfigError::MissingParameter("n_repeats"))?;
        if n_repeats == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "n_repeats",
                reason: "a study needs at least one repeat".to_string(),
            });
        }
        let states = self.states.ok_or(ConfigError::MissingParameter("states"))?;
        if states.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "states",
                reason: "a study needs at least one morph state".to_string(),
            });
        }

        Ok(StudySettings {
            base_path: self
                .base_path
                .ok_or(ConfigError::MissingParameter("base_path"))?,
            top_path: self
                .top_path
                .ok_or(ConfigError::MissingParameter("top_path"))?,
            mdp_path: self
                .mdp_path
                .ok_or(ConfigError::MissingParameter("mdp_path"))?,
            gmxlib: self.gmxlib.ok_or(ConfigError::MissingParameter("gmxlib"))?,
            mdrun: self.mdrun.ok_or(ConfigError::MissingParameter("mdrun"))?,
            mdrun_double: self
                .mdrun_double
                .ok_or(ConfigError::MissingParameter("mdrun_double"))?,
            mdrun_opts: self
                .mdrun_opts
                .ok_or(ConfigError::MissingParameter("mdrun_opts"))?,
            scheduler: self.scheduler,
            parallel_env: self
                .parallel_env
                .ok_or(ConfigError::MissingParameter("parallel_env"))?,
            n_repeats,
            states,
            use_double_precision: self.use_double_precision,
            restrain_to_em: self.restrain_to_em,
            posre_ref_override: self.posre_ref_override,
        })
    }
}
