use thiserror::Error;

use crate::core::io::integ::IntegError;
use crate::core::io::xvg::XvgError;
use crate::core::work::SelectionError;
use crate::engine::config::ConfigError;
use crate::estimators::EstimatorError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O failure at '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Required input '{path}' for job '{job}' does not exist", path = path.display())]
    MissingInput { path: PathBuf, job: String },

    #[error("Job '{job}' finished without producing '{expected}'", expected = expected.display())]
    IncompleteJob { job: String, expected: PathBuf },

    #[error("'{program}' exited with {status}: {stderr}")]
    ProcessFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Batch scheduler command '{program}' could not be started: {source}")]
    SchedulerUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Xvg(#[from] XvgError),

    #[error(transparent)]
    Integ(#[from] IntegError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Estimator(#[from] EstimatorError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
