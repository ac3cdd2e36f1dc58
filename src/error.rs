use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    TranscodeFailure,
    RemoteAssetFailure,
    RemoteAssetTimeout,
    RemoteServiceError,
    MalformedResponse,
    UnexpectedFailure,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transcoder failed to {action} {path}: {reason}")]
    Transcode {
        action: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("Remote asset {name} reached FAILED state")]
    RemoteAssetFailed { name: String },

    #[error("Remote asset {name} still not ready after {waited:?}")]
    RemoteAssetTimeout { name: String, waited: Duration },

    #[error("Remote service error: {0}")]
    RemoteService(String),

    #[error("Malformed {what} response: {reason}")]
    MalformedResponse { what: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Configuration(_) => ErrorKind::Configuration,
            PipelineError::Transcode { .. } => ErrorKind::TranscodeFailure,
            PipelineError::RemoteAssetFailed { .. } => ErrorKind::RemoteAssetFailure,
            PipelineError::RemoteAssetTimeout { .. } => ErrorKind::RemoteAssetTimeout,
            PipelineError::RemoteService(_) => ErrorKind::RemoteServiceError,
            PipelineError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            PipelineError::Io(_) | PipelineError::Unexpected(_) => ErrorKind::UnexpectedFailure,
        }
    }

    pub fn malformed(what: &'static str, reason: impl Display) -> Self {
        PipelineError::MalformedResponse {
            what,
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(error: reqwest::Error) -> Self {
        PipelineError::RemoteService(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
