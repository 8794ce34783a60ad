//! Error types for the benchmark engine.
//!
//! Only [`BenchError`] is ever returned to the caller as a hard failure.
//! [`RequestError`] values are data: they are stored in the record of the work
//! item that produced them and counted by the aggregator.

use thiserror::Error;

/// Errors that prevent a session from being built or started.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Invalid benchmark configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The target URI could not be parsed.
    #[error("invalid target uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// A request-issuing client could not be created.
    #[error("failed to create client for worker {worker}: {reason}")]
    ClientBuild { worker: usize, reason: String },

    /// `run` was called on a session that has already been started.
    #[error("benchmark session already started")]
    AlreadyStarted,

    /// A worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    WorkerFailed(String),
}

impl BenchError {
    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a ClientBuild error.
    pub fn client_build(worker: usize, reason: impl Into<String>) -> Self {
        Self::ClientBuild {
            worker,
            reason: reason.into(),
        }
    }
}

/// A failure of a single work item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request or the body read exceeded its deadline.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The server answered with a non-success status code.
    #[error("HTTP status {0}")]
    Status(u16),

    /// Reading the response body failed midway.
    #[error("response body error: {0}")]
    Body(String),

    /// Any other transport failure.
    #[error("request failed: {0}")]
    Transport(String),
}

impl RequestError {
    /// Short, stable label used to group errors in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Timeout(_) => "timeout",
            Self::Status(_) => "status",
            Self::Body(_) => "body",
            Self::Transport(_) => "transport",
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Releasing a client failed. Always swallowed after logging.
#[derive(Error, Debug)]
#[error("failed to release client: {0}")]
pub struct ReleaseError(pub String);

/// Result type for benchmark engine operations.
pub type Result<T> = std::result::Result<T, BenchError>;
