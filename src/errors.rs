//! Typed error hierarchy for the testpilot session engine.
//!
//! Each enum matches one boundary where a failure is detected:
//! - `ConnectionError`: event-stream open/transport/close failures
//! - `ProtocolError`: inbound payloads the router cannot interpret
//! - `PreconditionError`: refine commands issued without their artifact
//! - `FetchError`: verification report / health retrieval
//! - `ConfigError`: loading `.testpilot/testpilot.toml`
//!
//! None of these is fatal. Every one of them ends up as exactly one
//! user-visible log entry via [`SessionError::log_text`].

use thiserror::Error;

/// Errors from the single event-stream connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {endpoint}: {message}")]
    ConnectFailed { endpoint: String, message: String },

    #[error("Connection closed unexpectedly")]
    ClosedUnexpectedly,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Errors from interpreting an inbound event.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown phase '{0}'")]
    UnknownPhase(String),

    #[error("Event '{tag}' is missing its phase")]
    MissingPhase { tag: String },

    #[error("Invalid {phase} data: {message}")]
    InvalidData { phase: String, message: String },
}

/// A command was rejected locally because a prerequisite artifact is absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("No test cases to refine. Run the design phase first.")]
    NoTestCases,

    #[error("No generated code to refine. Run the generation phase first.")]
    NoGeneratedCode,
}

/// Errors from the request/response report and health endpoints.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch report: HTTP {0}")]
    Status(u16),

    #[error("Failed to fetch report: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status(status.as_u16()),
            None => FetchError::Transport(err.to_string()),
        }
    }
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Umbrella over every error kind that can surface in the session log.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The worker reported zero tokens for an otherwise valid event.
    #[error("No tokens available")]
    Quota,
}

impl SessionError {
    /// The single line shown to the user for this error.
    pub fn log_text(&self) -> String {
        match self {
            SessionError::Quota => "No tokens available - check the agent's LLM quota".to_string(),
            other => other.to_string(),
        }
    }
}
