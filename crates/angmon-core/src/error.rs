//! Unified error type for the angle monitoring workspace.
//!
//! Every crate in the workspace returns [`AngmonResult`]. Divergence of a load
//! flow is *not* an error: it is an outcome the monitoring engine records as a
//! scenario status. Errors are reserved for things that stop a scenario from
//! being evaluated at all (bad configuration, an unknown element, a contract
//! violation on a result query).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AngmonError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid or missing configuration, such as a country without shift keys.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Element lookups and topology inconsistencies.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Contingency error: {0}")]
    Contingency(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Solver error: {0}")]
    Solver(String),

    /// A result was queried at an instant where it is not defined.
    #[error("Invalid instant: {0}")]
    InvalidInstant(String),

    #[error("Unhandled unit {unit} for {subject}")]
    UnhandledUnit { unit: String, subject: String },

    #[error("{0}")]
    MissingResult(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("{0}")]
    Other(String),
}

pub type AngmonResult<T> = Result<T, AngmonError>;

impl From<anyhow::Error> for AngmonError {
    fn from(err: anyhow::Error) -> Self {
        AngmonError::Other(err.to_string())
    }
}

impl From<serde_json::Error> for AngmonError {
    fn from(err: serde_json::Error) -> Self {
        AngmonError::Parse(err.to_string())
    }
}

impl AngmonError {
    /// True for errors caused by the caller's inputs rather than by the run itself.
    pub fn is_configuration(&self) -> bool {
        matches!(self, AngmonError::Config(_) | AngmonError::Parse(_))
    }
}
