//! Error taxonomy for the coordination core.
//!
//! - `ValidationError`: user input rejected by the request validator.
//! - `CadenceError`: everything the lifecycle managers can return.
//! - `ErrorKind`: 運用分類 (retry するかどうかの判断材料)
//!
//! "Not found" is never an error here: fetch/get operations return `Option`
//! and removals return `RemovalOutcome::AlreadyAbsent`.

use thiserror::Error;

use crate::domain::ids::IdParseError;
use crate::ports::StoreError;

/// A user-submitted request definition was rejected.
///
/// The message is user-facing and is surfaced verbatim at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Operational classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Try again later (store outage, timeout, concurrent cleanup).
    Transient,
    /// Retrying the same input gives the same answer.
    Permanent,
    /// The store answered in a way the protocol does not expect.
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum CadenceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("coordination store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    MalformedIdentifier(#[from] IdParseError),

    #[error("failed to serialize or deserialize {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected coordination store response: {0}")]
    UnexpectedStore(StoreError),
}

impl CadenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CadenceError::Conflict(_) | CadenceError::StoreUnavailable(_) => ErrorKind::Transient,
            CadenceError::Validation(_)
            | CadenceError::MalformedIdentifier(_)
            | CadenceError::Serialization { .. } => ErrorKind::Permanent,
            CadenceError::UnexpectedStore(_) => ErrorKind::Infrastructure,
        }
    }

    /// Whether an orchestration loop may retry the same operation.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<StoreError> for CadenceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => CadenceError::StoreUnavailable(reason),
            other => CadenceError::UnexpectedStore(other),
        }
    }
}

pub type Result<T, E = CadenceError> = std::result::Result<T, E>;
