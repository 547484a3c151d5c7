use pickem_common::GameError;
use thiserror::Error;

/// Failure taxonomy shared by the storage layer and everything above it.
#[derive(Debug, Error)]
pub enum Error {
    /// Point lookup or alternate-key resolution found nothing
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate pick or duplicate alternate key
    #[error("{0} already exists")]
    Conflict(String),

    /// Malformed or missing input, caught before any storage call
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A stored item did not decode into the expected shape
    #[error("corrupt item {key}: {reason}")]
    CorruptData { key: String, reason: String },

    /// Transport or backend failure from the store
    #[error("storage backend error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        Error::Conflict(what.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        Error::CorruptData {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Only backend failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Backend(_))
    }
}

impl From<GameError> for Error {
    fn from(err: GameError) -> Self {
        Error::validation(err.field(), err.to_string())
    }
}
