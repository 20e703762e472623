//! Error types shared by every data-access path.

use thiserror::Error;

use crate::records::Collection;

/// Bad input detected locally, before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("nothing to update")]
    EmptyPatch,
    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }
}

/// Failure of a read or write against the record backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// A single-row read matched nothing.
    #[error("no matching record in {collection}")]
    NotFound { collection: Collection },
    /// A single-row read matched more than one record.
    #[error("more than one matching record in {collection}")]
    MultipleRows { collection: Collection },
    /// The backend could not be reached.
    #[error("could not reach the server: {0}")]
    Transport(String),
    /// The backend answered with an error.
    #[error("the server rejected the request ({code}): {message}")]
    Rejected { code: String, message: String },
    /// A record came back in a shape we could not read.
    #[error("unexpected record format: {0}")]
    Decode(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl DataError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for DataError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
