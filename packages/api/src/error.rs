//! Authentication errors.

use store::ValidationError;
use thiserror::Error;

/// Credential or session failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    /// The backend refused the request, e.g. duplicate email or weak password.
    #[error("the server rejected the request: {0}")]
    Rejected(String),
    #[error("could not reach the server: {0}")]
    Network(String),
    #[error("not signed in")]
    NotSignedIn,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Either kind of remote failure, for operations that need a signed-in user and
/// then touch the record store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Data(#[from] store::DataError),
}
