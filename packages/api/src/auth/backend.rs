//! The authentication collaborator the session store talks to.

use crate::error::AuthError;
use crate::models::AuthUser;

use super::session::Session;

/// Async interface to whatever issues and revokes sessions.
pub trait AuthBackend {
    /// Register an account. Does not sign it in.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<AuthUser, AuthError>>;
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<Session, AuthError>>;
    fn sign_out(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<(), AuthError>>;
    /// The session the backend still considers valid, if any. Used at startup.
    fn current_session(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<Session>, AuthError>>;
}
