use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AuthError;
use crate::models::AuthUser;

use super::backend::AuthBackend;
use super::session::Session;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Default)]
struct Accounts {
    by_email: HashMap<String, (AuthUser, String)>,
    active: Option<Session>,
    offline: bool,
}

/// In-memory AuthBackend for testing and offline demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryAuth {
    inner: Arc<Mutex<Accounts>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account up front.
    pub fn with_account(self, email: &str, password: &str) -> Self {
        let user = AuthUser::new(uuid::Uuid::new_v4().to_string(), email);
        self.inner
            .lock()
            .unwrap()
            .by_email
            .insert(email.to_string(), (user, password.to_string()));
        self
    }

    /// Simulate losing (or regaining) the network.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }

    /// Drop the backend's notion of the active session, as an expiry would.
    pub fn expire_session(&self) {
        self.inner.lock().unwrap().active = None;
    }

    fn online(accounts: &Accounts) -> Result<(), AuthError> {
        if accounts.offline {
            return Err(AuthError::Network("offline".to_string()));
        }
        Ok(())
    }
}

impl AuthBackend for MemoryAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let mut accounts = self.inner.lock().unwrap();
        Self::online(&accounts)?;
        if accounts.by_email.contains_key(email) {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Rejected(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let user = AuthUser::new(uuid::Uuid::new_v4().to_string(), email);
        accounts
            .by_email
            .insert(email.to_string(), (user.clone(), password.to_string()));
        Ok(user)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let mut accounts = self.inner.lock().unwrap();
        Self::online(&accounts)?;
        let user = match accounts.by_email.get(email) {
            Some((user, stored)) if stored == password => user.clone(),
            _ => return Err(AuthError::InvalidCredentials),
        };
        let session = Session::new(user, uuid::Uuid::new_v4().to_string());
        accounts.active = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let mut accounts = self.inner.lock().unwrap();
        Self::online(&accounts)?;
        if accounts.active.as_ref() == Some(session) {
            accounts.active = None;
        }
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let accounts = self.inner.lock().unwrap();
        Self::online(&accounts)?;
        Ok(accounts.active.clone())
    }
}
