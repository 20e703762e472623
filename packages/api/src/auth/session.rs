//! # Session store: the one active session of this client
//!
//! [`SessionStore`] owns the authentication session for the running client and is the
//! only place it is mutated. Everything else reads it.
//!
//! ## Phases
//!
//! ```text
//!   Loading ──restore: found──────────▶ Authenticated
//!      │                                   │    ▲
//!      └──restore: none/failed──▶ Unauthenticated
//!                                 ▲        │
//!                  sign_out /     │        │ sign_in
//!                  invalidate ────┘        ▼
//! ```
//!
//! The store starts in [`AuthPhase::Loading`] until [`restore`](SessionStore::restore)
//! resolves. There is no terminal phase: sign-in/sign-out cycles can repeat for the
//! life of the process.
//!
//! ## Notifications
//!
//! Listeners registered with [`on_session_change`](SessionStore::on_session_change)
//! are called once per change of the session value: `None` to `Some`, `Some` to
//! `None`, or one session replaced by a different one. Re-reading the same session
//! notifies nobody.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::ValidationError;

use crate::error::AuthError;
use crate::models::AuthUser;

use super::backend::AuthBackend;

/// An authenticated identity plus the credential that proves it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: AuthUser,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(user: AuthUser, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPhase {
    Loading,
    Unauthenticated,
    Authenticated,
}

/// What a listener is told when the session changes.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionChange {
    pub previous: Option<Session>,
    pub current: Option<Session>,
}

impl SessionChange {
    /// Whether the signed-in user is a different one (including signing in or out).
    pub fn user_changed(&self) -> bool {
        self.previous.as_ref().map(Session::user_id) != self.current.as_ref().map(Session::user_id)
    }
}

/// Handle for removing a listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&SessionChange) + Send + Sync>;

#[derive(Debug)]
struct State {
    phase: AuthPhase,
    session: Option<Session>,
}

/// Owner of the active session.
pub struct SessionStore<A: AuthBackend> {
    backend: A,
    state: Mutex<State>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

/// Trim and lowercase the email; both fields must be present.
fn credentials(email: &str, password: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::missing("email"));
    }
    if password.is_empty() {
        return Err(ValidationError::missing("password"));
    }
    Ok(email)
}

impl<A: AuthBackend> SessionStore<A> {
    pub fn new(backend: A) -> Self {
        Self {
            backend,
            state: Mutex::new(State {
                phase: AuthPhase::Loading,
                session: None,
            }),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &A {
        &self.backend
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> AuthPhase {
        self.state().phase
    }

    /// The active session, if any. Never blocks on the backend.
    pub fn current_session(&self) -> Option<Session> {
        self.state().session.clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.state().session.as_ref().map(|s| s.user.clone())
    }

    /// The signed-in user, or [`AuthError::NotSignedIn`].
    pub fn require_user(&self) -> Result<AuthUser, AuthError> {
        self.current_user().ok_or(AuthError::NotSignedIn)
    }

    /// Register `listener` for session changes.
    pub fn on_session_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SessionChange) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(listener);
        self.listeners().push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Move to the phase implied by `next` and notify if the session changed.
    fn transition(&self, next: Option<Session>) {
        let change = {
            let mut state = self.state();
            state.phase = if next.is_some() {
                AuthPhase::Authenticated
            } else {
                AuthPhase::Unauthenticated
            };
            if state.session == next {
                None
            } else {
                let previous = std::mem::replace(&mut state.session, next.clone());
                Some(SessionChange {
                    previous,
                    current: next,
                })
            }
        };

        let Some(change) = change else {
            return;
        };
        match &change.current {
            Some(session) => tracing::info!("Session active for user {}", session.user_id()),
            None => tracing::info!("Session cleared"),
        }
        // Snapshot so a listener may add or remove listeners.
        let listeners: Vec<Listener> = self.listeners().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(&change);
        }
    }

    /// Startup lookup. A failed lookup counts as signed out.
    pub async fn restore(&self) -> Option<Session> {
        let session = match self.backend.current_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Session lookup failed, starting signed out: {}", e);
                None
            }
        };
        self.transition(session.clone());
        session
    }

    /// Register a new account. The caller still has to sign in afterwards.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = credentials(email, password)?;
        let user = self.backend.sign_up(&email, password).await?;
        tracing::info!("Registered user {}", user.id);
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = credentials(email, password)?;
        let session = self.backend.sign_in_with_password(&email, password).await?;
        self.transition(Some(session.clone()));
        Ok(session)
    }

    /// Clear the session. The local session is dropped even if the backend call fails;
    /// that failure is still returned.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = match self.current_session() {
            Some(session) => self.backend.sign_out(&session).await,
            None => Ok(()),
        };
        self.transition(None);
        if let Err(e) = &result {
            tracing::warn!("Backend sign-out failed: {}", e);
        }
        result
    }

    /// Drop the session because the backend no longer honours it.
    pub fn invalidate(&self) {
        self.transition(None);
    }
}
