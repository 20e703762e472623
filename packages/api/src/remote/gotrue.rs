//! GoTrue-style auth endpoints as an [`AuthBackend`].
//!
//! | Operation | Request |
//! |-----------|---------|
//! | sign up | `POST /auth/v1/signup` |
//! | sign in | `POST /auth/v1/token?grant_type=password` |
//! | sign out | `POST /auth/v1/logout` with the session's bearer token |
//! | current session | `GET /auth/v1/user` with the held session's bearer token |
//!
//! The backend keeps no client-side session storage of its own. The last issued
//! session is held in memory, and [`GoTrueAuth::with_session`] seeds it from
//! whatever the application persisted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::ErrorBody;
use crate::auth::{AuthBackend, Session};
use crate::config::ClientConfig;
use crate::error::AuthError;
use crate::models::AuthUser;

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserBody> for AuthUser {
    fn from(user: UserBody) -> Self {
        AuthUser::new(user.id, user.email.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserBody,
}

impl TokenBody {
    fn into_session(self) -> Session {
        Session {
            user: self.user.into(),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|s| Utc::now() + Duration::seconds(s)),
        }
    }
}

/// Sign-up answers with either the user itself or, when confirmation is off, a
/// full token body carrying it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session { user: UserBody },
    User(UserBody),
}

#[derive(Clone, Debug)]
pub struct GoTrueAuth {
    client: Client,
    base_url: String,
    anon_key: String,
    session: Arc<Mutex<Option<Session>>>,
}

impl GoTrueAuth {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.auth_url(),
            anon_key: config.backend.anon_key.clone(),
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Start from a previously persisted session; [`current_session`] verifies it.
    ///
    /// [`current_session`]: AuthBackend::current_session
    pub fn with_session(self, session: Session) -> Self {
        *self.held() = Some(session);
        self
    }

    fn held(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token.unwrap_or(self.anon_key.as_str())))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, AuthError> {
        request
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))
    }

    async fn rejected(response: Response) -> AuthError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body = ErrorBody::parse(status, &text);
        let message = body.message().unwrap_or("request failed").to_string();
        tracing::warn!("Auth request failed with {}: {}", status, message);
        AuthError::Rejected(message)
    }
}

/// Whether a failed token request means the credentials were wrong.
fn is_bad_credentials(status: StatusCode) -> bool {
    status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED
}

impl AuthBackend for GoTrueAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let request = self
            .client
            .post(format!("{}/signup", self.base_url))
            .json(&Credentials { email, password });
        let response = self.send(self.request(request, None)).await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body: SignUpBody = response
            .json()
            .await
            .map_err(|e| AuthError::Rejected(format!("unexpected sign-up response: {}", e)))?;
        let user = match body {
            SignUpBody::Session { user } | SignUpBody::User(user) => user,
        };
        Ok(user.into())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let request = self
            .client
            .post(format!("{}/token", self.base_url))
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password });
        let response = self.send(self.request(request, None)).await?;

        let status = response.status();
        if is_bad_credentials(status) {
            tracing::debug!("Password grant refused with {}", status);
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(Self::rejected(response).await);
        }

        let body: TokenBody = response
            .json()
            .await
            .map_err(|e| AuthError::Rejected(format!("unexpected token response: {}", e)))?;
        let session = body.into_session();
        *self.held() = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        {
            let mut held = self.held();
            if held.as_ref() == Some(session) {
                *held = None;
            }
        }
        let request = self.client.post(format!("{}/logout", self.base_url));
        let response = self
            .send(self.request(request, Some(&session.access_token)))
            .await?;
        let status = response.status();
        // An already-revoked token is as signed out as it gets.
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(Self::rejected(response).await)
    }

    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.held().clone() else {
            return Ok(None);
        };
        if session.is_expired(Utc::now()) {
            tracing::info!("Stored session expired");
            *self.held() = None;
            return Ok(None);
        }

        let request = self.client.get(format!("{}/user", self.base_url));
        let response = self
            .send(self.request(request, Some(&session.access_token)))
            .await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::info!("Stored session no longer accepted");
            *self.held() = None;
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::rejected(response).await);
        }

        let user: UserBody = response
            .json()
            .await
            .map_err(|e| AuthError::Rejected(format!("unexpected user response: {}", e)))?;
        let session = Session {
            user: user.into(),
            ..session
        };
        *self.held() = Some(session.clone());
        Ok(Some(session))
    }
}
