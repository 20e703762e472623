//! # HTTP adapters for a hosted backend
//!
//! Only compiled with the `remote` feature. Both adapters are built from a
//! [`ClientConfig`](crate::config::ClientConfig) and send its anon key as `apikey` on
//! every request.
//!
//! - [`RestStore`]: [`store::RecordStore`] over the PostgREST endpoints at
//!   `{url}/rest/v1/{collection}`.
//! - [`GoTrueAuth`]: [`AuthBackend`](crate::auth::AuthBackend) over the auth
//!   endpoints at `{url}/auth/v1`.
//!
//! Row-level access is enforced by the backend, so [`RestStore`] must carry the
//! signed-in user's access token. [`RestStore::follow_session`] keeps it in step with
//! a [`SessionStore`](crate::auth::SessionStore).

mod gotrue;
mod rest;

pub use gotrue::GoTrueAuth;
pub use rest::RestStore;

use serde::Deserialize;

/// Error body shape shared by both services. Fields differ between them, so all are
/// optional.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
}

impl ErrorBody {
    fn parse(status: reqwest::StatusCode, text: &str) -> Self {
        let mut body: Self = serde_json::from_str(text).unwrap_or_default();
        if body.code.is_none() {
            body.code = Some(serde_json::Value::String(status.as_u16().to_string()));
        }
        if body.message().is_none() && !text.trim().is_empty() {
            body.message = Some(text.trim().to_string());
        }
        body
    }

    fn code(&self) -> String {
        match &self.code {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.error_description.as_deref())
    }
}
