//! # Client configuration: where the backend lives
//!
//! The client only needs to know the backend's base URL and its public (anon) key.
//! Both can come from a TOML file:
//!
//! ```toml
//! [backend]
//! url = "https://example.supabase.co"
//! anon_key = "public-anon-key"
//! ```
//!
//! or from the environment (`BACKEND_URL`, `BACKEND_ANON_KEY`), with a `.env` file
//! loaded first via `dotenvy`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const URL_VAR: &str = "BACKEND_URL";
pub const ANON_KEY_VAR: &str = "BACKEND_ANON_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    MissingVar(&'static str),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not write config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level client configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Backend endpoint and public key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL without a trailing slash.
    #[serde(default)]
    pub url: String,
    /// Public key sent as `apikey` on every request.
    #[serde(default)]
    pub anon_key: String,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig {
                url: url.into().trim_end_matches('/').to_string(),
                anon_key: anon_key.into(),
            },
        }
    }

    /// Read `BACKEND_URL` and `BACKEND_ANON_KEY`, loading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let url = std::env::var(URL_VAR).map_err(|_| ConfigError::MissingVar(URL_VAR))?;
        let anon_key =
            std::env::var(ANON_KEY_VAR).map_err(|_| ConfigError::MissingVar(ANON_KEY_VAR))?;
        Ok(Self::new(url, anon_key))
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(s)?;
        config.backend.url = config.backend.url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// `{url}/rest/v1`
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.backend.url)
    }

    /// `{url}/auth/v1`
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.backend.url)
    }
}
