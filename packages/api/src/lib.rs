//! # API crate: session, preferences and backend access for the relationship client
//!
//! This crate sits between the screens and the remote backend. It owns the signed-in
//! session, keeps the user's profile row reconciled, resolves the theme from stored
//! preferences and the device, and hands out scoped CRUD controllers over the
//! [`store`] collections.
//!
//! ## Modules
//!
//! | Module | Feature gate | Purpose |
//! |--------|-------------|---------|
//! | [`auth`] | none | Session store, phases, change listeners, the [`AuthBackend`] trait and an in-memory backend |
//! | [`cancel`] | none | [`LoadGuard`] for discarding loads that finish after teardown |
//! | [`config`] | none | Backend URL and anon key from TOML or the environment |
//! | [`context`] | none | [`AppContext`], built once and passed to every screen |
//! | [`error`] | none | [`AuthError`] and [`ClientError`] |
//! | [`models`] | none | [`AuthUser`], the identity reported by the auth backend |
//! | [`profile`] | none | Find-or-create of the per-user profile row |
//! | [`theme`] | none | Color scheme resolution, palette derivation, per-user preference state |
//! | `remote` | `remote` | HTTP adapters: `RestStore` and `GoTrueAuth` over `reqwest` |

pub mod auth;
pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod profile;
#[cfg(feature = "remote")]
pub mod remote;
pub mod theme;

pub use auth::{AuthBackend, AuthPhase, MemoryAuth, Session, SessionChange, SessionStore};
pub use cancel::LoadGuard;
pub use config::{ClientConfig, ConfigError};
pub use context::AppContext;
pub use error::{AuthError, ClientError};
pub use models::AuthUser;
pub use profile::{ProfileOutcome, ProfileReconciler, ThemePatch};
pub use theme::{
    derive_palette, resolve_color, resolve_scheme, ColorScheme, NavigationTheme, Palette, PreferenceResolver,
    ResolvedTheme, ThemePreferences,
};

#[cfg(feature = "remote")]
pub use remote::{GoTrueAuth, RestStore};

pub use store;
