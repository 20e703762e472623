//! # Profile reconciler: one profile row per signed-in user
//!
//! Preference reads assume the user's `profiles` row exists. [`ProfileReconciler`]
//! guarantees it by repairing missing state on first contact:
//!
//! | Lookup result | Outcome | Persisted? |
//! |---------------|---------|-----------|
//! | row found | [`ProfileOutcome::Found`] with the row as stored | no write |
//! | no row | [`ProfileOutcome::CreatedDefault`] with default values | inserted; a failed insert is logged and ignored |
//! | lookup failed | [`ProfileOutcome::DefaultOnly`] with default values | nothing written |
//!
//! In every case the caller gets usable values, so a flaky backend never blocks the
//! UI. The next reconciliation (e.g. on relaunch) corrects anything that did not stick.

use serde::Serialize;
use serde_json::Value;
use store::{Collection, DataError, Filter, Profile, Query, RecordStore, Row, ThemeMode};

/// How [`ProfileReconciler::reconcile`] obtained the profile.
#[derive(Clone, Debug, PartialEq)]
pub enum ProfileOutcome {
    /// The stored row.
    Found(Profile),
    /// No row existed; defaults were constructed and an insert was attempted.
    CreatedDefault(Profile),
    /// The lookup itself failed; defaults only, nothing persisted.
    DefaultOnly(Profile),
}

impl ProfileOutcome {
    pub fn profile(&self) -> &Profile {
        match self {
            Self::Found(p) | Self::CreatedDefault(p) | Self::DefaultOnly(p) => p,
        }
    }

    pub fn into_profile(self) -> Profile {
        match self {
            Self::Found(p) | Self::CreatedDefault(p) | Self::DefaultOnly(p) => p,
        }
    }
}

/// Theme fields of a profile, for single-field updates.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ThemePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_mode: Option<ThemeMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
}

/// Keeps the current user's profile row in existence and up to date.
#[derive(Clone, Debug)]
pub struct ProfileReconciler<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> ProfileReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read the profile, creating it with defaults if it is missing.
    pub async fn reconcile(&self, user_id: &str, email: &str) -> ProfileOutcome {
        let query = Query::from(Collection::Profiles).eq("id", user_id);
        let found = match self.store.maybe_single(&query).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Profile lookup for {} failed, using defaults: {}", user_id, e);
                return ProfileOutcome::DefaultOnly(Profile::default_for(user_id, email));
            }
        };

        if let Some(row) = found {
            match serde_json::from_value::<Profile>(Value::Object(row)) {
                Ok(profile) => return ProfileOutcome::Found(profile),
                Err(e) => {
                    tracing::warn!("Unreadable profile row for {}, using defaults: {}", user_id, e);
                    return ProfileOutcome::DefaultOnly(Profile::default_for(user_id, email));
                }
            }
        }

        let profile = Profile::default_for(user_id, email);
        match self.insert(&profile).await {
            Ok(()) => tracing::info!("Created profile for {}", user_id),
            Err(e) => tracing::warn!("Could not create profile for {}: {}", user_id, e),
        }
        ProfileOutcome::CreatedDefault(profile)
    }

    /// [`reconcile`](Self::reconcile), returning just the profile.
    pub async fn ensure_profile(&self, user_id: &str, email: &str) -> Result<Profile, DataError> {
        if user_id.trim().is_empty() {
            return Err(store::ValidationError::missing("user_id").into());
        }
        Ok(self.reconcile(user_id, email).await.into_profile())
    }

    async fn insert(&self, profile: &Profile) -> Result<(), DataError> {
        let row = to_row(profile)?;
        self.store.insert(Collection::Profiles, vec![row]).await?;
        Ok(())
    }

    async fn patch(&self, user_id: &str, row: Row) -> Result<(), DataError> {
        self.store
            .update(Collection::Profiles, &[Filter::eq("id", user_id)], row)
            .await
    }

    /// Persist the given theme fields to the user's row.
    pub async fn update_theme(&self, user_id: &str, patch: &ThemePatch) -> Result<(), DataError> {
        let row = to_row(patch)?;
        if row.is_empty() {
            return Err(store::ValidationError::EmptyPatch.into());
        }
        self.patch(user_id, row).await
    }

    /// Set the partner name. Blank clears it.
    pub async fn update_partner_name(&self, user_id: &str, name: &str) -> Result<(), DataError> {
        let name = store::models::blank_to_none(Some(name.to_string()));
        let mut row = Row::new();
        row.insert(
            "partner_name".to_string(),
            name.map_or(Value::Null, Value::String),
        );
        self.patch(user_id, row).await
    }
}

fn to_row<T: Serialize>(value: &T) -> Result<Row, DataError> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(DataError::Decode(format!("expected an object, got {other}"))),
    }
}
