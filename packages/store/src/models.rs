//! # Domain records owned by a signed-in user
//!
//! Every type here mirrors one row shape of a backend collection and is
//! `Serialize + Deserialize` so it can be read straight out of a [`crate::Row`].
//!
//! | Struct | Collection | Notes |
//! |--------|-----------|-------|
//! | [`Profile`] | `profiles` | One per user, keyed by the user id. Holds partner name and theme preferences. |
//! | [`Relationship`] | `relationships` | Ranked by `priority_order`. |
//! | [`ImportantDate`] | `important_dates` | Birthdays, anniversaries and other dates with a reminder lead time. |
//! | [`ActionMemo`] | `action_memos` | To-dos with priority and a pending/completed status. |
//! | [`PartnerPreference`] | `partner_preferences` | Free-form likes/dislikes with optional tags. |
//! | [`RelationshipTag`] | `relationship_tags` | User-defined labels ranked by `sort_order`. |
//! | [`Event`] | `events` | Scheduled get-togethers, optionally linked to relationships. |
//!
//! Each entity also has a `*Draft` (fields accepted on create) and a `*Patch`
//! (partial update, `None` fields are left untouched). `Option<Option<T>>` patch fields
//! distinguish "leave alone" from "clear to null".

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Accent color used whenever no valid color is available.
pub const DEFAULT_PRIMARY: &str = "#3B82F6";

/// Lead time used when a reminder input cannot be read.
pub const DEFAULT_REMINDER_DAYS: i32 = 7;

/// How the app picks light or dark appearance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Follow the device setting.
    #[default]
    System,
    Light,
    Dark,
}

impl ThemeMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Self::System),
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Absent, null or unrecognised persisted modes all read as `system`.
fn lenient_theme_mode<'de, D>(deserializer: D) -> Result<ThemeMode, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ThemeMode::parse).unwrap_or_default())
}

/// Per-user settings row, keyed by the auth user id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub partner_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_theme_mode")]
    pub theme_mode: ThemeMode,
    #[serde(default)]
    pub theme_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// The profile a user gets before anything has been saved.
    pub fn default_for(user_id: &str, email: &str) -> Self {
        Self {
            id: user_id.to_string(),
            email: email.to_string(),
            partner_name: None,
            theme_mode: ThemeMode::System,
            theme_color: Some(DEFAULT_PRIMARY.to_string()),
            created_at: None,
        }
    }
}

/// Trim, and treat blank text as absent.
pub fn blank_to_none(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

/// Kind of relationship a contact has with the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    Partner,
    Colleague,
    Supervisor,
    Subordinate,
    #[default]
    Friend,
    Family,
    Other,
}

/// A tracked contact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub relationship_type: RelationshipType,
    #[serde(default)]
    pub met_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    pub priority_order: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Relationship {
    /// Whole days between `met_date` and `today`, or `None` when the date is unknown.
    pub fn days_since_met(&self, today: NaiveDate) -> Option<i64> {
        self.met_date
            .map(|met| today.signed_duration_since(met).num_days().abs())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RelationshipDraft {
    pub name: String,
    pub relationship_type: RelationshipType,
    pub met_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RelationshipPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<RelationshipType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub met_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

// ---------------------------------------------------------------------------
// Important dates
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateKind {
    Birthday,
    Anniversary,
    #[default]
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImportantDate {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: DateKind,
    pub reminder_days_before: i32,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImportantDateDraft {
    pub title: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: DateKind,
    pub reminder_days_before: i32,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportantDatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<DateKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_days_before: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

/// Read a reminder lead time typed by the user, falling back to
/// [`DEFAULT_REMINDER_DAYS`].
pub fn parse_reminder_days(input: &str) -> i32 {
    match input.trim().parse::<i32>() {
        Ok(n) if n > 0 => n,
        _ => DEFAULT_REMINDER_DAYS,
    }
}

// ---------------------------------------------------------------------------
// Action memos
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoStatus {
    #[default]
    Pending,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionMemo {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: MemoPriority,
    pub status: MemoStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ActionMemo {
    /// Patch that flips the status, stamping or clearing `completed_at`.
    pub fn toggle_status_patch(&self, now: DateTime<Utc>) -> ActionMemoPatch {
        let (status, completed_at) = match self.status {
            MemoStatus::Pending => (MemoStatus::Completed, Some(now)),
            MemoStatus::Completed => (MemoStatus::Pending, None),
        };
        ActionMemoPatch {
            status: Some(status),
            completed_at: Some(completed_at),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ActionMemoDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: MemoPriority,
    pub due_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ActionMemoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<MemoPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MemoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

// ---------------------------------------------------------------------------
// Partner preferences
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartnerPreference {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PartnerPreferenceDraft {
    pub category: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PartnerPreferencePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Option<Vec<String>>>,
}

/// Split a comma-separated tag input. No usable tags means `None`.
pub fn parse_tags(input: &str) -> Option<Vec<String>> {
    let tags: Vec<String> = input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    (!tags.is_empty()).then_some(tags)
}

// ---------------------------------------------------------------------------
// Relationship tags
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationshipTag {
    pub id: String,
    pub user_id: String,
    pub value: String,
    pub label: String,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RelationshipTagDraft {
    pub value: String,
    pub label: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RelationshipTagPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    /// Ids of the [`Relationship`]s taking part.
    #[serde(default)]
    pub relationship_ids: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Whether the event starts after `now`.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.start_time > now
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub relationship_ids: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_ids: Option<Option<Vec<String>>>,
}
