//! # Entity lifecycle: one CRUD contract for every user-owned collection
//!
//! Relationships, important dates, memos, partner preferences and tags all go through
//! the same four operations. What differs per collection is described by the
//! [`Entity`] trait: which collection it lives in, its draft and patch shapes, how a
//! draft is normalised, and whether it carries a manual rank.
//!
//! ## [`EntityController`]
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`create`](EntityController::create) | Validates the draft, stamps `user_id`, assigns the next rank for ranked entities from a fresh read, inserts, and returns the stored record. |
//! | [`create_with_known`](EntityController::create_with_known) | Same, but ranks against a list the caller already holds. A stale list can repeat a rank; that is accepted. |
//! | [`update`](EntityController::update) | Partial update by id. `id` and `user_id` can never be patched. |
//! | [`delete`](EntityController::delete) | Delete by id. Dependent rows are the backend's business. |
//! | [`list`](EntityController::list) | Every record of one user in the requested order. |
//! | [`get`](EntityController::get) | One record by id. |
//!
//! Nothing is cached and nothing is retried: after a successful mutation the caller
//! lists again to refresh its view.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DataError, ValidationError};
use crate::models::*;
use crate::ordering::next_priority;
use crate::records::{Collection, Filter, Order, Query, RecordStore, Row};

/// Schema of a user-owned collection.
pub trait Entity: DeserializeOwned + Clone {
    const COLLECTION: Collection;
    /// Column holding the manual rank, for ranked entities.
    const RANK_FIELD: Option<&'static str> = None;
    /// Whether updates stamp `updated_at`.
    const STAMPS_UPDATED_AT: bool = false;

    type Draft: Serialize;
    type Patch: Serialize;

    fn id(&self) -> &str;

    /// Current rank, for ranked entities.
    fn rank(&self) -> Option<i64> {
        None
    }

    /// Order used when the caller has no preference.
    fn default_order() -> Order {
        Order::desc("created_at")
    }

    /// Normalise a draft and reject it if a required field is missing.
    fn prepare_draft(draft: Self::Draft) -> Result<Self::Draft, ValidationError> {
        Ok(draft)
    }

    fn prepare_patch(patch: Self::Patch) -> Result<Self::Patch, ValidationError> {
        Ok(patch)
    }

    /// Columns the client sets itself on insert.
    fn insert_defaults(_row: &mut Row) {}
}

fn required(value: String, field: &'static str) -> Result<String, ValidationError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(value)
}

fn required_opt(value: Option<String>, field: &'static str) -> Result<Option<String>, ValidationError> {
    value.map(|v| required(v, field)).transpose()
}

fn reminder_days(days: i32) -> Result<i32, ValidationError> {
    if days < 0 {
        return Err(ValidationError::InvalidField {
            field: "reminder_days_before",
            reason: "must not be negative".to_string(),
        });
    }
    Ok(days)
}

impl Entity for Relationship {
    const COLLECTION: Collection = Collection::Relationships;
    const RANK_FIELD: Option<&'static str> = Some("priority_order");
    const STAMPS_UPDATED_AT: bool = true;

    type Draft = RelationshipDraft;
    type Patch = RelationshipPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn rank(&self) -> Option<i64> {
        Some(self.priority_order)
    }

    fn default_order() -> Order {
        Order::asc("priority_order")
    }

    fn prepare_draft(draft: RelationshipDraft) -> Result<RelationshipDraft, ValidationError> {
        Ok(RelationshipDraft {
            name: required(draft.name, "name")?,
            notes: blank_to_none(draft.notes),
            ..draft
        })
    }

    fn prepare_patch(patch: RelationshipPatch) -> Result<RelationshipPatch, ValidationError> {
        Ok(RelationshipPatch {
            name: required_opt(patch.name, "name")?,
            notes: patch.notes.map(blank_to_none),
            ..patch
        })
    }
}

impl Entity for ImportantDate {
    const COLLECTION: Collection = Collection::ImportantDates;

    type Draft = ImportantDateDraft;
    type Patch = ImportantDatePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn default_order() -> Order {
        Order::asc("date")
    }

    fn prepare_draft(draft: ImportantDateDraft) -> Result<ImportantDateDraft, ValidationError> {
        reminder_days(draft.reminder_days_before)?;
        Ok(ImportantDateDraft {
            title: required(draft.title, "title")?,
            notes: blank_to_none(draft.notes),
            ..draft
        })
    }

    fn prepare_patch(patch: ImportantDatePatch) -> Result<ImportantDatePatch, ValidationError> {
        if let Some(days) = patch.reminder_days_before {
            reminder_days(days)?;
        }
        Ok(ImportantDatePatch {
            title: required_opt(patch.title, "title")?,
            notes: patch.notes.map(blank_to_none),
            ..patch
        })
    }
}

impl Entity for ActionMemo {
    const COLLECTION: Collection = Collection::ActionMemos;

    type Draft = ActionMemoDraft;
    type Patch = ActionMemoPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn prepare_draft(draft: ActionMemoDraft) -> Result<ActionMemoDraft, ValidationError> {
        Ok(ActionMemoDraft {
            title: required(draft.title, "title")?,
            description: blank_to_none(draft.description),
            ..draft
        })
    }

    fn prepare_patch(patch: ActionMemoPatch) -> Result<ActionMemoPatch, ValidationError> {
        Ok(ActionMemoPatch {
            title: required_opt(patch.title, "title")?,
            description: patch.description.map(blank_to_none),
            ..patch
        })
    }

    fn insert_defaults(row: &mut Row) {
        row.insert(
            "status".to_string(),
            Value::String("pending".to_string()),
        );
    }
}

impl Entity for PartnerPreference {
    const COLLECTION: Collection = Collection::PartnerPreferences;

    type Draft = PartnerPreferenceDraft;
    type Patch = PartnerPreferencePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn prepare_draft(
        draft: PartnerPreferenceDraft,
    ) -> Result<PartnerPreferenceDraft, ValidationError> {
        Ok(PartnerPreferenceDraft {
            category: required(draft.category, "category")?,
            title: required(draft.title, "title")?,
            description: blank_to_none(draft.description),
            tags: draft.tags.filter(|t| !t.is_empty()),
        })
    }

    fn prepare_patch(
        patch: PartnerPreferencePatch,
    ) -> Result<PartnerPreferencePatch, ValidationError> {
        Ok(PartnerPreferencePatch {
            category: required_opt(patch.category, "category")?,
            title: required_opt(patch.title, "title")?,
            description: patch.description.map(blank_to_none),
            tags: patch.tags.map(|t| t.filter(|t| !t.is_empty())),
        })
    }
}

impl Entity for RelationshipTag {
    const COLLECTION: Collection = Collection::RelationshipTags;
    const RANK_FIELD: Option<&'static str> = Some("sort_order");
    const STAMPS_UPDATED_AT: bool = true;

    type Draft = RelationshipTagDraft;
    type Patch = RelationshipTagPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn rank(&self) -> Option<i64> {
        Some(self.sort_order)
    }

    fn default_order() -> Order {
        Order::asc("sort_order")
    }

    fn prepare_draft(draft: RelationshipTagDraft) -> Result<RelationshipTagDraft, ValidationError> {
        Ok(RelationshipTagDraft {
            value: required(draft.value, "value")?,
            label: required(draft.label, "label")?,
        })
    }

    fn prepare_patch(patch: RelationshipTagPatch) -> Result<RelationshipTagPatch, ValidationError> {
        Ok(RelationshipTagPatch {
            value: required_opt(patch.value, "value")?,
            label: required_opt(patch.label, "label")?,
        })
    }
}

impl Entity for Event {
    const COLLECTION: Collection = Collection::Events;

    type Draft = EventDraft;
    type Patch = EventPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn default_order() -> Order {
        Order::asc("start_time")
    }

    fn prepare_draft(draft: EventDraft) -> Result<EventDraft, ValidationError> {
        if draft.end_time.is_some_and(|end| end < draft.start_time) {
            return Err(ValidationError::InvalidField {
                field: "end_time",
                reason: "must not be before the start".to_string(),
            });
        }
        Ok(EventDraft {
            title: required(draft.title, "title")?,
            description: blank_to_none(draft.description),
            location: blank_to_none(draft.location),
            relationship_ids: draft.relationship_ids.filter(|ids| !ids.is_empty()),
            ..draft
        })
    }

    fn prepare_patch(patch: EventPatch) -> Result<EventPatch, ValidationError> {
        Ok(EventPatch {
            title: required_opt(patch.title, "title")?,
            description: patch.description.map(blank_to_none),
            location: patch.location.map(blank_to_none),
            relationship_ids: patch
                .relationship_ids
                .map(|ids| ids.filter(|ids| !ids.is_empty())),
            ..patch
        })
    }
}

fn to_row<T: Serialize>(value: &T) -> Result<Row, DataError> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(DataError::Decode(format!("expected an object, got {other}"))),
    }
}

fn from_row<E: Entity>(row: Row) -> Result<E, DataError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// CRUD over one entity type.
pub struct EntityController<E: Entity, S: RecordStore> {
    store: S,
    _entity: PhantomData<E>,
}

impl<E: Entity, S: RecordStore> EntityController<E, S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Create a record for `user_id`, ranking it after the user's current records.
    pub async fn create(&self, user_id: &str, draft: E::Draft) -> Result<E, DataError> {
        let draft = E::prepare_draft(draft)?;
        let rank = match E::RANK_FIELD {
            Some(field) => Some(next_priority(self.existing_ranks(user_id, field).await?)),
            None => None,
        };
        self.insert(user_id, &draft, rank).await
    }

    /// Create a record ranked against `known`, the list the caller last loaded.
    ///
    /// No read happens before the insert, so a list that is out of date can produce
    /// a rank another record already has.
    pub async fn create_with_known(
        &self,
        user_id: &str,
        draft: E::Draft,
        known: &[E],
    ) -> Result<E, DataError> {
        let draft = E::prepare_draft(draft)?;
        let rank = E::RANK_FIELD.map(|_| next_priority(known.iter().filter_map(E::rank)));
        self.insert(user_id, &draft, rank).await
    }

    async fn existing_ranks(&self, user_id: &str, field: &str) -> Result<Vec<i64>, DataError> {
        let query = Query::from(E::COLLECTION)
            .eq("user_id", user_id)
            .order_by(field, false)
            .limit(1);
        let rows = self.store.select(&query).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(field).and_then(Value::as_i64))
            .collect())
    }

    async fn insert(&self, user_id: &str, draft: &E::Draft, rank: Option<i64>) -> Result<E, DataError> {
        let mut row = to_row(draft)?;
        E::insert_defaults(&mut row);
        if let (Some(field), Some(rank)) = (E::RANK_FIELD, rank) {
            row.insert(field.to_string(), Value::from(rank));
        }
        row.remove("id");
        row.insert("user_id".to_string(), Value::String(user_id.to_string()));

        tracing::debug!("Inserting into {} (rank {:?})", E::COLLECTION, rank);
        let mut stored = self.store.insert(E::COLLECTION, vec![row]).await?;
        let row = stored.pop().ok_or(DataError::NotFound {
            collection: E::COLLECTION,
        })?;
        from_row(row)
    }

    /// Apply a partial update to the record with `id`.
    pub async fn update(&self, id: &str, patch: E::Patch) -> Result<(), DataError> {
        let patch = E::prepare_patch(patch)?;
        let mut row = to_row(&patch)?;
        row.remove("id");
        row.remove("user_id");
        if row.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }
        if E::STAMPS_UPDATED_AT {
            row.insert(
                "updated_at".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }

        tracing::debug!("Updating {} in {}", id, E::COLLECTION);
        self.store
            .update(E::COLLECTION, &[Filter::eq("id", id)], row)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), DataError> {
        tracing::debug!("Deleting {} from {}", id, E::COLLECTION);
        self.store
            .delete(E::COLLECTION, &[Filter::eq("id", id)])
            .await
    }

    /// Every record of `user_id`, sorted by `order`.
    pub async fn list(&self, user_id: &str, order: Order) -> Result<Vec<E>, DataError> {
        let query = Query::from(E::COLLECTION)
            .eq("user_id", user_id)
            .order(order);
        let rows = self.store.select(&query).await?;
        rows.into_iter().map(from_row).collect()
    }

    /// Every record of `user_id` in the entity's usual order.
    pub async fn list_default(&self, user_id: &str) -> Result<Vec<E>, DataError> {
        self.list(user_id, E::default_order()).await
    }

    pub async fn get(&self, id: &str) -> Result<E, DataError> {
        let query = Query::from(E::COLLECTION).eq("id", id);
        from_row(self.store.single(&query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryStore, Operation};
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    fn relationships(store: &MemoryStore) -> EntityController<Relationship, MemoryStore> {
        EntityController::new(store.clone())
    }

    fn draft(name: &str) -> RelationshipDraft {
        RelationshipDraft {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_first_relationship_ranks_zero() {
        let store = MemoryStore::new();
        let ctl = relationships(&store);

        let rel = ctl.create("u1", draft("  Ann  ")).await.unwrap();
        assert_eq!(rel.priority_order, 0);
        assert_eq!(rel.user_id, "u1");
        assert_eq!(rel.name, "Ann");
        assert_eq!(rel.relationship_type, RelationshipType::Friend);
    }

    #[tokio::test]
    async fn test_create_appends_after_max_per_user() {
        let store = MemoryStore::new();
        let ctl = relationships(&store);

        ctl.create("u1", draft("a")).await.unwrap();
        ctl.create("u1", draft("b")).await.unwrap();
        let other = ctl.create("u2", draft("x")).await.unwrap();
        assert_eq!(other.priority_order, 0);

        let c = ctl.create("u1", draft("c")).await.unwrap();
        assert_eq!(c.priority_order, 2);
    }

    #[tokio::test]
    async fn test_ranks_tolerate_gaps() {
        let store = MemoryStore::new();
        let ctl = relationships(&store);

        let a = ctl.create("u1", draft("a")).await.unwrap();
        let b = ctl.create("u1", draft("b")).await.unwrap();
        ctl.create("u1", draft("c")).await.unwrap();
        ctl.delete(&b.id).await.unwrap();
        ctl.delete(&a.id).await.unwrap();

        let d = ctl.create("u1", draft("d")).await.unwrap();
        assert_eq!(d.priority_order, 3);

        let names: Vec<_> = ctl
            .list_default("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn test_stale_list_can_repeat_rank() {
        let store = MemoryStore::new();
        let ctl = relationships(&store);

        // Both creates rank against the same empty list the caller loaded earlier.
        let loaded: Vec<Relationship> = ctl.list_default("u1").await.unwrap();
        let first = ctl.create_with_known("u1", draft("a"), &loaded).await.unwrap();
        let second = ctl.create_with_known("u1", draft("b"), &loaded).await.unwrap();

        assert_eq!(first.priority_order, 0);
        assert_eq!(second.priority_order, 0);
        assert_eq!(ctl.list_default("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_name_rejected_before_any_call() {
        let store = MemoryStore::new();
        store.fail_on(Collection::Relationships, Operation::Select);
        store.fail_on(Collection::Relationships, Operation::Insert);
        let ctl = relationships(&store);

        let err = ctl.create("u1", draft("   ")).await.unwrap_err();
        assert_eq!(err, DataError::Validation(ValidationError::missing("name")));
    }

    #[tokio::test]
    async fn test_update_is_partial_and_stamps_updated_at() {
        let store = MemoryStore::new();
        let ctl = relationships(&store);
        let rel = ctl
            .create(
                "u1",
                RelationshipDraft {
                    name: "Ann".to_string(),
                    relationship_type: RelationshipType::Colleague,
                    met_date: NaiveDate::from_ymd_opt(2020, 2, 2),
                    notes: Some("met at work".to_string()),
                },
            )
            .await
            .unwrap();

        ctl.update(
            &rel.id,
            RelationshipPatch {
                notes: Some(Some("   ".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let updated = ctl.get(&rel.id).await.unwrap();
        assert_eq!(updated.notes, None);
        assert_eq!(updated.name, "Ann");
        assert_eq!(updated.relationship_type, RelationshipType::Colleague);
        assert_eq!(updated.priority_order, rel.priority_order);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_empty_patch_rejected() {
        let store = MemoryStore::new();
        let ctl = relationships(&store);
        let err = ctl
            .update("r1", RelationshipPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err, DataError::Validation(ValidationError::EmptyPatch));
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_user() {
        let store = MemoryStore::new();
        let ctl: EntityController<ActionMemo, _> = EntityController::new(store.clone());

        ctl.create(
            "u1",
            ActionMemoDraft {
                title: "Call mom".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        ctl.create(
            "u2",
            ActionMemoDraft {
                title: "Someone else".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mine = ctl.list("u1", Order::desc("created_at")).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "Call mom");
        assert_eq!(mine[0].status, MemoStatus::Pending);
    }

    #[tokio::test]
    async fn test_toggle_memo_round_trip() {
        let store = MemoryStore::new();
        let ctl: EntityController<ActionMemo, _> = EntityController::new(store.clone());
        let memo = ctl
            .create(
                "u1",
                ActionMemoDraft {
                    title: "Flowers".to_string(),
                    priority: MemoPriority::High,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        ctl.update(&memo.id, memo.toggle_status_patch(chrono::Utc::now()))
            .await
            .unwrap();
        let done = ctl.get(&memo.id).await.unwrap();
        assert_eq!(done.status, MemoStatus::Completed);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_tags_use_sort_order() {
        let store = MemoryStore::new();
        let ctl: EntityController<RelationshipTag, _> = EntityController::new(store.clone());

        let mentor = ctl
            .create(
                "u1",
                RelationshipTagDraft {
                    value: "mentor".to_string(),
                    label: "Mentor".to_string(),
                },
            )
            .await
            .unwrap();
        let neighbour = ctl
            .create(
                "u1",
                RelationshipTagDraft {
                    value: "neighbour".to_string(),
                    label: " Neighbour ".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(mentor.sort_order, 0);
        assert_eq!(neighbour.sort_order, 1);
        assert_eq!(neighbour.label, "Neighbour");

        let err = ctl
            .create(
                "u1",
                RelationshipTagDraft {
                    value: "x".to_string(),
                    label: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, DataError::Validation(ValidationError::missing("label")));
    }

    #[tokio::test]
    async fn test_dates_listed_by_date() {
        let store = MemoryStore::new();
        let ctl: EntityController<ImportantDate, _> = EntityController::new(store.clone());
        for (title, day) in [("later", 20), ("sooner", 5)] {
            ctl.create(
                "u1",
                ImportantDateDraft {
                    title: title.to_string(),
                    date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
                    kind: DateKind::Other,
                    reminder_days_before: parse_reminder_days("x"),
                    notes: None,
                },
            )
            .await
            .unwrap();
        }

        let dates = ctl.list_default("u1").await.unwrap();
        assert_eq!(dates[0].title, "sooner");
        assert_eq!(dates[1].reminder_days_before, DEFAULT_REMINDER_DAYS);
    }

    #[tokio::test]
    async fn test_negative_reminder_rejected_on_update() {
        let store = MemoryStore::new();
        let ctl: EntityController<ImportantDate, _> = EntityController::new(store.clone());
        let date = ctl
            .create(
                "u1",
                ImportantDateDraft {
                    title: "Anniversary".to_string(),
                    date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                    kind: DateKind::Anniversary,
                    reminder_days_before: 3,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let err = ctl
            .update(
                &date.id,
                ImportantDatePatch {
                    reminder_days_before: Some(-1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::Validation(ValidationError::InvalidField {
                field: "reminder_days_before",
                ..
            })
        ));
        assert_eq!(ctl.get(&date.id).await.unwrap().reminder_days_before, 3);

        ctl.update(
            &date.id,
            ImportantDatePatch {
                reminder_days_before: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(ctl.get(&date.id).await.unwrap().reminder_days_before, 0);
    }

    fn event(title: &str, start: DateTime<Utc>) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            description: None,
            start_time: start,
            end_time: None,
            location: None,
            relationship_ids: None,
        }
    }

    #[tokio::test]
    async fn test_events_listed_by_start_time() {
        let store = MemoryStore::new();
        let ctl: EntityController<Event, _> = EntityController::new(store.clone());
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap();

        ctl.create("u1", event("concert", base + Duration::days(9)))
            .await
            .unwrap();
        let dinner = ctl
            .create(
                "u1",
                EventDraft {
                    location: Some("  ".to_string()),
                    relationship_ids: Some(vec!["r1".to_string()]),
                    end_time: Some(base + Duration::hours(2)),
                    ..event(" dinner ", base)
                },
            )
            .await
            .unwrap();
        ctl.create("u2", event("elsewhere", base)).await.unwrap();

        assert_eq!(dinner.title, "dinner");
        assert_eq!(dinner.location, None);
        assert_eq!(dinner.relationship_ids, Some(vec!["r1".to_string()]));

        let events = ctl.list_default("u1").await.unwrap();
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["dinner", "concert"]);

        let between = base + Duration::days(1);
        let upcoming: Vec<_> = events.iter().filter(|e| e.is_upcoming(between)).collect();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].title, "concert");
    }

    #[tokio::test]
    async fn test_event_end_before_start_rejected() {
        let store = MemoryStore::new();
        let ctl: EntityController<Event, _> = EntityController::new(store.clone());
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap();

        let err = ctl
            .create(
                "u1",
                EventDraft {
                    end_time: Some(start - Duration::minutes(30)),
                    ..event("dinner", start)
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::Validation(ValidationError::InvalidField { field: "end_time", .. })
        ));
        assert!(store.rows(Collection::Events).is_empty());
    }

    #[tokio::test]
    async fn test_preference_tags_empty_list_stored_as_null() {
        let store = MemoryStore::new();
        let ctl: EntityController<PartnerPreference, _> = EntityController::new(store.clone());
        let pref = ctl
            .create(
                "u1",
                PartnerPreferenceDraft {
                    category: "likes".to_string(),
                    title: "Tea".to_string(),
                    description: Some(String::new()),
                    tags: Some(Vec::new()),
                },
            )
            .await
            .unwrap();
        assert_eq!(pref.tags, None);
        assert_eq!(pref.description, None);
    }

    #[tokio::test]
    async fn test_errors_surface_without_retry() {
        let store = MemoryStore::new();
        let ctl = relationships(&store);
        store.fail_on(Collection::Relationships, Operation::Select);

        assert!(matches!(
            ctl.create("u1", draft("a")).await,
            Err(DataError::Transport(_))
        ));
        assert!(store.rows(Collection::Relationships).is_empty());

        store.clear_failures();
        store.fail_on(Collection::Relationships, Operation::Delete);
        let rel = ctl.create("u1", draft("a")).await.unwrap();
        assert!(ctl.delete(&rel.id).await.is_err());
        assert_eq!(ctl.list_default("u1").await.unwrap().len(), 1);
    }
}
