//! # Records: the query surface of the remote data collections
//!
//! Everything the client persists lives in one of seven named collections on the
//! backend. This module defines the minimal capability the rest of the crate depends
//! on: filtered reads, inserts, partial updates and deletes, each returning either a
//! record set or a [`DataError`]. No transport is assumed; [`crate::MemoryStore`]
//! implements the trait for tests and the `api` crate carries an HTTP adapter.
//!
//! ## [`RecordStore`] trait
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`select`](RecordStore::select) | Runs a [`Query`] and returns every matching [`Row`]. |
//! | [`insert`](RecordStore::insert) | Inserts rows and returns them as stored (with server-filled columns). |
//! | [`update`](RecordStore::update) | Applies a partial patch to every row matching the filters. |
//! | [`delete`](RecordStore::delete) | Removes every row matching the filters. |
//! | [`maybe_single`](RecordStore::maybe_single) | Provided. Zero rows is `None`; more than one is an error. |
//! | [`single`](RecordStore::single) | Provided. Zero rows is [`DataError::NotFound`]. |
//!
//! ## Queries
//!
//! [`Query`] is a small builder: `Query::from(Collection::Relationships)
//! .eq("user_id", id).order_by("priority_order", true)`. Filters are equality-only,
//! which is all the client ever needs. [`Query::to_query_pairs`] renders the query as
//! PostgREST-style parameters for HTTP backends.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DataError;

/// One record as it travels to and from the backend.
pub type Row = Map<String, Value>;

/// The named record collections owned by a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Profiles,
    Relationships,
    ImportantDates,
    ActionMemos,
    PartnerPreferences,
    RelationshipTags,
    Events,
}

impl Collection {
    /// Wire name of the collection.
    pub fn name(self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Relationships => "relationships",
            Self::ImportantDates => "important_dates",
            Self::ActionMemos => "action_memos",
            Self::PartnerPreferences => "partner_preferences",
            Self::RelationshipTags => "relationship_tags",
            Self::Events => "events",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Equality filter on a single field.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether `row` satisfies this filter. A missing field matches only `null`.
    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.field).unwrap_or(&Value::Null) == &self.value
    }

    fn to_pair(&self) -> (String, String) {
        let rendered = match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => "null".to_string(),
            other => other.to_string(),
        };
        let op = if self.value.is_null() { "is" } else { "eq" };
        (self.field.clone(), format!("{op}.{rendered}"))
    }
}

/// Sort key for a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// A filtered, ordered read against one collection.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub collection: Collection,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl From<Collection> for Query {
    fn from(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }
}

impl Query {
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(field, value));
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn order_by(self, field: impl Into<String>, ascending: bool) -> Self {
        self.order(Order {
            field: field.into(),
            ascending,
        })
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Render as PostgREST query parameters.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(self.filters.iter().map(Filter::to_pair));
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.field, if o.ascending { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }
        if let Some(n) = self.limit {
            pairs.push(("limit".to_string(), n.to_string()));
        }
        pairs
    }
}

/// Render a filter set as PostgREST query parameters (used by update and delete).
pub fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(Filter::to_pair).collect()
}

/// Async capability over the remote record collections.
pub trait RecordStore {
    fn select(
        &self,
        query: &Query,
    ) -> impl std::future::Future<Output = Result<Vec<Row>, DataError>>;
    fn insert(
        &self,
        collection: Collection,
        rows: Vec<Row>,
    ) -> impl std::future::Future<Output = Result<Vec<Row>, DataError>>;
    fn update(
        &self,
        collection: Collection,
        filters: &[Filter],
        patch: Row,
    ) -> impl std::future::Future<Output = Result<(), DataError>>;
    fn delete(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> impl std::future::Future<Output = Result<(), DataError>>;

    /// Zero or one row. More than one match is an error.
    fn maybe_single(
        &self,
        query: &Query,
    ) -> impl std::future::Future<Output = Result<Option<Row>, DataError>> {
        async move {
            let mut rows = self.select(query).await?;
            match rows.len() {
                0 => Ok(None),
                1 => Ok(rows.pop()),
                _ => Err(DataError::MultipleRows {
                    collection: query.collection,
                }),
            }
        }
    }

    /// Exactly one row.
    fn single(
        &self,
        query: &Query,
    ) -> impl std::future::Future<Output = Result<Row, DataError>> {
        async move {
            self.maybe_single(query).await?.ok_or(DataError::NotFound {
                collection: query.collection,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs() {
        let query = Query::from(Collection::Relationships)
            .eq("user_id", "u-1")
            .order_by("priority_order", true)
            .order_by("created_at", false)
            .limit(1);

        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("user_id".to_string(), "eq.u-1".to_string()),
                ("order".to_string(), "priority_order.asc,created_at.desc".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_null_filter_renders_is() {
        let pairs = filter_pairs(&[Filter::eq("notes", Value::Null), Filter::eq("n", 3)]);
        assert_eq!(pairs[0], ("notes".to_string(), "is.null".to_string()));
        assert_eq!(pairs[1], ("n".to_string(), "eq.3".to_string()));
    }

    #[test]
    fn test_filter_matches_missing_field_as_null() {
        let row = json!({ "id": "a" }).as_object().cloned().unwrap();
        assert!(Filter::eq("id", "a").matches(&row));
        assert!(Filter::eq("notes", Value::Null).matches(&row));
        assert!(!Filter::eq("id", "b").matches(&row));
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::ImportantDates.to_string(), "important_dates");
        assert_eq!(Collection::RelationshipTags.name(), "relationship_tags");
        assert_eq!(Collection::Events.to_string(), "events");
    }
}
