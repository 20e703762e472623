use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::DataError;
use crate::records::{Collection, Filter, Order, Query, RecordStore, Row};

/// Store operation, used to target injected failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

/// In-memory RecordStore for testing and offline demos.
///
/// Inserts fill `id` and `created_at` when the caller leaves them out, the way the
/// backend's column defaults do.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<HashMap<Collection, Vec<Row>>>>,
    failures: Arc<Mutex<HashSet<(Collection, Operation)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `op` on `collection` fail with a transport error until cleared.
    pub fn fail_on(&self, collection: Collection, op: Operation) {
        self.failures.lock().unwrap().insert((collection, op));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Snapshot of a collection in insertion order.
    pub fn rows(&self, collection: Collection) -> Vec<Row> {
        self.rows
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self, collection: Collection, op: Operation) -> Result<(), DataError> {
        if self.failures.lock().unwrap().contains(&(collection, op)) {
            return Err(DataError::Transport(format!(
                "injected {op:?} failure on {collection}"
            )));
        }
        Ok(())
    }
}

fn matches_all(filters: &[Filter], row: &Row) -> bool {
    filters.iter().all(|f| f.matches(row))
}

/// Total order over JSON values: nulls first, then booleans, numbers, strings.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_rows(order: &[Order], a: &Row, b: &Row) -> Ordering {
    for key in order {
        let x = a.get(&key.field).unwrap_or(&Value::Null);
        let y = b.get(&key.field).unwrap_or(&Value::Null);
        let ord = compare_values(x, y);
        let ord = if key.ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl RecordStore for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, DataError> {
        self.check(query.collection, Operation::Select)?;
        let mut out: Vec<Row> = self
            .rows(query.collection)
            .into_iter()
            .filter(|row| matches_all(&query.filters, row))
            .collect();
        // Stable sort keeps insertion order for ties.
        out.sort_by(|a, b| compare_rows(&query.order, a, b));
        if let Some(n) = query.limit {
            out.truncate(n);
        }
        Ok(out)
    }

    async fn insert(&self, collection: Collection, rows: Vec<Row>) -> Result<Vec<Row>, DataError> {
        self.check(collection, Operation::Insert)?;
        let now = chrono::Utc::now().to_rfc3339();
        let mut guard = self.rows.lock().unwrap();
        let table = guard.entry(collection).or_default();

        let mut stored: Vec<Row> = Vec::with_capacity(rows.len());
        for mut row in rows {
            row.entry("id")
                .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
            row.entry("created_at")
                .or_insert_with(|| Value::String(now.clone()));
            let duplicate = table
                .iter()
                .chain(stored.iter())
                .any(|existing| existing.get("id") == row.get("id"));
            if duplicate {
                return Err(DataError::Rejected {
                    code: "23505".to_string(),
                    message: format!("duplicate key in {collection}"),
                });
            }
            stored.push(row);
        }
        table.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn update(
        &self,
        collection: Collection,
        filters: &[Filter],
        patch: Row,
    ) -> Result<(), DataError> {
        self.check(collection, Operation::Update)?;
        let mut guard = self.rows.lock().unwrap();
        if let Some(table) = guard.get_mut(&collection) {
            for row in table.iter_mut().filter(|row| matches_all(filters, row)) {
                for (k, v) in &patch {
                    row.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, filters: &[Filter]) -> Result<(), DataError> {
        self.check(collection, Operation::Delete)?;
        let mut guard = self.rows.lock().unwrap();
        if let Some(table) = guard.get_mut(&collection) {
            table.retain(|row| !matches_all(filters, row));
        }
        Ok(())
    }
}
