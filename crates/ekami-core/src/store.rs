//! Record-oriented data store boundary.
//!
//! Rows are JSON objects keyed by a string `"id"` and grouped into named
//! collections. Services talk to the store through [`RecordStore`] and convert
//! rows to domain types with [`to_record`] / [`from_record`].

use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::RwLock,
};

use chrono::DateTime;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::CoreError;

pub type Record = Map<String, Value>;

pub const ID_FIELD: &str = "id";

/// Collection names shared by every backend.
pub mod collections {
    pub const REPAIR_REQUESTS: &str = "repair_requests";
    pub const BLOG_COMMENTS: &str = "blog_comments";
    pub const COMMENT_LIKES: &str = "comment_likes";
    pub const LOYALTY_MEMBERS: &str = "loyalty_members";
    pub const LOYALTY_TRANSACTIONS: &str = "loyalty_transactions";
    pub const NOTIFICATION_OUTBOX: &str = "notification_outbox";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Equality filters plus an optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<(String, Value)>,
    order_by: Option<(String, SortOrder)>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }

    /// Filters, stably orders and truncates `records` according to the query.
    pub fn apply<'a, I>(&self, records: I) -> Vec<Record>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut rows: Vec<Record> = records
            .into_iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect();
        if let Some((field, order)) = &self.order_by {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }
}

/// Result of an idempotent create call.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Created(Record),
    /// A row with the same idempotency key already existed; nothing was written.
    Existing(Record),
}

impl InsertOutcome {
    pub fn record(&self) -> &Record {
        match self {
            InsertOutcome::Created(record) | InsertOutcome::Existing(record) => record,
        }
    }

    pub fn into_record(self) -> Record {
        match self {
            InsertOutcome::Created(record) | InsertOutcome::Existing(record) => record,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, InsertOutcome::Created(_))
    }
}

/// Abstraction over backends that hold named collections of JSON rows.
pub trait RecordStore: Send + Sync {
    fn select(&self, collection: &str, query: &Query) -> Result<Vec<Record>, CoreError>;

    /// Creates a row; the record must carry a unique string `id`.
    fn insert(&self, collection: &str, record: Record) -> Result<Record, CoreError>;

    /// Replaces the row identified by `id`.
    fn update(&self, collection: &str, id: &str, record: Record) -> Result<Record, CoreError>;

    /// Removes the row, returning whether it existed.
    fn delete(&self, collection: &str, id: &str) -> Result<bool, CoreError>;

    fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, CoreError> {
        let query = Query::new().eq(ID_FIELD, id).limit(1);
        Ok(self.select(collection, &query)?.into_iter().next())
    }

    /// Creates the row unless one with the same `key_field == key` exists.
    fn insert_once(
        &self,
        collection: &str,
        key_field: &str,
        key: &str,
        record: Record,
    ) -> Result<InsertOutcome, CoreError> {
        let query = Query::new().eq(key_field, key).limit(1);
        if let Some(existing) = self.select(collection, &query)?.into_iter().next() {
            return Ok(InsertOutcome::Existing(existing));
        }
        self.insert(collection, record).map(InsertOutcome::Created)
    }
}

/// Serializes a domain value into a store row.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, CoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::Serde(format!(
            "expected a JSON object, found `{other}`"
        ))),
    }
}

/// Deserializes a store row into a domain value.
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, CoreError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

pub fn from_records<T: DeserializeOwned>(records: Vec<Record>) -> Result<Vec<T>, CoreError> {
    records.into_iter().map(from_record).collect()
}

/// Returns the string `id` of a row, if present.
pub fn record_id(record: &Record) -> Option<&str> {
    record.get(ID_FIELD).and_then(Value::as_str)
}

/// Orders JSON scalars: RFC 3339 timestamps chronologically, then numbers, then strings.
pub fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

/// Volatile store keeping rows in insertion order per collection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|guard| guard.get(collection).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

fn poisoned() -> CoreError {
    CoreError::Storage("memory store lock poisoned".into())
}

fn push_row(collection: &str, rows: &mut Vec<Record>, record: Record) -> Result<Record, CoreError> {
    let id = record_id(&record)
        .ok_or_else(|| CoreError::Storage(format!("{collection} row is missing an id")))?;
    if rows.iter().any(|row| record_id(row) == Some(id)) {
        return Err(CoreError::Storage(format!(
            "{collection} already contains a row with id {id}"
        )));
    }
    rows.push(record.clone());
    Ok(record)
}

impl RecordStore for MemoryStore {
    fn select(&self, collection: &str, query: &Query) -> Result<Vec<Record>, CoreError> {
        let guard = self.collections.read().map_err(|_| poisoned())?;
        Ok(guard
            .get(collection)
            .map(|rows| query.apply(rows.iter()))
            .unwrap_or_default())
    }

    fn insert(&self, collection: &str, record: Record) -> Result<Record, CoreError> {
        let mut guard = self.collections.write().map_err(|_| poisoned())?;
        let rows = guard.entry(collection.to_string()).or_default();
        push_row(collection, rows, record)
    }

    /// Lookup and insert happen under one write guard.
    fn insert_once(
        &self,
        collection: &str,
        key_field: &str,
        key: &str,
        record: Record,
    ) -> Result<InsertOutcome, CoreError> {
        let mut guard = self.collections.write().map_err(|_| poisoned())?;
        let rows = guard.entry(collection.to_string()).or_default();
        let expected = Value::String(key.to_string());
        if let Some(existing) = rows.iter().find(|row| row.get(key_field) == Some(&expected)) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        push_row(collection, rows, record).map(InsertOutcome::Created)
    }

    fn update(&self, collection: &str, id: &str, record: Record) -> Result<Record, CoreError> {
        let mut guard = self.collections.write().map_err(|_| poisoned())?;
        let slot = guard
            .get_mut(collection)
            .and_then(|rows| rows.iter_mut().find(|row| record_id(row) == Some(id)))
            .ok_or_else(|| CoreError::not_found(collection, id))?;
        *slot = record.clone();
        Ok(record)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool, CoreError> {
        let mut guard = self.collections.write().map_err(|_| poisoned())?;
        let Some(rows) = guard.get_mut(collection) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|row| record_id(row) != Some(id));
        Ok(rows.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    #[test]
    fn select_filters_by_equality_and_orders() {
        let store = MemoryStore::new();
        store
            .insert("cars", row(json!({"id": "a", "make": "Toyota", "year": 2019})))
            .unwrap();
        store
            .insert("cars", row(json!({"id": "b", "make": "Honda", "year": 2021})))
            .unwrap();
        store
            .insert("cars", row(json!({"id": "c", "make": "Toyota", "year": 2015})))
            .unwrap();

        let query = Query::new()
            .eq("make", "Toyota")
            .order_by("year", SortOrder::Ascending);
        let rows = store.select("cars", &query).unwrap();
        let ids: Vec<_> = rows.iter().filter_map(record_id).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let store = MemoryStore::new();
        store.insert("cars", row(json!({"id": "a"}))).unwrap();
        let err = store.insert("cars", row(json!({"id": "a"}))).unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
    }

    #[test]
    fn insert_once_returns_existing_row_for_repeated_key() {
        let store = MemoryStore::new();
        let first = store
            .insert_once("jobs", "key", "k-1", row(json!({"id": "1", "key": "k-1"})))
            .unwrap();
        let second = store
            .insert_once("jobs", "key", "k-1", row(json!({"id": "2", "key": "k-1"})))
            .unwrap();

        assert!(first.was_created());
        assert!(!second.was_created());
        assert_eq!(record_id(second.record()), Some("1"));
        assert_eq!(store.count("jobs"), 1);
    }

    #[test]
    fn concurrent_insert_once_creates_a_single_row() {
        let store = MemoryStore::new();
        let created: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|n| {
                    let store = &store;
                    scope.spawn(move || {
                        store
                            .insert_once(
                                "jobs",
                                "key",
                                "shared",
                                row(json!({"id": format!("row-{n}"), "key": "shared"})),
                            )
                            .unwrap()
                            .was_created()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| usize::from(handle.join().unwrap()))
                .sum()
        });

        assert_eq!(created, 1);
        assert_eq!(store.count("jobs"), 1);
    }

    #[test]
    fn update_and_delete_address_rows_by_id() {
        let store = MemoryStore::new();
        store.insert("cars", row(json!({"id": "a", "km": 1}))).unwrap();
        store
            .update("cars", "a", row(json!({"id": "a", "km": 2})))
            .unwrap();
        let stored = store.get("cars", "a").unwrap().unwrap();
        assert_eq!(stored.get("km"), Some(&json!(2)));

        assert!(store.delete("cars", "a").unwrap());
        assert!(!store.delete("cars", "a").unwrap());
        assert!(matches!(
            store.update("cars", "a", row(json!({"id": "a"}))),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn timestamps_order_chronologically() {
        let earlier = json!("2025-01-01T10:00:00Z");
        let later = json!("2025-01-01T10:00:00.500Z");
        assert_eq!(
            compare_values(Some(&earlier), Some(&later)),
            Ordering::Less
        );
    }
}
