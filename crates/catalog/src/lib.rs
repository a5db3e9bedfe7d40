//! Seam to the remote persistence service.
//!
//! The service is collection-oriented CRUD over JSON rows. Only the shape of
//! the calls and the error taxonomy are modeled here; `InMemoryRecordStore`
//! stands in for the service in tests and offline tools.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

pub type Record = Map<String, Value>;

pub const UNIQUE_VIOLATION_CODE: &str = "23505";
pub const NOT_FOUND_CODE: &str = "PGRST116";
pub const PERMISSION_DENIED_CODE: &str = "42501";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate value violates unique constraint {constraint}")]
    UniqueViolation { constraint: String },
    #[error("remote error {code}: {message}")]
    Other { code: String, message: String },
}

impl RemoteError {
    /// Maps a service error code to the typed error.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            UNIQUE_VIOLATION_CODE => RemoteError::UniqueViolation {
                constraint: message,
            },
            NOT_FOUND_CODE => RemoteError::NotFound(message),
            PERMISSION_DENIED_CODE => RemoteError::PermissionDenied(message),
            _ => RemoteError::Other {
                code: code.to_string(),
                message,
            },
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            RemoteError::UniqueViolation { .. } => Some(UNIQUE_VIOLATION_CODE),
            RemoteError::NotFound(_) => Some(NOT_FOUND_CODE),
            RemoteError::PermissionDenied(_) => Some(PERMISSION_DENIED_CODE),
            RemoteError::Other { code, .. } => Some(code),
            RemoteError::Network(_) => None,
        }
    }

    /// Text for the UI.
    pub fn user_message(&self) -> String {
        match self {
            RemoteError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            RemoteError::PermissionDenied(_) => {
                "You do not have permission to perform this action.".to_string()
            }
            RemoteError::NotFound(_) => "The requested record was not found.".to_string(),
            RemoteError::UniqueViolation { .. } => {
                "A record with these values already exists.".to_string()
            }
            RemoteError::Other { message, .. } => message.clone(),
        }
    }
}

/// Error payload as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteErrorBody {
    pub code: String,
    pub message: String,
}

impl From<RemoteErrorBody> for RemoteError {
    fn from(body: RemoteErrorBody) -> Self {
        RemoteError::from_code(&body.code, body.message)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Related collection nested into each selected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub collection: String,
    /// Column of the selected row holding the related row's `id`.
    pub foreign_key: String,
}

/// Equality filters, ordering and nested selections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, SortOrder)>,
    pub embeds: Vec<Embed>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((column.into(), order));
        self
    }

    pub fn embed(mut self, collection: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        self.embeds.push(Embed {
            collection: collection.into(),
            foreign_key: foreign_key.into(),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|(column, value)| record.get(column) == Some(value))
    }
}

pub trait RecordStore {
    fn select(&self, collection: &str, query: &Query) -> Result<Vec<Record>, RemoteError>;
    /// Inserts and returns the stored row (with its `id`).
    fn insert(&mut self, collection: &str, record: Record) -> Result<Record, RemoteError>;
    /// Merges `patch` into every matching row; returns how many changed.
    fn update(&mut self, collection: &str, query: &Query, patch: Record)
    -> Result<usize, RemoteError>;
    fn delete(&mut self, collection: &str, query: &Query) -> Result<usize, RemoteError>;
}

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    collections: BTreeMap<String, Vec<Record>>,
    unique: BTreeMap<String, Vec<String>>,
    next_id: u64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects rows that repeat a non-null value of `column`.
    pub fn with_unique(mut self, collection: &str, column: &str) -> Self {
        self.unique
            .entry(collection.to_string())
            .or_default()
            .push(column.to_string());
        self
    }

    /// Loads rows as-is, bypassing constraints.
    pub fn seed(&mut self, collection: &str, rows: impl IntoIterator<Item = Record>) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .extend(rows);
    }

    /// Builds a store from `{ "collection": [rows...] }`.
    pub fn from_json(value: &Value) -> Result<Self, RemoteError> {
        let Some(obj) = value.as_object() else {
            return Err(RemoteError::Other {
                code: "invalid_seed".to_string(),
                message: "expected an object of collections".to_string(),
            });
        };
        let mut store = Self::new();
        for (name, rows) in obj {
            let rows = rows.as_array().into_iter().flatten();
            store.seed(name, rows.filter_map(|r| r.as_object().cloned()));
        }
        Ok(store)
    }

    fn check_unique(
        &self,
        collection: &str,
        candidate: &Record,
        skip_index: Option<usize>,
    ) -> Result<(), RemoteError> {
        let Some(columns) = self.unique.get(collection) else {
            return Ok(());
        };
        let rows = self.collections.get(collection).map_or(&[][..], Vec::as_slice);
        for column in columns {
            let Some(value) = candidate.get(column).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = rows
                .iter()
                .enumerate()
                .any(|(i, r)| Some(i) != skip_index && r.get(column) == Some(value));
            if clash {
                return Err(RemoteError::UniqueViolation {
                    constraint: format!("{collection}_{column}_key"),
                });
            }
        }
        Ok(())
    }

    fn embed_rows(&self, mut row: Record, embeds: &[Embed]) -> Record {
        for embed in embeds {
            let related = row.get(&embed.foreign_key).and_then(|fk| {
                self.collections
                    .get(&embed.collection)?
                    .iter()
                    .find(|r| r.get("id") == Some(fk))
                    .cloned()
            });
            row.insert(
                embed.collection.clone(),
                related.map_or(Value::Null, Value::Object),
            );
        }
        row
    }
}

impl RecordStore for InMemoryRecordStore {
    fn select(&self, collection: &str, query: &Query) -> Result<Vec<Record>, RemoteError> {
        let rows = self.collections.get(collection).map_or(&[][..], Vec::as_slice);
        let mut out: Vec<Record> = rows.iter().filter(|r| query.matches(r)).cloned().collect();
        if let Some((column, order)) = &query.order_by {
            out.sort_by(|a, b| {
                let ord = compare_values(a.get(column), b.get(column));
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        Ok(out
            .into_iter()
            .map(|row| self.embed_rows(row, &query.embeds))
            .collect())
    }

    fn insert(&mut self, collection: &str, mut record: Record) -> Result<Record, RemoteError> {
        if !record.contains_key("id") {
            self.next_id += 1;
            record.insert(
                "id".to_string(),
                Value::String(format!("{collection}-{}", self.next_id)),
            );
        }
        self.check_unique(collection, &record, None)?;
        debug!(collection, "record inserted");
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    fn update(
        &mut self,
        collection: &str,
        query: &Query,
        patch: Record,
    ) -> Result<usize, RemoteError> {
        let targets: Vec<usize> = self
            .collections
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .enumerate()
                    .filter(|(_, r)| query.matches(r))
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default();

        for &i in &targets {
            let mut merged = self.collections[collection][i].clone();
            merged.extend(patch.clone());
            self.check_unique(collection, &merged, Some(i))?;
        }
        if let Some(rows) = self.collections.get_mut(collection) {
            for &i in &targets {
                rows[i].extend(patch.clone());
            }
        }
        Ok(targets.len())
    }

    fn delete(&mut self, collection: &str, query: &Query) -> Result<usize, RemoteError> {
        let Some(rows) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !query.matches(r));
        Ok(before - rows.len())
    }
}

/// Orders JSON scalars: numbers, then strings, then booleans; nulls and
/// missing values last.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            Some(Value::Number(_)) => 0,
            Some(Value::String(_)) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Array(_)) | Some(Value::Object(_)) => 3,
            Some(Value::Null) | None => 4,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
