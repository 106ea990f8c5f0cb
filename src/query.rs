//! Remote query seam.
//!
//! The handler talks to the tracking service through one call,
//! [`QueryClient::find_one`]. [`MemoryQuery`] is an in-process store with the
//! same semantics, used by tests and the command-line driver.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::entity::EntityRef;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Query backend error: {0}")]
    Backend(String),
}

/// One record returned by the service: named fields as JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style setter, mostly for fixtures.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn id(&self) -> Option<u64> {
        self.get("id").and_then(Value::as_u64)
    }

    /// Nested string field, e.g. `path.local_path`.
    pub fn get_nested_str(&self, key: &str, sub: &str) -> Option<&str> {
        self.get(key)?.get(sub)?.as_str()
    }

    /// Copy of this record restricted to `fields` (plus `type` and `id`).
    pub fn project(&self, fields: &[&str]) -> Record {
        let mut out = Map::new();
        for key in ["type", "id"].iter().chain(fields) {
            if let Some(v) = self.0.get(*key) {
                out.insert((*key).to_string(), v.clone());
            }
        }
        Record(out)
    }
}

/// `[field, "is", value]` filter, all filters combined with AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn is(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `field is <entity link>`.
    pub fn is_entity(field: impl Into<String>, entity: EntityRef) -> Self {
        Self::is(field, entity_link(entity))
    }
}

/// Link value the service uses to point at an entity.
pub fn entity_link(entity: EntityRef) -> Value {
    serde_json::json!({ "type": entity.kind.as_str(), "id": entity.id })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: Direction,
}

impl SortSpec {
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }
}

/// Narrow view of the tracking service API.
pub trait QueryClient {
    /// First record of `entity_type` matching all `filters`, with `fields`
    /// populated, after applying `order`.
    fn find_one(
        &self,
        entity_type: &str,
        filters: &[Filter],
        fields: &[&str],
        order: Option<&[SortSpec]>,
    ) -> Result<Option<Record>, QueryError>;
}

/// In-memory record store keyed by entity type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryQuery {
    tables: HashMap<String, Vec<Record>>,
}

impl MemoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; `type` is filled in from `entity_type`.
    pub fn insert(&mut self, entity_type: &str, record: Record) {
        let record = record.with("type", entity_type);
        self.tables.entry(entity_type.to_string()).or_default().push(record);
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load `{ "<EntityType>": [ {record}, ... ], ... }` from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read records from {}", path.display()))?;
        let mut store: MemoryQuery = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse records in {}", path.display()))?;

        for (entity_type, records) in store.tables.iter_mut() {
            for record in records.iter_mut() {
                record.0.insert("type".into(), Value::String(entity_type.clone()));
            }
        }
        debug!("Loaded {} record(s) from {}", store.len(), path.display());
        Ok(store)
    }
}

fn filter_matches(record: &Record, filter: &Filter) -> bool {
    let value = record.0.get(&filter.field).unwrap_or(&Value::Null);
    match (value, &filter.value) {
        // Entity links compare by type and id only
        (Value::Object(a), Value::Object(b)) => {
            a.get("type") == b.get("type") && a.get("id") == b.get("id")
        }
        (a, b) => a == b,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        // Missing values sort first
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

impl QueryClient for MemoryQuery {
    fn find_one(
        &self,
        entity_type: &str,
        filters: &[Filter],
        fields: &[&str],
        order: Option<&[SortSpec]>,
    ) -> Result<Option<Record>, QueryError> {
        let Some(table) = self.tables.get(entity_type) else {
            trace!("No {} records in store", entity_type);
            return Ok(None);
        };

        let mut hits: Vec<&Record> = table
            .iter()
            .filter(|r| filters.iter().all(|f| filter_matches(r, f)))
            .collect();

        if let Some(order) = order {
            // Stable sort keeps insertion order among ties
            hits.sort_by(|a, b| {
                order
                    .iter()
                    .map(|spec| {
                        let ord = compare_values(a.0.get(&spec.column), b.0.get(&spec.column));
                        match spec.direction {
                            Direction::Asc => ord,
                            Direction::Desc => ord.reverse(),
                        }
                    })
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        Ok(hits.first().map(|r| r.project(fields)))
    }
}
