//! Document persistence.
//!
//! Every entity is kept as a JSON document in a named collection. The
//! [`DocumentStore`] trait is the only thing the rest of the crate knows
//! about storage; [`Collection`] layers typed access and version-checked
//! writes on top of it.

pub mod collection;
pub mod memory;
pub mod mysql;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use collection::{Collection, Record};
pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document {id} in `{collection}` was modified concurrently")]
    VersionConflict { collection: String, id: u64 },

    #[error("document codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

/// A stored document with its store-assigned identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: u64,
    pub version: u64,
    pub body: Value,
}

/// A single predicate over a dotted field path (`owner.kind`).
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    /// The field is an array holding the value.
    Contains(String, Value),
}

impl Condition {
    pub fn field(&self) -> &str {
        match self {
            Condition::Eq(f, _)
            | Condition::Gte(f, _)
            | Condition::Lte(f, _)
            | Condition::Contains(f, _) => f,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Condition::Eq(_, v)
            | Condition::Gte(_, v)
            | Condition::Lte(_, v)
            | Condition::Contains(_, v) => v,
        }
    }

    fn matches(&self, body: &Value) -> bool {
        let Some(actual) = lookup(body, self.field()) else {
            return false;
        };
        match self {
            Condition::Eq(_, expected) => json_eq(actual, expected),
            Condition::Gte(_, bound) => {
                matches!(compare(actual, bound), Some(Ordering::Greater | Ordering::Equal))
            }
            Condition::Lte(_, bound) => {
                matches!(compare(actual, bound), Some(Ordering::Less | Ordering::Equal))
            }
            Condition::Contains(_, item) => actual
                .as_array()
                .is_some_and(|items| items.iter().any(|v| json_eq(v, item))),
        }
    }
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn gte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Gte(field.to_string(), value.into()));
        self
    }

    pub fn lte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Lte(field.to_string(), value.into()));
        self
    }

    pub fn contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Contains(field.to_string(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn matches(&self, body: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(body))
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError>;

    async fn get(&self, collection: &str, id: u64) -> Result<Option<Document>, StoreError>;

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    /// Overwrites the body when the stored version equals `expected_version`.
    /// `Ok(None)` when the document does not exist,
    /// [`StoreError::VersionConflict`] when someone else wrote first.
    async fn replace(
        &self,
        collection: &str,
        id: u64,
        expected_version: u64,
        body: Value,
    ) -> Result<Option<Document>, StoreError>;

    async fn delete(&self, collection: &str, id: u64) -> Result<Option<Document>, StoreError>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;
}

pub(crate) fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(body, |node, key| node.get(key))
}

/// Ordering used by range filters and sorting: numbers numerically, strings
/// lexicographically (ISO dates and times sort correctly), booleans false
/// before true. Mixed kinds are unordered.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match compare(a, b) {
        Some(ord) => ord == Ordering::Equal,
        None => a == b,
    }
}
