//! # Document Store
//!
//! Generic keyed documents grouped into named collections.
//!
//! ## Capabilities
//!
//! - Point reads, ordered full-collection listing, batched reads by id
//! - Batches of set/update/delete that apply entirely or not at all
//! - A set may ask the store to stamp one field with the commit time,
//!   epoch milliseconds, never computed by the caller
//!
//! ## Backends
//!
//! - [`memory::MemoryStore`]: in-process, used by tests and local runs
//! - [`database::RedisStore`]: one Redis hash per collection
use std::{cmp::Ordering, fmt};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod database;
pub mod memory;

pub type Document = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Registrations,
    RaffleItems,
    Winners,
    Settings,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Registrations => "registrations",
            Collection::RaffleItems => "raffleItems",
            Collection::Winners => "winners",
            Collection::Settings => "settings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocRef {
    pub collection: Collection,
    pub id: String,
}

impl DocRef {
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.collection.as_str(), self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Get,
    List,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Set {
        target: DocRef,
        data: Document,
        server_timestamp: Option<String>,
    },
    Update {
        target: DocRef,
        data: Document,
    },
    Delete {
        target: DocRef,
    },
}

impl Write {
    pub fn target(&self) -> &DocRef {
        match self {
            Write::Set { target, .. } | Write::Update { target, .. } | Write::Delete { target } => {
                target
            }
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Write::Set { .. } => Operation::Create,
            Write::Update { .. } => Operation::Update,
            Write::Delete { .. } => Operation::Delete,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    writes: Vec<Write>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, target: DocRef, data: Document) -> &mut Self {
        self.writes.push(Write::Set {
            target,
            data,
            server_timestamp: None,
        });
        self
    }

    /// Like [`Batch::set`], with `field` filled by the store at commit.
    pub fn set_stamped(&mut self, target: DocRef, data: Document, field: &str) -> &mut Self {
        self.writes.push(Write::Set {
            target,
            data,
            server_timestamp: Some(field.to_string()),
        });
        self
    }

    pub fn update(&mut self, target: DocRef, data: Document) -> &mut Self {
        self.writes.push(Write::Update { target, data });
        self
    }

    pub fn delete(&mut self, target: DocRef) -> &mut Self {
        self.writes.push(Write::Delete { target });
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("permission denied: {operation} {path}")]
    PermissionDenied { path: String, operation: Operation },

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed document {path}: {reason}")]
    Malformed { path: String, reason: String },
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn get(&self, target: &DocRef) -> Result<Option<Document>, StoreError>;

    async fn list(
        &self,
        collection: Collection,
        order: Option<&OrderBy>,
    ) -> Result<Vec<(String, Document)>, StoreError>;

    /// Documents among `ids` that exist, missing ids are skipped.
    async fn get_many(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<Vec<(String, Document)>, StoreError>;

    async fn commit(&self, batch: Batch) -> Result<(), StoreError>;

    async fn set(&self, target: DocRef, data: Document) -> Result<(), StoreError> {
        let mut batch = Batch::new();
        batch.set(target, data);
        self.commit(batch).await
    }

    async fn update(&self, target: DocRef, data: Document) -> Result<(), StoreError> {
        let mut batch = Batch::new();
        batch.update(target, data);
        self.commit(batch).await
    }

    async fn delete(&self, target: DocRef) -> Result<(), StoreError> {
        let mut batch = Batch::new();
        batch.delete(target);
        self.commit(batch).await
    }
}

pub(crate) fn sort_documents(documents: &mut [(String, Document)], order: &OrderBy) {
    documents.sort_by(|(_, a), (_, b)| {
        let ordering = compare_values(a.get(&order.field), b.get(&order.field));
        match order.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    });
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => {
                let a = a.as_f64().unwrap_or_default();
                let b = b.as_f64().unwrap_or_default();
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
        },
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => rank(a).cmp(&rank(b)),
    }
}
