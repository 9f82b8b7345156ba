use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{
    Batch, Collection, DocRef, Document, DocumentStore, Operation, OrderBy, StoreError, Write,
    sort_documents,
};

type Collections = HashMap<Collection, BTreeMap<String, Document>>;

/// In-process store. Permission denials and lost connections can be
/// injected so callers can exercise their failure paths.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
    denied: Mutex<HashSet<(Collection, Operation)>>,
    fail_commits: AtomicBool,
    last_stamp: Mutex<i64>,
    commits: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deny(&self, collection: Collection, operation: Operation) {
        self.denied.lock().await.insert((collection, operation));
    }

    pub async fn allow_all(&self) {
        self.denied.lock().await.clear();
    }

    /// While set, every commit fails as if the connection dropped.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::Relaxed);
    }

    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .lock()
            .await
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }

    async fn check(&self, target: &DocRef, operation: Operation) -> Result<(), StoreError> {
        if self
            .denied
            .lock()
            .await
            .contains(&(target.collection, operation))
        {
            return Err(StoreError::PermissionDenied {
                path: target.path(),
                operation,
            });
        }

        Ok(())
    }

    async fn check_collection(
        &self,
        collection: Collection,
        operation: Operation,
    ) -> Result<(), StoreError> {
        if self.denied.lock().await.contains(&(collection, operation)) {
            return Err(StoreError::PermissionDenied {
                path: collection.as_str().to_string(),
                operation,
            });
        }

        Ok(())
    }

    // strictly increasing even when two commits share a millisecond
    async fn next_stamp(&self) -> i64 {
        let mut last = self.last_stamp.lock().await;
        let stamp = Utc::now().timestamp_millis().max(*last + 1);
        *last = stamp;
        stamp
    }
}

fn apply(staged: &mut Collections, write: Write, stamp: i64) -> Result<(), StoreError> {
    match write {
        Write::Set {
            target,
            mut data,
            server_timestamp,
        } => {
            if let Some(field) = server_timestamp {
                data.insert(field, Value::from(stamp));
            }
            staged
                .entry(target.collection)
                .or_default()
                .insert(target.id, data);
        }
        Write::Update { target, data } => {
            let existing = staged
                .get_mut(&target.collection)
                .and_then(|documents| documents.get_mut(&target.id))
                .ok_or_else(|| StoreError::NotFound(target.path()))?;
            existing.extend(data);
        }
        Write::Delete { target } => {
            if let Some(documents) = staged.get_mut(&target.collection) {
                documents.remove(&target.id);
            }
        }
    }

    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, target: &DocRef) -> Result<Option<Document>, StoreError> {
        self.check(target, Operation::Get).await?;

        Ok(self
            .collections
            .lock()
            .await
            .get(&target.collection)
            .and_then(|documents| documents.get(&target.id))
            .cloned())
    }

    async fn list(
        &self,
        collection: Collection,
        order: Option<&OrderBy>,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        self.check_collection(collection, Operation::List).await?;

        let mut documents: Vec<(String, Document)> = self
            .collections
            .lock()
            .await
            .get(&collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, document)| (id.clone(), document.clone()))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order {
            sort_documents(&mut documents, order);
        }

        Ok(documents)
    }

    async fn get_many(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<Vec<(String, Document)>, StoreError> {
        self.check_collection(collection, Operation::List).await?;

        let collections = self.collections.lock().await;
        let Some(documents) = collections.get(&collection) else {
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| documents.get(id).map(|doc| (id.clone(), doc.clone())))
            .collect())
    }

    async fn commit(&self, batch: Batch) -> Result<(), StoreError> {
        if self.fail_commits.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("connection lost".to_string()));
        }

        for write in batch.writes() {
            self.check(write.target(), write.operation()).await?;
        }

        let stamp = self.next_stamp().await;
        let mut collections = self.collections.lock().await;

        // all or nothing: apply to a copy, swap on success
        let mut staged = collections.clone();
        for write in batch.into_writes() {
            apply(&mut staged, write, stamp)?;
        }
        *collections = staged;

        self.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
