//! # Redis
//!
//! Primary document store.
//!
//! ## Layout
//!
//! - One Redis hash per collection: `<prefix>:<collection>`
//! - Hash field is the document id, value is the document as JSON text
//! - Ordered listing is `HGETALL` then an in-process sort, collections are small
//!   (a few thousand registrations at most)
//! - Batched id lookups are a single `HMGET`
//!
//! ## Batches
//!
//! - Writes are staged in process, then sent as one `MULTI`/`EXEC` pipeline
//! - Updates read the current document first, the read is not guarded by `WATCH`
//!   since a multiplexed connection cannot hold one; a single admin writer is assumed
//! - Commit timestamps come from Redis `TIME`
use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use serde_json::Value;
use tracing::debug;

use super::{
    Batch, Collection, DocRef, Document, DocumentStore, Operation, OrderBy, StoreError, Write,
    sort_documents,
};

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, prefix: impl Into<String>) -> Result<Self, StoreError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(100));

        let client = Client::open(redis_url).map_err(unavailable)?;
        let connection = client
            .get_connection_manager_with_config(config)
            .await
            .map_err(unavailable)?;

        Ok(Self::new(connection, prefix))
    }

    pub fn new(connection: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            connection,
            prefix: prefix.into(),
        }
    }

    fn key(&self, collection: Collection) -> String {
        hash_key(&self.prefix, collection)
    }

    async fn server_time(&self) -> Result<i64, StoreError> {
        let mut connection = self.connection.clone();
        let (seconds, micros): (i64, i64) = redis::cmd("TIME")
            .query_async(&mut connection)
            .await
            .map_err(unavailable)?;

        Ok(seconds * 1000 + micros / 1000)
    }

    async fn fetch(
        &self,
        target: &DocRef,
        operation: Operation,
    ) -> Result<Option<Document>, StoreError> {
        let path = target.path();
        let mut connection = self.connection.clone();
        let raw: Option<String> = connection
            .hget(self.key(target.collection), &target.id)
            .await
            .map_err(|e| classify(e, &path, operation))?;

        raw.map(|raw| parse(&path, &raw)).transpose()
    }
}

pub(crate) fn hash_key(prefix: &str, collection: Collection) -> String {
    format!("{prefix}:{}", collection.as_str())
}

fn unavailable(err: RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn classify(err: RedisError, path: &str, operation: Operation) -> StoreError {
    let denied = matches!(err.code(), Some("NOPERM" | "NOAUTH" | "WRONGPASS"))
        || err.kind() == redis::ErrorKind::AuthenticationFailed;

    if denied {
        StoreError::PermissionDenied {
            path: path.to_string(),
            operation,
        }
    } else {
        unavailable(err)
    }
}

fn parse(path: &str, raw: &str) -> Result<Document, StoreError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(StoreError::Malformed {
            path: path.to_string(),
            reason: format!("expected an object, found {other}"),
        }),
        Err(e) => Err(StoreError::Malformed {
            path: path.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    fn backend_tag(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, target: &DocRef) -> Result<Option<Document>, StoreError> {
        self.fetch(target, Operation::Get).await
    }

    async fn list(
        &self,
        collection: Collection,
        order: Option<&OrderBy>,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let mut connection = self.connection.clone();
        let raw: HashMap<String, String> = connection
            .hgetall(self.key(collection))
            .await
            .map_err(|e| classify(e, collection.as_str(), Operation::List))?;

        let mut documents = raw
            .into_iter()
            .map(|(id, raw)| {
                let path = DocRef::new(collection, id.as_str()).path();
                parse(&path, &raw).map(|document| (id, document))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match order {
            Some(order) => sort_documents(&mut documents, order),
            None => documents.sort_by(|(a, _), (b, _)| a.cmp(b)),
        }

        Ok(documents)
    }

    async fn get_many(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<Vec<(String, Document)>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut command = redis::cmd("HMGET");
        command.arg(self.key(collection));
        for id in ids {
            command.arg(id);
        }

        let mut connection = self.connection.clone();
        let raw: Vec<Option<String>> = command
            .query_async(&mut connection)
            .await
            .map_err(|e| classify(e, collection.as_str(), Operation::List))?;

        let mut found: Vec<(String, Document)> = Vec::new();
        for (id, raw) in ids.iter().zip(raw) {
            let Some(raw) = raw else { continue };
            if found.iter().any(|(seen, _)| seen == id) {
                continue;
            }
            let path = DocRef::new(collection, id.as_str()).path();
            found.push((id.clone(), parse(&path, &raw)?));
        }

        Ok(found)
    }

    async fn commit(&self, batch: Batch) -> Result<(), StoreError> {
        let Some(first) = batch.writes().first() else {
            return Ok(());
        };
        let (path, operation) = (first.target().path(), first.operation());

        let needs_stamp = batch
            .writes()
            .iter()
            .any(|write| matches!(write, Write::Set { server_timestamp: Some(_), .. }));
        let stamp = if needs_stamp {
            Some(self.server_time().await?)
        } else {
            None
        };

        // final state per document, None means delete
        let mut staged: BTreeMap<(Collection, String), Option<Document>> = BTreeMap::new();
        for write in batch.into_writes() {
            match write {
                Write::Set {
                    target,
                    mut data,
                    server_timestamp,
                } => {
                    if let (Some(field), Some(stamp)) = (server_timestamp, stamp) {
                        data.insert(field, Value::from(stamp));
                    }
                    staged.insert((target.collection, target.id), Some(data));
                }
                Write::Update { target, data } => {
                    let key = (target.collection, target.id.clone());
                    let current = match staged.get(&key) {
                        Some(current) => current.clone(),
                        None => self.fetch(&target, Operation::Update).await?,
                    };
                    let mut document =
                        current.ok_or_else(|| StoreError::NotFound(target.path()))?;
                    document.extend(data);
                    staged.insert(key, Some(document));
                }
                Write::Delete { target } => {
                    staged.insert((target.collection, target.id), None);
                }
            }
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for ((collection, id), document) in &staged {
            let key = self.key(*collection);
            match document {
                Some(document) => {
                    let json =
                        serde_json::to_string(document).map_err(|e| StoreError::Malformed {
                            path: DocRef::new(*collection, id.as_str()).path(),
                            reason: e.to_string(),
                        })?;
                    pipe.hset(key, id, json).ignore();
                }
                None => {
                    pipe.hdel(key, id).ignore();
                }
            }
        }

        let mut connection = self.connection.clone();
        pipe.query_async::<()>(&mut connection)
            .await
            .map_err(|e| classify(e, &path, operation))?;

        debug!(documents = staged.len(), "batch committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_keys() {
        assert_eq!(hash_key("raffle", Collection::Winners), "raffle:winners");
        assert_eq!(
            hash_key("staging", Collection::RaffleItems),
            "staging:raffleItems"
        );
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(parse("winners/1-a", r#"{"round":1}"#).is_ok());
        assert!(matches!(
            parse("winners/1-a", "[1,2]"),
            Err(StoreError::Malformed { .. })
        ));
        assert!(matches!(
            parse("winners/1-a", "{oops"),
            Err(StoreError::Malformed { .. })
        ));
    }
}
