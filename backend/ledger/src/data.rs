use std::{collections::HashSet, sync::Arc};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::error;

use crate::{
    diagnostics::{DiagnosticObserver, LogObserver, PermissionDiagnostic},
    error::LedgerError,
    models::{
        NewWinner, RaffleItem, RaffleItemPatch, Registration, RegistrationStatus, Winner,
    },
    raffle::RaffleSnapshot,
    store::{Batch, Collection, DocRef, Document, DocumentStore, OrderBy, StoreError},
};

const REGISTRATION_SETTINGS: &str = "registration";

/// Typed access to the document store. Every store failure goes through
/// [`Ledger::fail`], which turns permission denials into diagnostics.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn DocumentStore>,
    observer: Arc<dyn DiagnosticObserver>,
}

impl Ledger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DiagnosticObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn backend_tag(&self) -> &'static str {
        self.store.backend_tag()
    }

    fn fail(&self, err: StoreError, request_resource_data: Option<Value>) -> LedgerError {
        match err {
            StoreError::PermissionDenied { path, operation } => {
                let diagnostic = PermissionDiagnostic {
                    path,
                    operation,
                    request_resource_data,
                };
                self.observer.permission_denied(&diagnostic);
                LedgerError::Permission(diagnostic)
            }
            StoreError::NotFound(path) => LedgerError::NotFound(path),
            other => {
                error!(backend = self.backend_tag(), "Store failure: {other}");
                LedgerError::Store(other)
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, target: DocRef) -> Result<Option<T>, LedgerError> {
        let document = self
            .store
            .get(&target)
            .await
            .map_err(|e| self.fail(e, None))?;

        document
            .map(|document| decode(target.collection, target.id, document))
            .transpose()
    }

    async fn fetch_all<T: DeserializeOwned>(
        &self,
        collection: Collection,
        order: OrderBy,
    ) -> Result<Vec<T>, LedgerError> {
        self.store
            .list(collection, Some(&order))
            .await
            .map_err(|e| self.fail(e, None))?
            .into_iter()
            .map(|(id, document)| decode(collection, id, document))
            .collect()
    }

    async fn commit(&self, batch: Batch, request: Value) -> Result<(), LedgerError> {
        self.store
            .commit(batch)
            .await
            .map_err(|e| self.fail(e, Some(request)))
    }

    pub async fn registration(&self, email: &str) -> Result<Option<Registration>, LedgerError> {
        self.fetch(DocRef::new(Collection::Registrations, email))
            .await
    }

    /// Newest first.
    pub async fn registrations(&self) -> Result<Vec<Registration>, LedgerError> {
        self.fetch_all(Collection::Registrations, OrderBy::desc("createdAt"))
            .await
    }

    pub async fn add_registration(&self, full_name: &str, email: &str) -> Result<(), LedgerError> {
        let mut document = Document::new();
        document.insert("fullName".into(), full_name.into());
        document.insert("email".into(), email.into());
        let request = Value::Object(document.clone());

        let mut batch = Batch::new();
        batch.set_stamped(
            DocRef::new(Collection::Registrations, email),
            document,
            "createdAt",
        );
        self.commit(batch, request).await
    }

    pub async fn raffle_item(&self, id: &str) -> Result<Option<RaffleItem>, LedgerError> {
        self.fetch(DocRef::new(Collection::RaffleItems, id)).await
    }

    /// Ordered by name.
    pub async fn raffle_items(&self) -> Result<Vec<RaffleItem>, LedgerError> {
        self.fetch_all(Collection::RaffleItems, OrderBy::asc("name"))
            .await
    }

    /// Which of `ids` are already in the catalog, in one store round trip.
    pub async fn existing_item_ids(&self, ids: &[String]) -> Result<HashSet<String>, LedgerError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let found = self
            .store
            .get_many(Collection::RaffleItems, ids)
            .await
            .map_err(|e| self.fail(e, None))?;

        Ok(found.into_iter().map(|(id, _)| id).collect())
    }

    pub async fn add_raffle_item(&self, item: &RaffleItem) -> Result<(), LedgerError> {
        self.add_raffle_items(std::slice::from_ref(item)).await
    }

    /// All items in a single batch.
    pub async fn add_raffle_items(&self, items: &[RaffleItem]) -> Result<(), LedgerError> {
        let mut batch = Batch::new();
        for item in items {
            batch.set(
                DocRef::new(Collection::RaffleItems, item.id.as_str()),
                item_document(item),
            );
        }

        let request = serde_json::to_value(items).unwrap_or(Value::Null);
        self.commit(batch, request).await
    }

    pub async fn update_raffle_item(
        &self,
        id: &str,
        patch: &RaffleItemPatch,
    ) -> Result<(), LedgerError> {
        let mut document = Document::new();
        if let Some(name) = &patch.name {
            document.insert("name".into(), name.as_str().into());
        }
        if let Some(description) = &patch.description {
            document.insert("description".into(), description.as_str().into());
        }
        if let Some(prize_type) = patch.prize_type {
            document.insert("prizeType".into(), prize_type.as_str().into());
        }
        let request = Value::Object(document.clone());

        let mut batch = Batch::new();
        batch.update(DocRef::new(Collection::RaffleItems, id), document);
        self.commit(batch, request).await
    }

    pub async fn delete_raffle_item(&self, id: &str) -> Result<(), LedgerError> {
        self.store
            .delete(DocRef::new(Collection::RaffleItems, id))
            .await
            .map_err(|e| self.fail(e, None))
    }

    /// Newest confirmation first.
    pub async fn winners(&self) -> Result<Vec<Winner>, LedgerError> {
        self.fetch_all(Collection::Winners, OrderBy::desc("confirmedAt"))
            .await
    }

    /// One atomic batch, `confirmedAt` stamped by the store.
    pub async fn add_winners(&self, winners: &[NewWinner]) -> Result<(), LedgerError> {
        let mut batch = Batch::new();
        for winner in winners {
            let mut document = Document::new();
            document.insert("registrationId".into(), winner.registration_id.as_str().into());
            document.insert("fullName".into(), winner.full_name.as_str().into());
            document.insert("prizeId".into(), winner.prize_id.as_str().into());
            document.insert("prizeName".into(), winner.prize_name.as_str().into());
            document.insert("prizeType".into(), winner.prize_type.as_str().into());
            document.insert("round".into(), winner.round.into());

            batch.set_stamped(
                DocRef::new(Collection::Winners, winner.id()),
                document,
                "confirmedAt",
            );
        }

        let request = serde_json::to_value(winners).unwrap_or(Value::Null);
        self.commit(batch, request).await
    }

    /// Open unless an admin closed it.
    pub async fn registration_status(&self) -> Result<RegistrationStatus, LedgerError> {
        let target = DocRef::new(Collection::Settings, REGISTRATION_SETTINGS);
        let document = self
            .store
            .get(&target)
            .await
            .map_err(|e| self.fail(e, None))?;

        let is_open = document
            .as_ref()
            .and_then(|document| document.get("isOpen"))
            .and_then(Value::as_bool)
            .unwrap_or(true);

        Ok(RegistrationStatus { is_open })
    }

    pub async fn set_registration_status(&self, is_open: bool) -> Result<(), LedgerError> {
        let mut document = Document::new();
        document.insert("isOpen".into(), is_open.into());
        let request = Value::Object(document.clone());

        let mut batch = Batch::new();
        batch.set(
            DocRef::new(Collection::Settings, REGISTRATION_SETTINGS),
            document,
        );
        self.commit(batch, request).await
    }

    /// Registrations, catalog and winners fetched together.
    pub async fn snapshot(&self) -> Result<RaffleSnapshot, LedgerError> {
        let (registrations, items, winners) =
            tokio::try_join!(self.registrations(), self.raffle_items(), self.winners())?;

        Ok(RaffleSnapshot {
            registrations,
            items,
            winners,
        })
    }
}

fn item_document(item: &RaffleItem) -> Document {
    let mut document = Document::new();
    document.insert("name".into(), item.name.as_str().into());
    document.insert("description".into(), item.description.as_str().into());
    document.insert("prizeType".into(), item.prize_type.as_str().into());
    document
}

fn decode<T: DeserializeOwned>(
    collection: Collection,
    id: String,
    mut document: Document,
) -> Result<T, LedgerError> {
    let path = DocRef::new(collection, id.as_str()).path();
    document.insert("id".into(), Value::String(id));

    serde_json::from_value(Value::Object(document))
        .map_err(|source| LedgerError::Decode { path, source })
}
