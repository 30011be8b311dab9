// Resource adapter
//
// CRUD over the backend's collections. Each collection lives at
// `{collection}/` and each entity at `{collection}/{key}/`. All methods
// return `Err` only for pre-flight failures; HTTP outcomes are folded into
// the return value (`None`, `false`) and logged.

use std::sync::Arc;

use strum::IntoEnumIterator;
use tracing::{debug, warn};

use crate::codec::{Codec, JsonCodec, Payload};
use crate::error::Error;
use crate::record::Record;
use crate::transaction::{Method, Transaction, TransactionExecutor};

/// A REST collection and the field that keys its entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum Collection {
    Device,
    User,
    Publication,
    Subscription,
}

impl Collection {
    /// Path segment of the collection.
    pub fn name(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::User => "user",
            Self::Publication => "publication",
            Self::Subscription => "subscription",
        }
    }

    /// Record field that carries the entity key.
    pub fn key_field(self) -> &'static str {
        match self {
            Self::Device => "dev_id",
            Self::User => "user_id",
            Self::Publication => "pub_id",
            Self::Subscription => "sub_id",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::iter().find(|c| c.name() == name)
    }

    fn collection_path(self) -> String {
        format!("{}/", self.name())
    }

    fn entity_path(self, key: &str) -> String {
        format!("{}/{key}/", self.name())
    }

    fn key_of(self, record: &Record) -> Result<&str, Error> {
        record.get(self.key_field()).ok_or_else(|| Error::MissingKey {
            field: self.key_field().to_owned(),
        })
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// CRUD adapter over a shared [`TransactionExecutor`].
pub struct ResourceAdapter<C: Codec = JsonCodec> {
    executor: Arc<TransactionExecutor<C>>,
}

impl<C: Codec> Clone for ResourceAdapter<C> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<C: Codec> ResourceAdapter<C> {
    pub fn new(executor: Arc<TransactionExecutor<C>>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<TransactionExecutor<C>> {
        &self.executor
    }

    // ── Create ───────────────────────────────────────────────────────

    /// `POST {collection}/`. Returns the created entity on HTTP 200.
    pub async fn create(
        &self,
        collection: Collection,
        record: &Record,
    ) -> Result<Option<Record>, Error> {
        let txn = self
            .executor
            .execute(Method::Post, &collection.collection_path(), Some(record))
            .await?;
        Ok(single(txn))
    }

    // ── Read ─────────────────────────────────────────────────────────

    /// `GET {collection}/{key}/`.
    pub async fn read(&self, collection: Collection, key: &str) -> Result<Option<Record>, Error> {
        let txn = self
            .executor
            .execute(Method::Get, &collection.entity_path(key), None)
            .await?;
        Ok(single(txn))
    }

    /// `GET {collection}/`. `None` unless the body is an array of objects.
    pub async fn read_all(&self, collection: Collection) -> Result<Option<Vec<Record>>, Error> {
        let txn = self
            .executor
            .execute(Method::Get, &collection.collection_path(), None)
            .await?;
        if !txn.is_ok() {
            debug!(status = txn.status_code(), %collection, "read_all failed");
            return Ok(None);
        }
        match txn.into_response_body() {
            Some(payload @ Payload::Array(_)) => {
                let records = payload.into_records();
                if records.is_none() {
                    warn!(%collection, "collection contained non-object elements");
                }
                Ok(records)
            }
            Some(_) => {
                warn!(%collection, "expected an array body");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    // ── Update ───────────────────────────────────────────────────────

    /// `PUT {collection}/{key}/`, keyed by the record's own key field.
    ///
    /// Fire-and-forget: the outcome is logged, not returned.
    pub async fn update(&self, collection: Collection, record: &Record) -> Result<(), Error> {
        let key = collection.key_of(record)?;
        let txn = self
            .executor
            .execute(Method::Put, &collection.entity_path(key), Some(record))
            .await?;
        if !txn.is_ok() {
            warn!(status = txn.status_code(), %collection, key, "update failed");
        }
        Ok(())
    }

    // ── Delete ───────────────────────────────────────────────────────

    /// `DELETE {collection}/{key}/`. `true` on HTTP 200.
    pub async fn delete(&self, collection: Collection, key: &str) -> Result<bool, Error> {
        let txn = self
            .executor
            .execute(Method::Delete, &collection.entity_path(key), None)
            .await?;
        Ok(txn.is_ok())
    }

    /// Delete the entity a record refers to.
    pub async fn delete_record(&self, collection: Collection, record: &Record) -> Result<bool, Error> {
        let key = collection.key_of(record)?;
        self.delete(collection, key).await
    }

    /// `DELETE {collection}/`. `true` on HTTP 200.
    pub async fn delete_all(&self, collection: Collection) -> Result<bool, Error> {
        let txn = self
            .executor
            .execute(Method::Delete, &collection.collection_path(), None)
            .await?;
        Ok(txn.is_ok())
    }

    // ── Messaging ────────────────────────────────────────────────────

    /// `POST {collection}/{key}/message/` with the record as the body.
    pub async fn message(
        &self,
        collection: Collection,
        record: &Record,
    ) -> Result<Option<Record>, Error> {
        let key = collection.key_of(record)?;
        let path = format!("{}message/", collection.entity_path(key));
        let txn = self
            .executor
            .execute(Method::Post, &path, Some(record))
            .await?;
        Ok(single(txn))
    }
}

fn single(txn: Transaction) -> Option<Record> {
    if !txn.is_ok() {
        debug!(status = txn.status_code(), path = txn.path(), "request not OK");
        return None;
    }
    txn.into_response_body().and_then(Payload::into_object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_paths() {
        assert_eq!(Collection::Device.collection_path(), "device/");
        assert_eq!(Collection::User.entity_path("42"), "user/42/");
        assert_eq!(Collection::from_name("subscription"), Some(Collection::Subscription));
        assert_eq!(Collection::from_name("devices"), None);
    }

    #[test]
    fn key_of_requires_key_field() {
        let rec = Record::new().with("name", "x");
        assert!(matches!(
            Collection::Publication.key_of(&rec),
            Err(Error::MissingKey { field }) if field == "pub_id"
        ));
        let rec = rec.with("pub_id", "p1");
        assert_eq!(Collection::Publication.key_of(&rec).ok(), Some("p1"));
    }
}
