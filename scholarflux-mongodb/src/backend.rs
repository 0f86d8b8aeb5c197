//! MongoDB-backed [`Storage`] implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use scholarflux_backend::entry::CacheEntry;
use scholarflux_backend::{CacheError, DeleteStatus, Storage, StorageResult};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// On-the-wire document shape. Blobs travel as base64 text (via
/// [`CacheEntry::encode_blob`]) rather than raw BSON binary so the schema
/// stays identical across every `scholarflux-*` storage crate.
#[derive(Debug, Serialize, Deserialize)]
struct MongoEntry {
    #[serde(rename = "_id")]
    key: String,
    blob: String,
    response_hash: String,
    stored_at: BsonDateTime,
    expires_at: Option<BsonDateTime>,
}

/// [`Storage`] backed by a MongoDB collection with a native TTL index on
/// `expires_at`, so expired entries are also reaped server-side even if no
/// reader ever touches them again.
pub struct MongoBackend {
    collection: Collection<MongoEntry>,
    label: &'static str,
}

impl MongoBackend {
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, Error> {
        let client = Client::with_uri_str(uri).await?;
        let collection = client.database(database).collection::<MongoEntry>(collection);

        let ttl_index = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(IndexOptions::builder().expire_after(std::time::Duration::from_secs(0)).build())
            .build();
        collection.create_index(ttl_index).await?;

        Ok(Self {
            collection,
            label: "mongodb",
        })
    }

    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }
}

#[async_trait]
impl Storage for MongoBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<CacheEntry>> {
        let found = self
            .collection
            .find_one(doc! { "_id": key })
            .await
            .map_err(|e| CacheError::from(Error::from(e)))?;

        let Some(document) = found else {
            return Ok(None);
        };

        let blob = CacheEntry::decode_blob(&document.blob)?;
        let stored_at: DateTime<Utc> = document.stored_at.into();
        let expires_at: Option<DateTime<Utc>> = document.expires_at.map(Into::into);
        let entry = CacheEntry {
            blob,
            response_hash: document.response_hash,
            stored_at,
            expires_at,
        };

        if entry.is_expired(Utc::now()) {
            self.delete(key).await?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> StorageResult<()> {
        let document = MongoEntry {
            key: key.to_owned(),
            blob: CacheEntry::encode_blob(&entry.blob),
            response_hash: entry.response_hash,
            stored_at: entry.stored_at.into(),
            expires_at: entry.expires_at.map(Into::into),
        };
        self.collection
            .replace_one(doc! { "_id": key }, document)
            .upsert(true)
            .await
            .map_err(|e| CacheError::from(Error::from(e)))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<DeleteStatus> {
        let result = self
            .collection
            .delete_one(doc! { "_id": key })
            .await
            .map_err(|e| CacheError::from(Error::from(e)))?;
        Ok(if result.deleted_count > 0 {
            DeleteStatus::Deleted
        } else {
            DeleteStatus::Missing
        })
    }

    fn label(&self) -> &'static str {
        self.label
    }
}
