//! MongoDB range store
//!
//! Documents live in the `ranges` collection with the shape
//! `{_id, name, hands_range, user_id}`. A unique index on `name` backs the
//! duplicate check, an index on `user_id` backs owner lookups, and the
//! per-user quota is held in `range_quotas` as `{_id: user_id, count}`
//! documents bumped with a conditional `$inc`.

use crate::error::{RangeError, Result, ValidationError};
use crate::health::{StorageHealth, StorageProbe};
use crate::model::{HandRange, Range};
use crate::store::RangeStore;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

const DUPLICATE_KEY_CODE: i32 = 11000;
const RANGES_COLLECTION: &str = "ranges";
const QUOTAS_COLLECTION: &str = "range_quotas";

/// Connection settings for the MongoDB backend
#[derive(Debug, Clone)]
pub struct MongoStoreConfig {
    pub uri: String,
    pub database: String,
    pub app_name: String,
    pub connect_timeout: Duration,
    pub server_selection_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for MongoStoreConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "vision".to_string(),
            app_name: "range-vault".to_string(),
            connect_timeout: Duration::from_secs(10),
            server_selection_timeout: Duration::from_secs(10),
            max_retries: 5,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// Persisted form of a range
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RangeDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    hands_range: Vec<HandRange>,
    user_id: String,
}

impl RangeDocument {
    fn from_range(range: Range, id: ObjectId) -> Self {
        Self {
            id,
            name: range.name,
            hands_range: range.hands_range,
            user_id: range.user_id,
        }
    }
}

impl From<RangeDocument> for Range {
    fn from(doc: RangeDocument) -> Self {
        Range {
            id: Some(doc.id.to_hex()),
            name: doc.name,
            hands_range: doc.hands_range,
            user_id: doc.user_id,
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

fn storage_error(operation: &str, err: mongodb::error::Error) -> RangeError {
    error!("MongoDB {} failed: {}", operation, err);
    RangeError::StorageUnavailable {
        message: format!("{} failed: {}", operation, err),
    }
}

/// Ids that are not valid ObjectIds cannot match any document
fn parse_object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

/// Read a dbStats counter that the server may report as 32-bit, 64-bit or double
fn stat_value(stats: &Document, key: &str) -> Option<i64> {
    match stats.get(key)? {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) => Some(*v as i64),
        _ => None,
    }
}

/// MongoDB-backed range store
#[derive(Debug, Clone)]
pub struct MongoRangeStore {
    database: Database,
    ranges: Collection<RangeDocument>,
    quotas: Collection<Document>,
    config: MongoStoreConfig,
}

impl MongoRangeStore {
    /// Connect with retry and make sure the indexes exist
    pub async fn connect(config: MongoStoreConfig) -> Result<Self> {
        let client = Self::connect_with_retry(&config).await?;
        let store = Self::from_client(&client, config);
        store.ensure_indexes().await?;
        store.reconcile_quotas().await?;
        Ok(store)
    }

    /// Build a store on top of an existing client without touching the server
    pub fn from_client(client: &Client, config: MongoStoreConfig) -> Self {
        let database = client.database(&config.database);
        Self {
            ranges: database.collection(RANGES_COLLECTION),
            quotas: database.collection(QUOTAS_COLLECTION),
            database,
            config,
        }
    }

    async fn connect_with_retry(config: &MongoStoreConfig) -> Result<Client> {
        let mut retry_count = 0;
        let mut delay = config.retry_delay;

        loop {
            match Self::try_connect(config).await {
                Ok(client) => {
                    info!("Successfully connected to MongoDB database '{}'", config.database);
                    return Ok(client);
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > config.max_retries {
                        error!("Failed to connect to MongoDB after {} retries", config.max_retries);
                        return Err(RangeError::StorageUnavailable {
                            message: format!("Max retries exceeded: {}", e),
                        });
                    }

                    warn!(
                        "MongoDB connection attempt {} failed: {}. Retrying in {:?}",
                        retry_count, e, delay
                    );

                    sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(30));
                }
            }
        }
    }

    async fn try_connect(config: &MongoStoreConfig) -> std::result::Result<Client, mongodb::error::Error> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = Some(config.app_name.clone());
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.server_selection_timeout);

        let client = Client::with_options(options)?;
        client
            .database(&config.database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(client)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let unique_name = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let by_user = IndexModel::builder().keys(doc! { "user_id": 1 }).build();

        self.ranges
            .create_index(unique_name)
            .await
            .map_err(|e| storage_error("create name index", e))?;
        self.ranges
            .create_index(by_user)
            .await
            .map_err(|e| storage_error("create user_id index", e))?;

        debug!("Range indexes ensured on '{}'", RANGES_COLLECTION);
        Ok(())
    }

    /// Reset every quota counter to the number of ranges the user owns.
    ///
    /// Covers documents written before counters existed, writes from other
    /// clients and counter adjustments that failed after a committed write.
    /// Counters of users who no longer own any range are removed.
    pub async fn reconcile_quotas(&self) -> Result<()> {
        let pipeline = vec![doc! { "$group": { "_id": "$user_id", "count": { "$sum": 1_i64 } } }];
        let mut owners = self
            .ranges
            .aggregate(pipeline)
            .await
            .map_err(|e| storage_error("aggregate owners", e))?;

        let mut reconciled: Vec<Bson> = Vec::new();
        while let Some(owner) = owners
            .try_next()
            .await
            .map_err(|e| storage_error("read owners", e))?
        {
            let (Some(user_id), Some(count)) = (owner.get("_id"), stat_value(&owner, "count")) else {
                continue;
            };
            self.quotas
                .update_one(
                    doc! { "_id": user_id.clone() },
                    doc! { "$set": { "count": count } },
                )
                .upsert(true)
                .await
                .map_err(|e| storage_error("reconcile quota counter", e))?;
            reconciled.push(user_id.clone());
        }

        let owner_count = reconciled.len();
        let orphans = self
            .quotas
            .delete_many(doc! { "_id": { "$nin": reconciled } })
            .await
            .map_err(|e| storage_error("remove orphaned quota counters", e))?;

        info!(
            "Reconciled quota counters for {} users, removed {} orphaned counters",
            owner_count, orphans.deleted_count
        );
        Ok(())
    }

    async fn insert_document(&self, range: Range) -> Result<Range> {
        let name = range.name.clone();
        let document = RangeDocument::from_range(range, ObjectId::new());

        match self.ranges.insert_one(&document).await {
            Ok(_) => {
                debug!("Inserted range '{}' ({})", document.name, document.id);
                Ok(document.into())
            }
            Err(e) if is_duplicate_key(&e) => Err(RangeError::DuplicateKey { name }),
            Err(e) => Err(storage_error("insert", e)),
        }
    }

    /// Claim one quota slot for `user_id`.
    ///
    /// The filter only matches while `count < limit`. When it matches nothing
    /// the upsert collides with an existing counter and the server reports a
    /// duplicate key: either the user is at the limit, or a concurrent first
    /// save created the counter. A second update without upsert tells the two
    /// apart.
    async fn reserve_slot(&self, user_id: &str, limit: usize) -> Result<bool> {
        let limit = limit as i64;
        let filter = doc! { "_id": user_id, "count": { "$lt": limit } };
        let update = doc! { "$inc": { "count": 1_i64 } };

        match self
            .quotas
            .update_one(filter.clone(), update.clone())
            .upsert(true)
            .await
        {
            Ok(_) => return Ok(true),
            Err(e) if is_duplicate_key(&e) => {}
            Err(e) => return Err(storage_error("reserve quota slot", e)),
        }

        let retried = self
            .quotas
            .update_one(filter, update)
            .await
            .map_err(|e| storage_error("reserve quota slot", e))?;
        Ok(retried.matched_count > 0)
    }

    /// Move a counter after its document write has committed.
    ///
    /// Failures are logged only: the write stands and the counter is
    /// repaired by [`Self::reconcile_quotas`] on the next startup.
    async fn adjust_quota(&self, user_id: &str, delta: i64) {
        if let Err(e) = self
            .quotas
            .update_one(doc! { "_id": user_id }, doc! { "$inc": { "count": delta } })
            .upsert(delta > 0)
            .await
        {
            warn!(
                "Failed to adjust quota counter for '{}' by {}: {}",
                user_id, delta, e
            );
        }
    }

    /// Current counter value, absent when the user has no counter document
    pub async fn quota_count(&self, user_id: &str) -> Result<Option<i64>> {
        let counter = self
            .quotas
            .find_one(doc! { "_id": user_id })
            .await
            .map_err(|e| storage_error("read quota counter", e))?;
        Ok(counter.and_then(|c| stat_value(&c, "count")))
    }

    async fn find_document(&self, id: &ObjectId) -> Result<Option<RangeDocument>> {
        self.ranges
            .find_one(doc! { "_id": *id })
            .await
            .map_err(|e| storage_error("find by id", e))
    }

    async fn collect(&self, filter: Document) -> Result<Vec<Range>> {
        let cursor = self
            .ranges
            .find(filter)
            .await
            .map_err(|e| storage_error("find", e))?;
        let documents: Vec<RangeDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| storage_error("read cursor", e))?;
        Ok(documents.into_iter().map(Range::from).collect())
    }

    async fn probe_once(&self) -> std::result::Result<Document, mongodb::error::Error> {
        self.database.run_command(doc! { "dbStats": 1 }).await
    }
}

#[async_trait]
impl RangeStore for MongoRangeStore {
    async fn insert(&self, range: Range) -> Result<Range> {
        let user_id = range.user_id.clone();
        let stored = self.insert_document(range).await?;
        self.adjust_quota(&user_id, 1).await;
        Ok(stored)
    }

    async fn insert_within_quota(&self, range: Range, limit: usize) -> Result<Range> {
        let user_id = range.user_id.clone();
        if !self.reserve_slot(&user_id, limit).await? {
            return Err(RangeError::QuotaExceeded { user_id, limit });
        }

        match self.insert_document(range).await {
            Ok(stored) => Ok(stored),
            Err(e) => {
                self.adjust_quota(&user_id, -1).await;
                Err(e)
            }
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Range>> {
        let Some(object_id) = parse_object_id(id) else {
            return Ok(None);
        };
        Ok(self.find_document(&object_id).await?.map(Range::from))
    }

    async fn find_all(&self) -> Result<Vec<Range>> {
        self.collect(doc! {}).await
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Range>> {
        self.collect(doc! { "user_id": user_id }).await
    }

    async fn count_by_user_id(&self, user_id: &str) -> Result<u64> {
        self.ranges
            .count_documents(doc! { "user_id": user_id })
            .await
            .map_err(|e| storage_error("count", e))
    }

    async fn save(&self, range: Range) -> Result<Range> {
        let object_id = match range.id.as_deref() {
            None => return self.insert(range).await,
            Some(id) => parse_object_id(id).ok_or_else(|| {
                RangeError::from(ValidationError::InvalidId { id: id.to_string() })
            })?,
        };

        let previous_owner = self
            .find_document(&object_id)
            .await?
            .map(|existing| existing.user_id);

        let name = range.name.clone();
        let user_id = range.user_id.clone();
        let document = RangeDocument::from_range(range, object_id);

        match self
            .ranges
            .replace_one(doc! { "_id": object_id }, &document)
            .upsert(true)
            .await
        {
            Ok(_) => {}
            Err(e) if is_duplicate_key(&e) => return Err(RangeError::DuplicateKey { name }),
            Err(e) => return Err(storage_error("replace", e)),
        }

        match previous_owner {
            Some(owner) if owner == user_id => {}
            Some(owner) => {
                self.adjust_quota(&owner, -1).await;
                self.adjust_quota(&user_id, 1).await;
            }
            None => self.adjust_quota(&user_id, 1).await,
        }

        debug!("Saved range '{}' ({})", document.name, document.id);
        Ok(document.into())
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let Some(object_id) = parse_object_id(id) else {
            return Ok(false);
        };

        let removed = self
            .ranges
            .find_one_and_delete(doc! { "_id": object_id })
            .await
            .map_err(|e| storage_error("delete", e))?;

        match removed {
            Some(document) => {
                self.adjust_quota(&document.user_id, -1).await;
                debug!("Deleted range '{}' ({})", document.name, id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl StorageProbe for MongoRangeStore {
    async fn check_health(&self) -> StorageHealth {
        let database = self.database.name().to_string();
        let mut attempt = 0;
        let mut delay = self.config.retry_delay;

        loop {
            match self.probe_once().await {
                Ok(stats) => {
                    debug!("MongoDB connectivity check successful");
                    return StorageHealth::up(
                        database,
                        stat_value(&stats, "collections"),
                        stat_value(&stats, "objects"),
                    );
                }
                Err(e) if attempt < self.config.max_retries.min(2) => {
                    attempt += 1;
                    warn!("MongoDB health probe attempt {} failed: {}", attempt, e);
                    sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    error!("MongoDB connectivity check failed: {}", e);
                    return StorageHealth::down(database, e.to_string());
                }
            }
        }
    }
}
