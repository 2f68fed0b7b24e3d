//! In-memory range store
//!
//! Keeps every document behind a single `RwLock`, so uniqueness checks and
//! quota counts are taken in the same critical section as the write they
//! guard.

use crate::error::{RangeError, Result};
use crate::health::{StorageHealth, StorageProbe};
use crate::model::{Range, RangeId};
use crate::store::RangeStore;
use crate::utils::generate_range_id;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

#[derive(Debug)]
struct StoredDocument {
    seq: u64,
    range: Range,
}

#[derive(Debug, Default)]
struct Collection {
    documents: HashMap<RangeId, StoredDocument>,
    /// Unique index: name -> id
    names: HashMap<String, RangeId>,
    next_seq: u64,
}

impl Collection {
    fn check_name_free(&self, name: &str, id: &str) -> Result<()> {
        match self.names.get(name) {
            Some(owner) if owner != id => Err(RangeError::DuplicateKey {
                name: name.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn count_owned_by(&self, user_id: &str) -> usize {
        self.documents
            .values()
            .filter(|doc| doc.range.user_id == user_id)
            .count()
    }

    fn put(&mut self, range: Range) -> Result<Range> {
        let id = match &range.id {
            Some(id) => id.clone(),
            None => generate_range_id(),
        };
        self.check_name_free(&range.name, &id)?;

        let seq = match self.documents.get(&id) {
            Some(existing) => {
                self.names.remove(&existing.range.name);
                existing.seq
            }
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };

        let stored = Range {
            id: Some(id.clone()),
            ..range
        };
        self.names.insert(stored.name.clone(), id.clone());
        self.documents.insert(
            id,
            StoredDocument {
                seq,
                range: stored.clone(),
            },
        );
        Ok(stored)
    }

    fn sorted<'a>(docs: impl Iterator<Item = &'a StoredDocument>) -> Vec<Range> {
        let mut docs: Vec<_> = docs.collect();
        docs.sort_by_key(|doc| doc.seq);
        docs.into_iter().map(|doc| doc.range.clone()).collect()
    }
}

/// In-memory range store implementation
#[derive(Debug, Default)]
pub struct InMemoryRangeStore {
    collection: RwLock<Collection>,
}

impl InMemoryRangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> Result<usize> {
        let collection = self
            .collection
            .read()
            .map_err(|_| RangeError::lock_poisoned("ranges read"))?;
        Ok(collection.documents.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl RangeStore for InMemoryRangeStore {
    async fn insert(&self, mut range: Range) -> Result<Range> {
        range.id = None;
        let mut collection = self
            .collection
            .write()
            .map_err(|_| RangeError::lock_poisoned("ranges write"))?;

        let stored = collection.put(range)?;
        debug!("Inserted range '{}' ({:?})", stored.name, stored.id);
        Ok(stored)
    }

    async fn insert_within_quota(&self, mut range: Range, limit: usize) -> Result<Range> {
        range.id = None;
        let mut collection = self
            .collection
            .write()
            .map_err(|_| RangeError::lock_poisoned("ranges write"))?;

        if collection.count_owned_by(&range.user_id) >= limit {
            return Err(RangeError::QuotaExceeded {
                user_id: range.user_id,
                limit,
            });
        }

        let stored = collection.put(range)?;
        debug!("Inserted range '{}' ({:?}) within quota", stored.name, stored.id);
        Ok(stored)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Range>> {
        let collection = self
            .collection
            .read()
            .map_err(|_| RangeError::lock_poisoned("ranges read"))?;

        Ok(collection.documents.get(id).map(|doc| doc.range.clone()))
    }

    async fn find_all(&self) -> Result<Vec<Range>> {
        let collection = self
            .collection
            .read()
            .map_err(|_| RangeError::lock_poisoned("ranges read"))?;

        Ok(Collection::sorted(collection.documents.values()))
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Range>> {
        let collection = self
            .collection
            .read()
            .map_err(|_| RangeError::lock_poisoned("ranges read"))?;

        Ok(Collection::sorted(
            collection
                .documents
                .values()
                .filter(|doc| doc.range.user_id == user_id),
        ))
    }

    async fn count_by_user_id(&self, user_id: &str) -> Result<u64> {
        let collection = self
            .collection
            .read()
            .map_err(|_| RangeError::lock_poisoned("ranges read"))?;

        Ok(collection.count_owned_by(user_id) as u64)
    }

    async fn save(&self, range: Range) -> Result<Range> {
        let mut collection = self
            .collection
            .write()
            .map_err(|_| RangeError::lock_poisoned("ranges write"))?;

        let stored = collection.put(range)?;
        debug!("Saved range '{}' ({:?})", stored.name, stored.id);
        Ok(stored)
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let mut collection = self
            .collection
            .write()
            .map_err(|_| RangeError::lock_poisoned("ranges write"))?;

        match collection.documents.remove(id) {
            Some(doc) => {
                collection.names.remove(&doc.range.name);
                debug!("Deleted range '{}' ({})", doc.range.name, id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl StorageProbe for InMemoryRangeStore {
    async fn check_health(&self) -> StorageHealth {
        match self.len() {
            Ok(objects) => StorageHealth::up("memory", Some(1), Some(objects as i64)),
            Err(e) => StorageHealth::down("memory", e.to_string()),
        }
    }
}
