//! Range persistence
//!
//! [`RangeStore`] abstracts the `ranges` document collection. Backends
//! generate ids on first insert, enforce the unique `name` index and serve
//! lookups by owning user.

pub mod memory;
#[cfg(feature = "mongo")]
pub mod mongo;

use crate::error::Result;
// Aliased: the generated mock module imports `std::ops::Range`
use crate::model::Range as RangeDoc;
use async_trait::async_trait;

pub use memory::InMemoryRangeStore;
#[cfg(feature = "mongo")]
pub use mongo::{MongoRangeStore, MongoStoreConfig};

/// Trait for range storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RangeStore: Send + Sync {
    /// Persist a new document under a freshly generated id.
    ///
    /// Any id already set on `range` is ignored. Fails with
    /// `DuplicateKey` when the name is taken.
    async fn insert(&self, range: RangeDoc) -> Result<RangeDoc>;

    /// Insert only if the owner holds fewer than `limit` ranges.
    ///
    /// The count and the insert happen as one atomic step per backend;
    /// fails with `QuotaExceeded` without creating a document otherwise.
    async fn insert_within_quota(&self, range: RangeDoc, limit: usize) -> Result<RangeDoc>;

    async fn find_by_id(&self, id: &str) -> Result<Option<RangeDoc>>;

    /// Every range, in insertion order
    async fn find_all(&self) -> Result<Vec<RangeDoc>>;

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<RangeDoc>>;

    async fn count_by_user_id(&self, user_id: &str) -> Result<u64>;

    /// Upsert by id; a range without an id is inserted under a new one
    async fn save(&self, range: RangeDoc) -> Result<RangeDoc>;

    /// Delete by id; deleting an unknown id is not an error.
    ///
    /// Returns whether a document was removed.
    async fn delete_by_id(&self, id: &str) -> Result<bool>;
}
