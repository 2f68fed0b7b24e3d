//! Range service
//!
//! Sits between the HTTP surface and the [`RangeStore`]: validates ranges,
//! applies the per-user quota on creation and records write metrics.

use crate::error::{RangeError, Result};
use crate::metrics::MetricsCollector;
use crate::model::Range;
use crate::store::RangeStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ranges a single user may own when quota enforcement is on
pub const DEFAULT_MAX_RANGES_PER_USER: usize = 10;

/// Range CRUD with quota enforcement
#[derive(Clone)]
pub struct RangeService {
    store: Arc<dyn RangeStore>,
    /// `None` disables quota enforcement entirely
    quota: Option<usize>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl RangeService {
    pub fn new(store: Arc<dyn RangeStore>, quota: Option<usize>) -> Self {
        Self {
            store,
            quota,
            metrics: None,
        }
    }

    /// Service enforcing the default quota
    pub fn with_default_quota(store: Arc<dyn RangeStore>) -> Self {
        Self::new(store, Some(DEFAULT_MAX_RANGES_PER_USER))
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Active per-user limit, if any
    pub fn quota_limit(&self) -> Option<usize> {
        self.quota
    }

    /// Create a new range.
    ///
    /// Any id on the incoming range is discarded; the store assigns one.
    /// With quota enforcement on, the owner's count and the insert happen
    /// atomically in the store.
    pub async fn save_range(&self, range: Range) -> Result<Range> {
        let timer = self.metrics.as_ref().map(|m| m.start_timer());

        if let Err(e) = range.validate() {
            return Err(self.rejected("save_range", e.into()));
        }

        let result = match self.quota {
            Some(limit) => self.store.insert_within_quota(range, limit).await,
            None => self.store.insert(range).await,
        };

        if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
            metrics.record_operation("save_range", timer.stop());
        }

        match result {
            Ok(saved) => {
                info!(
                    "Created range '{}' ({}) for user '{}'",
                    saved.name,
                    saved.id.as_deref().unwrap_or_default(),
                    saved.user_id
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_range_created();
                }
                Ok(saved)
            }
            Err(e) => Err(self.rejected("save_range", e)),
        }
    }

    pub async fn get_range(&self, id: &str) -> Result<Option<Range>> {
        debug!("Looking up range {}", id);
        self.store.find_by_id(id).await
    }

    /// Alias of [`RangeService::get_range`]
    pub async fn get_range_by_id(&self, id: &str) -> Result<Option<Range>> {
        self.get_range(id).await
    }

    pub async fn get_all_ranges(&self) -> Result<Vec<Range>> {
        let ranges = self.store.find_all().await?;
        debug!("Listed {} ranges", ranges.len());
        Ok(ranges)
    }

    pub async fn get_ranges_by_user_id(&self, user_id: &str) -> Result<Vec<Range>> {
        let ranges = self.store.find_by_user_id(user_id).await?;
        debug!("Listed {} ranges for user '{}'", ranges.len(), user_id);
        Ok(ranges)
    }

    /// Replace a range in full, last writer wins.
    ///
    /// A range without an id takes the path id. A range carrying a
    /// different id is saved under its own id. Updates never count against
    /// the quota, even when the save ends up inserting.
    pub async fn update_range(&self, id: &str, mut range: Range) -> Result<Range> {
        if let Err(e) = range.validate() {
            return Err(self.rejected("update_range", e.into()));
        }

        match range.id.as_deref() {
            None => range.id = Some(id.to_string()),
            Some(body_id) if body_id != id => {
                warn!(
                    "Update for range {} carries id {}; saving under the body id",
                    id, body_id
                );
            }
            Some(_) => {}
        }

        match self.store.save(range).await {
            Ok(saved) => {
                info!(
                    "Updated range '{}' ({})",
                    saved.name,
                    saved.id.as_deref().unwrap_or_default()
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_range_updated();
                }
                Ok(saved)
            }
            Err(e) => Err(self.rejected("update_range", e)),
        }
    }

    /// Delete by id; unknown ids are not an error
    pub async fn delete_range(&self, id: &str) -> Result<()> {
        let removed = self
            .store
            .delete_by_id(id)
            .await
            .map_err(|e| self.rejected("delete_range", e))?;

        if removed {
            info!("Deleted range {}", id);
            if let Some(metrics) = &self.metrics {
                metrics.record_range_deleted();
            }
        } else {
            debug!("Delete of unknown range {} ignored", id);
        }
        Ok(())
    }

    fn rejected(&self, operation: &str, error: RangeError) -> RangeError {
        match &error {
            RangeError::StorageUnavailable { .. } | RangeError::InternalError { .. } => {
                tracing::error!("{} failed: {}", operation, error)
            }
            _ => warn!("{} rejected: {}", operation, error),
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_rejection(error.kind());
        }
        error
    }
}
