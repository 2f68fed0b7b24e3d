//! HTTP handlers for the range API and the public health check

use crate::error::RangeError;
use crate::health::{ComponentStatus, StorageProbe};
use crate::http::extract::ValidatedRange;
use crate::model::Range;
use crate::service::RangeService;
use crate::utils::timestamp_string;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub const RANGE_CREATED: &str = "Range created successfully";
pub const RANGE_UPDATED: &str = "Range updated successfully";
pub const RANGE_DELETED: &str = "Range deleted successfully";

/// Shared state for the public router
#[derive(Clone)]
pub struct ApiState {
    pub ranges: RangeService,
    pub probe: Arc<dyn StorageProbe>,
    pub service_name: String,
}

impl ApiState {
    pub fn new(
        ranges: RangeService,
        probe: Arc<dyn StorageProbe>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            ranges,
            probe,
            service_name: service_name.into(),
        }
    }
}

/// Body of the public health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicHealth {
    pub status: ComponentStatus,
    pub timestamp: String,
    pub service: String,
}

/// GET /ranges
pub async fn list_ranges(State(state): State<ApiState>) -> Result<Json<Vec<Range>>, RangeError> {
    Ok(Json(state.ranges.get_all_ranges().await?))
}

/// GET /ranges/user/{userId}
pub async fn list_user_ranges(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Range>>, RangeError> {
    Ok(Json(state.ranges.get_ranges_by_user_id(&user_id).await?))
}

/// GET /ranges/{id}; an unknown id answers `null`
pub async fn get_range(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Option<Range>>, RangeError> {
    Ok(Json(state.ranges.get_range_by_id(&id).await?))
}

/// POST /ranges
pub async fn create_range(
    State(state): State<ApiState>,
    ValidatedRange(range): ValidatedRange,
) -> Result<&'static str, RangeError> {
    state.ranges.save_range(range).await?;
    Ok(RANGE_CREATED)
}

/// PUT /ranges/{id}
pub async fn update_range(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ValidatedRange(range): ValidatedRange,
) -> Result<&'static str, RangeError> {
    state.ranges.update_range(&id, range).await?;
    Ok(RANGE_UPDATED)
}

/// DELETE /ranges/{id}
pub async fn delete_range(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<&'static str, RangeError> {
    state.ranges.delete_range(&id).await?;
    Ok(RANGE_DELETED)
}

/// GET /health
///
/// Always 200. Storage details stay in the logs and on the admin listener.
pub async fn public_health(State(state): State<ApiState>) -> Json<PublicHealth> {
    let report = state.probe.check_health().await;
    if report.status.is_up() {
        debug!("Storage health: {:?}", report);
    } else {
        warn!("Storage health: {:?}", report);
    }

    Json(PublicHealth {
        status: report.status,
        timestamp: timestamp_string(),
        service: state.service_name.clone(),
    })
}
