//! Error rendering for the public API
//!
//! Every failure leaves the service as `{"error": <kind>, "message": <text>}`
//! with a status code chosen by error kind.

use crate::error::RangeError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error body returned by the range API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Offending field path for validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            field: None,
        }
    }
}

impl From<&RangeError> for ErrorResponse {
    fn from(error: &RangeError) -> Self {
        let field = match error {
            RangeError::Validation(validation) => validation.field().map(str::to_string),
            _ => None,
        };
        Self {
            error: error.kind().to_string(),
            message: error.to_string(),
            field,
        }
    }
}

/// Status code for each error kind
pub fn status_for(error: &RangeError) -> StatusCode {
    match error {
        RangeError::Validation(_) => StatusCode::BAD_REQUEST,
        RangeError::DuplicateKey { .. } => StatusCode::CONFLICT,
        RangeError::QuotaExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RangeError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        RangeError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RangeError {
    fn into_response(self) -> Response {
        (status_for(&self), Json(ErrorResponse::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_validation_maps_to_400_with_field() {
        let error = RangeError::from(ValidationError::InvalidEnumValue {
            field: "handsRange[0].actions[0].type".to_string(),
            token: "shove".to_string(),
        });
        assert_eq!(status_for(&error), StatusCode::BAD_REQUEST);

        let body = ErrorResponse::from(&error);
        assert_eq!(body.error, "validation_failed");
        assert_eq!(body.field.as_deref(), Some("handsRange[0].actions[0].type"));
    }

    #[test]
    fn test_conflicts_and_quota_have_distinct_statuses() {
        let duplicate = RangeError::DuplicateKey {
            name: "BTN open".to_string(),
        };
        let quota = RangeError::QuotaExceeded {
            user_id: "u1".to_string(),
            limit: 10,
        };
        assert_eq!(status_for(&duplicate), StatusCode::CONFLICT);
        assert_eq!(status_for(&quota), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_storage_failure_maps_to_503() {
        let response = RangeError::StorageUnavailable {
            message: "no primary".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_field_is_omitted_when_absent() {
        let json = serde_json::to_value(ErrorResponse::new("internal_error", "boom")).unwrap();
        assert!(json.get("field").is_none());
    }
}
