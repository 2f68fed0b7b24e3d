//! Request body extraction
//!
//! [`ValidatedRange`] reads a JSON body into a [`RangePayload`] and converts
//! it into a domain [`Range`], so handlers only ever see validated ranges.
//! Unreadable bodies and failed validation both reject with a
//! [`RangeError`], which renders as a 400.

use crate::error::{RangeError, ValidationError};
use crate::model::{Range, RangePayload};
use axum::extract::{FromRequest, Request};
use axum::Json;
use std::ops::Deref;
use tracing::debug;

/// A range parsed and validated from the request body
#[derive(Debug)]
pub struct ValidatedRange(pub Range);

impl ValidatedRange {
    pub fn into_inner(self) -> Range {
        self.0
    }
}

impl Deref for ValidatedRange {
    type Target = Range;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequest<S> for ValidatedRange
where
    S: Send + Sync,
{
    type Rejection = RangeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<RangePayload>::from_request(req, state)
            .await
            .map_err(|rejection| {
                debug!("Rejected range body: {}", rejection.body_text());
                ValidationError::MalformedBody {
                    reason: rejection.body_text(),
                }
            })?;

        let range = Range::try_from(payload).inspect_err(|e| {
            debug!("Range payload failed validation: {}", e);
        })?;
        Ok(ValidatedRange(range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/ranges")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_extracts_valid_range() {
        let body = r#"{
            "name": "BTN open",
            "userId": "u1",
            "handsRange": [
                {"rangeFraction": 0.0045, "label": "AA",
                 "actions": [{"type": "RAISE", "percentage": 1.0}]}
            ]
        }"#;

        let ValidatedRange(range) = ValidatedRange::from_request(json_request(body), &())
            .await
            .unwrap();
        assert_eq!(range.name, "BTN open");
        assert_eq!(range.hands_range[0].actions.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let err = ValidatedRange::from_request(json_request("{\"name\": "), &())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RangeError::Validation(ValidationError::MalformedBody { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_rejected() {
        let req = Request::builder()
            .method("POST")
            .uri("/ranges")
            .body(Body::from("{}"))
            .unwrap();
        let err = ValidatedRange::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.kind(), "validation_failed");
    }

    #[tokio::test]
    async fn test_missing_nested_field_reports_path() {
        let body = r#"{
            "name": "BTN open",
            "userId": "u1",
            "handsRange": [{"rangeFraction": 0.1, "label": "AA", "actions": [{"percentage": 1.0}]}]
        }"#;
        let err = ValidatedRange::from_request(json_request(body), &())
            .await
            .unwrap_err();
        match err {
            RangeError::Validation(validation) => {
                assert_eq!(validation.field(), Some("handsRange[0].actions[0].type"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
