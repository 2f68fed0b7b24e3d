//! Test fixtures and stub implementations for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use range_vault::error::{RangeError, Result};
use range_vault::health::{StorageHealth, StorageProbe};
use range_vault::http::{api_routes, ApiState};
use range_vault::model::Range;
use range_vault::service::RangeService;
use range_vault::store::{InMemoryRangeStore, RangeStore};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Store whose every operation fails as if the server were unreachable
#[derive(Debug, Default)]
pub struct UnreachableStore {
    calls: AtomicUsize,
}

impl UnreachableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RangeError::StorageUnavailable {
            message: "Server selection timeout: No available servers".to_string(),
        })
    }
}

#[async_trait]
impl RangeStore for UnreachableStore {
    async fn insert(&self, _range: Range) -> Result<Range> {
        self.fail()
    }

    async fn insert_within_quota(&self, _range: Range, _limit: usize) -> Result<Range> {
        self.fail()
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<Range>> {
        self.fail()
    }

    async fn find_all(&self) -> Result<Vec<Range>> {
        self.fail()
    }

    async fn find_by_user_id(&self, _user_id: &str) -> Result<Vec<Range>> {
        self.fail()
    }

    async fn count_by_user_id(&self, _user_id: &str) -> Result<u64> {
        self.fail()
    }

    async fn save(&self, _range: Range) -> Result<Range> {
        self.fail()
    }

    async fn delete_by_id(&self, _id: &str) -> Result<bool> {
        self.fail()
    }
}

#[async_trait]
impl StorageProbe for UnreachableStore {
    async fn check_health(&self) -> StorageHealth {
        StorageHealth::down("vision", "Server selection timeout: No available servers")
    }
}

/// Router over a fresh in-memory store with the given quota
pub fn memory_app(quota: Option<usize>) -> (Router, Arc<InMemoryRangeStore>) {
    let store = Arc::new(InMemoryRangeStore::new());
    let service = RangeService::new(store.clone(), quota);
    let app = api_routes(ApiState::new(service, store.clone(), "vision"));
    (app, store)
}

/// Router whose store is unreachable
pub fn unreachable_app() -> (Router, Arc<UnreachableStore>) {
    let store = Arc::new(UnreachableStore::new());
    let service = RangeService::with_default_quota(store.clone());
    let app = api_routes(ApiState::new(service, store.clone(), "vision"));
    (app, store)
}

/// Request body for a small two-bucket range
pub fn range_body(name: &str, user_id: &str) -> Value {
    json!({
        "name": name,
        "userId": user_id,
        "handsRange": [
            {
                "rangeFraction": 0.0045,
                "label": "AA",
                "actions": [{"type": "raise", "percentage": 1.0}]
            },
            {
                "rangeFraction": 0.012,
                "label": "AKs",
                "actions": [
                    {"type": "raise", "percentage": 0.7},
                    {"type": "call", "percentage": 0.3}
                ]
            }
        ]
    })
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
