//! Range Vault - storage service for poker ranges
//!
//! Stores named ranges (hand buckets mapped to weighted actions) per user
//! behind a small HTTP API, with a per-user quota and a storage health
//! probe. Ranges live in MongoDB or, for local runs and tests, in memory.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod metrics;
pub mod model;
pub mod service;
pub mod store;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RangeError, Result, ValidationError};
pub use health::{ComponentStatus, StorageHealth, StorageProbe};
pub use model::{Action, ActionType, Card, CardSuit, CardValue, HandRange, Range, RangeId};

// Re-export key components
pub use service::RangeService;
pub use store::{InMemoryRangeStore, RangeStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
