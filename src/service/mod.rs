//! Service layer for the range service
//!
//! The range service itself, health aggregation, and the application state
//! that wires storage, metrics and listeners together.

pub mod app;
pub mod health;
pub mod ranges;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthContext, HealthStatus};
pub use ranges::{RangeService, DEFAULT_MAX_RANGES_PER_USER};
