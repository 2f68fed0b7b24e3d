//! Public HTTP surface
//!
//! Range CRUD under `/ranges` and a minimal `/health`. Success bodies for
//! writes are plain confirmation strings; failures are JSON
//! [`ErrorResponse`] bodies.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;

pub use error::{status_for, ErrorResponse};
pub use extract::ValidatedRange;
pub use handlers::{ApiState, PublicHealth, RANGE_CREATED, RANGE_DELETED, RANGE_UPDATED};
pub use routes::api_routes;
