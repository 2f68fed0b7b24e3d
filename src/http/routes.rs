//! Router for the public listener

use crate::http::handlers::{
    create_range, delete_range, get_range, list_ranges, list_user_ranges, public_health,
    update_range, ApiState,
};
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Range API plus the minimal health check
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/ranges", get(list_ranges).post(create_range))
        .route("/ranges/user/{user_id}", get(list_user_ranges))
        .route(
            "/ranges/{id}",
            get(get_range).put(update_range).delete(delete_range),
        )
        .route("/health", get(public_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
