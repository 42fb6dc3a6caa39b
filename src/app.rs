use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::path::Path;
use tower_http::{cors::CorsLayer, services::ServeDir};

pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/tribe-count", get(handlers::get_tribe_count))
        .route("/api/follow", post(handlers::follow))
        .route("/api/check-follower", post(handlers::check_follower))
        .route("/api/add-follower", post(handlers::add_follower))
        .route("/api/contact", post(handlers::contact))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
