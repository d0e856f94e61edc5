pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analytics::handlers as analytics;
use crate::state::AppState;
use crate::taxonomy::handlers as taxonomy;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Taxonomy query interface
        .route("/api/v1/esco/status", get(taxonomy::handle_status))
        .route("/api/v1/esco/match", post(taxonomy::handle_match))
        .route("/api/v1/esco/skills", get(taxonomy::handle_skill_by_label))
        .route(
            "/api/v1/esco/occupations",
            get(taxonomy::handle_occupation_by_label),
        )
        .route("/api/v1/esco/reload", post(taxonomy::handle_reload))
        // Analytics
        .route(
            "/api/v1/esco/digital-share",
            post(analytics::handle_digital_share),
        )
        .route(
            "/api/v1/esco/blacklist",
            get(analytics::handle_get_blacklist).put(analytics::handle_replace_blacklist),
        )
        .with_state(state)
}
