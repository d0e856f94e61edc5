//! Axum route handlers for blacklist maintenance and the digital-share metric.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::analytics::blacklist::SkillBlacklist;
use crate::analytics::digital_share::calculate_digital_share;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DigitalShareRequest {
    pub labels: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DigitalShareResponse {
    pub ready: bool,
    /// Percentage 0–100 of digital skills among the valid labels.
    pub digital_share: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BlacklistBody {
    pub terms: Vec<String>,
}

/// POST /api/v1/esco/digital-share
pub async fn handle_digital_share(
    State(state): State<AppState>,
    Json(request): Json<DigitalShareRequest>,
) -> Json<DigitalShareResponse> {
    let snapshot = state.taxonomy.snapshot();
    let blacklist = state.blacklist.current();

    Json(DigitalShareResponse {
        ready: state.taxonomy.is_ready(),
        digital_share: calculate_digital_share(&request.labels, &blacklist, &snapshot),
    })
}

/// GET /api/v1/esco/blacklist
pub async fn handle_get_blacklist(State(state): State<AppState>) -> Json<BlacklistBody> {
    Json(BlacklistBody {
        terms: state.blacklist.current().terms(),
    })
}

/// PUT /api/v1/esco/blacklist
///
/// Replaces the whole set; called by the rule store when its entries change.
pub async fn handle_replace_blacklist(
    State(state): State<AppState>,
    Json(body): Json<BlacklistBody>,
) -> Json<BlacklistBody> {
    let blacklist = SkillBlacklist::new(&body.terms);
    tracing::info!("Skill blacklist replaced: {} terms", blacklist.len());
    let terms = blacklist.terms();
    state.blacklist.replace(blacklist);
    Json(BlacklistBody { terms })
}
