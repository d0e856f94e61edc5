//! Axum route handlers for the taxonomy query interface.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::matcher::{match_occupations, MatchedSkill};
use crate::state::AppState;
use crate::taxonomy::loader::{spawn_loader, LoadReport};
use crate::taxonomy::models::{OccupationConcept, OccupationSkillRelation, SkillConcept};
use crate::taxonomy::store::{LoadState, SnapshotStats};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub text: String,
    #[serde(default)]
    pub include_occupations: bool,
}

#[derive(Debug, Serialize)]
pub struct MatchedOccupation {
    pub uri: String,
    pub preferred_label: String,
    pub matched_term: String,
    pub position: usize,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    /// False while the taxonomy is still loading; matches are then empty.
    pub ready: bool,
    pub matches: Vec<MatchedSkill>,
    pub occupations: Vec<MatchedOccupation>,
}

#[derive(Debug, Deserialize)]
pub struct LabelQuery {
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct OccupationResponse {
    pub occupation: OccupationConcept,
    pub relations: Vec<OccupationSkillRelation>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ready: bool,
    pub load: LoadState,
    pub stats: SnapshotStats,
    pub last_report: Option<LoadReport>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/esco/status
pub async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let store = &state.taxonomy;
    Json(StatusResponse {
        ready: store.is_ready(),
        load: store.state(),
        stats: store.snapshot().stats(),
        last_report: store.last_report(),
    })
}

/// POST /api/v1/esco/match
///
/// Returns the distinct skills mentioned in `text`, blacklisted noise removed.
/// Any text is accepted; an empty one simply has no matches.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Json<MatchResponse> {
    if !state.taxonomy.is_ready() {
        return Json(MatchResponse {
            ready: false,
            matches: vec![],
            occupations: vec![],
        });
    }

    let matches = state
        .taxonomy
        .match_text(&request.text, &state.blacklist.current());

    let occupations = if request.include_occupations {
        match_occupations(&request.text, &state.taxonomy.snapshot())
            .into_iter()
            .map(|m| MatchedOccupation {
                uri: m.occupation.uri.clone(),
                preferred_label: m.occupation.preferred_label.clone(),
                matched_term: m.matched_term.to_string(),
                position: m.position,
            })
            .collect()
    } else {
        vec![]
    };

    Json(MatchResponse {
        ready: true,
        matches,
        occupations,
    })
}

/// GET /api/v1/esco/skills?label=
pub async fn handle_skill_by_label(
    State(state): State<AppState>,
    Query(query): Query<LabelQuery>,
) -> Result<Json<SkillConcept>, AppError> {
    if query.label.trim().is_empty() {
        return Err(AppError::Validation("label cannot be empty".to_string()));
    }

    state
        .taxonomy
        .lookup_skill_by_label(&query.label)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No skill labelled '{}'", query.label)))
}

/// GET /api/v1/esco/occupations?label=
///
/// Returns the occupation together with its essential/optional skill relations.
pub async fn handle_occupation_by_label(
    State(state): State<AppState>,
    Query(query): Query<LabelQuery>,
) -> Result<Json<OccupationResponse>, AppError> {
    if query.label.trim().is_empty() {
        return Err(AppError::Validation("label cannot be empty".to_string()));
    }

    let snapshot = state.taxonomy.snapshot();
    let occupation = snapshot
        .lookup_occupation_by_label(&query.label)
        .ok_or_else(|| AppError::NotFound(format!("No occupation labelled '{}'", query.label)))?;

    Ok(Json(OccupationResponse {
        occupation: occupation.clone(),
        relations: snapshot.relations_for_occupation(&occupation.uri).to_vec(),
    }))
}

/// POST /api/v1/esco/reload
///
/// Rebuilds the taxonomy in the background. The current snapshot keeps serving
/// until the new one is complete.
pub async fn handle_reload(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    match spawn_loader(state.taxonomy.clone(), state.config.loader_settings()) {
        Some(_) => Ok(StatusCode::ACCEPTED),
        None => Err(AppError::Conflict(
            "A taxonomy load is already running".to_string(),
        )),
    }
}
