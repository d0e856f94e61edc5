use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised while reading taxonomy files. Apart from `DataDirNotFound`
/// these are per-file: the loader logs them and moves on.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} has no '{column}' column", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{} is empty", .0.display())]
    EmptyFile(PathBuf),

    #[error("no taxonomy directory with CSV files found at {} or its fallbacks", .0.display())]
    DataDirNotFound(PathBuf),

    #[error("no skill or occupation file could be loaded from {}", .0.display())]
    NoConcepts(PathBuf),

    #[error("invalid approved aliases in {}: {source}", .path.display())]
    Aliases {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build term index: {0}")]
    Index(#[from] aho_corasick::BuildError),
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound("skill 'x'".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let response = AppError::Conflict("load running".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_missing_column_message_names_file_and_column() {
        let err = TaxonomyError::MissingColumn {
            path: PathBuf::from("data/esco/skills_de.csv"),
            column: "preferredLabel",
        };
        let msg = err.to_string();
        assert!(msg.contains("skills_de.csv"));
        assert!(msg.contains("preferredLabel"));
    }
}
