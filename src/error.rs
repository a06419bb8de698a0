use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Startup errors raised while loading the catalog and model artifacts
///
/// Any of these aborts initialization; the service never runs on a
/// partially loaded catalog.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed genres on row {row} ({title:?}): {reason}")]
    MalformedGenres {
        row: usize,
        title: String,
        reason: String,
    },

    #[error("Artifact decode error: {0}")]
    Artifact(#[from] serde_json::Error),

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("Encoder and index artifacts do not match: {0}")]
    ArtifactMismatch(String),

    #[error("Catalog contains {count} duplicated titles (e.g. {sample:?})")]
    DuplicateTitles { count: usize, sample: Vec<String> },
}

pub type LoadResult<T> = Result<T, LoadError>;

impl LoadError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
