//! Error types shared across the crate, plus their HTTP rendering.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A student record rejected at the data-access boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("student {id}: {field} must be a finite number")]
    NotFinite { id: i64, field: &'static str },

    #[error("student {id}: {field} is {value}, expected 0-100")]
    OutOfRange {
        id: i64,
        field: &'static str,
        value: f64,
    },

    #[error("student {id}: {field} value {value:?} is not a number")]
    NotNumeric {
        id: i64,
        field: &'static str,
        value: String,
    },

    #[error("student {id}: name is empty")]
    EmptyName { id: i64 },

    #[error("student id {id} appears more than once")]
    DuplicateId { id: i64 },
}

impl ValidationError {
    pub fn record_id(&self) -> i64 {
        match self {
            ValidationError::NotFinite { id, .. }
            | ValidationError::OutOfRange { id, .. }
            | ValidationError::NotNumeric { id, .. }
            | ValidationError::EmptyName { id }
            | ValidationError::DuplicateId { id } => *id,
        }
    }
}

/// Failure while loading student records from disk.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported student file format: {0} (expected .csv or .json)")]
    UnsupportedFormat(PathBuf),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("student store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of the narrative generator. Never fatal for a request.
#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    #[error("cannot connect to narrative service at {0}")]
    Connect(String),

    #[error("narrative request timed out after {0}s")]
    Timeout(u64),

    #[error("narrative service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("narrative request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("narrative service returned an empty response")]
    EmptyResponse,
}

/// JSON error body returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Student not found")]
    StudentNotFound(i64),

    #[error("invalid student record")]
    Validation(#[from] ValidationError),

    #[error("student store error")]
    Repository(#[from] RepositoryError),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::StudentNotFound(_) => "NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Repository(_) => "REPOSITORY_ERROR",
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::StudentNotFound(id) => Some(format!("id={id}")),
            ApiError::Validation(e) => Some(e.to_string()),
            ApiError::Repository(e) => Some(e.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::StudentNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Repository(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
            details: self.details(),
        })
    }
}
