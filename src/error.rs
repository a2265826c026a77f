use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Errors from encoding or decoding stored point geometries
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Cannot encode point: {0}")]
    Encoding(String),

    #[error("Cannot decode point: {0}")]
    Decoding(String),
}

/// Errors raised by a store implementation
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLx error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Geometry error: {0}")]
    Geo(#[from] GeoError),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Errors surfaced to callers of the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl EngineError {
    fn label(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "Validation failed",
            EngineError::Storage(_) => "Storage failure",
        }
    }
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.label().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}
