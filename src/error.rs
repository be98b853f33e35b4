use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::models::ProgramId;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Custom checklist item limit reached")]
    CapacityExceeded,

    #[error("{0}")]
    InvariantViolation(&'static str),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Checklist sync incomplete: {} updated, {} failed", completed.len(), failed.len())]
    SyncIncomplete {
        completed: Vec<ProgramId>,
        failed: Vec<ProgramId>,
    },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_program_ids: Option<Vec<ProgramId>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, failed_program_ids) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, None),
            AppError::CapacityExceeded => (StatusCode::CONFLICT, None),
            AppError::InvariantViolation(_) => (StatusCode::UNPROCESSABLE_ENTITY, None),
            AppError::Persistence(e) => {
                error!("persistence failure: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, None)
            }
            AppError::Catalog(e) => {
                error!("catalog error: {}", e);
                (StatusCode::BAD_GATEWAY, None)
            }
            AppError::Config(e) => {
                error!("config error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::SyncIncomplete { failed, .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, Some(failed))
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message,
            failed_program_ids,
        });

        (status, body).into_response()
    }
}
