use crate::services::import::error::ImportError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Import(#[from] ImportError),
}

impl AppError {
    fn internal() -> (StatusCode, &'static str, String, Option<&'static str>) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL",
            "Internal Server Error".to_string(),
            None,
        )
    }
}

fn import_status(error: &ImportError) -> StatusCode {
    match error {
        ImportError::MissingFile
        | ImportError::EmptyFile
        | ImportError::InvalidSessionId
        | ImportError::InvalidRequest(_)
        | ImportError::TooManyRows { .. } => StatusCode::BAD_REQUEST,
        ImportError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ImportError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ImportError::Unparseable { .. } | ImportError::NoValidRecords(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ImportError::SessionConflict(_) => StatusCode::CONFLICT,
        ImportError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, suggestion) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                AppError::internal()
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg, None)
            }
            AppError::Import(ImportError::Internal(msg)) => {
                tracing::error!("Import internal error: {}", msg);
                AppError::internal()
            }
            AppError::Import(e) => {
                tracing::warn!("Import rejected: {}", e);
                let suggestion = match &e {
                    ImportError::Unparseable { suggestion, .. } => Some(*suggestion),
                    _ => None,
                };
                (import_status(&e), e.code(), e.to_string(), suggestion)
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(suggestion) = suggestion {
            body["suggestion"] = json!(suggestion);
        }

        (status, Json(body)).into_response()
    }
}
