use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::request::RequestDraft;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed ({} errors)", errors.len())]
    Validation {
        errors: Vec<String>,
        draft: RequestDraft,
    },

    #[error("not found")]
    NotFound,

    #[error("invalid decision input: {0}")]
    InvalidDecision(String),

    #[error("decision out of sequence: {0}")]
    NotReady(String),

    #[error("login required")]
    Unauthenticated { login_path: String },

    #[error("invalid credentials")]
    InvalidCredentials(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::InvalidDecision(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::NotReady(_) => StatusCode::CONFLICT,
            AppError::Unauthenticated { .. } => StatusCode::SEE_OTHER,
            AppError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_type, msg) = match &self {
            AppError::Validation { errors, draft } => {
                let body = Json(json!({
                    "error": {
                        "message": "please correct the highlighted fields",
                        "type": "validation_error",
                    },
                    "errors": errors,
                    "draft": draft,
                }));
                return (status, body).into_response();
            }
            AppError::Unauthenticated { login_path } => {
                return Redirect::to(login_path).into_response();
            }
            AppError::NotFound => ("not_found", "not found".to_string()),
            AppError::InvalidDecision(m) => ("invalid_request_error", m.clone()),
            AppError::NotReady(m) => ("conflict_error", m.clone()),
            AppError::InvalidCredentials(m) => ("authentication_error", m.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                ("internal_error", "internal server error".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                ("internal_error", "internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
            }
        }));

        (status, body).into_response()
    }
}
