use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the controllers. Every variant renders the same
/// `{ success: false, message }` body; only the message and status differ.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Auth(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    /// Unknown and expired reset tokens share this variant.
    #[error("Reset token is invalid or has expired")]
    InvalidResetToken,

    #[error("{message}")]
    Dependency {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unable to send the password reset email")]
    Mail(#[source] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn dependency(message: &'static str, source: impl Into<anyhow::Error>) -> Self {
        AppError::Dependency {
            message,
            source: source.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidResetToken => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Dependency { .. } | AppError::Mail(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Uniform `{ success, message }` envelope used for both outcomes.
#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Dependency { message, source } => {
                error!(error = ?source, "{message}");
            }
            AppError::Mail(source) => {
                error!(error = ?source, "reset email dispatch failed");
            }
            _ => {}
        }
        let status = self.status_code();
        (status, Json(ApiMessage::failure(self.to_string()))).into_response()
    }
}
