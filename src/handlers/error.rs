use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::identity::SeedError;
use crate::token::IssueError;

/// Errors surfaced by the HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "server_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let description = match self {
            Self::Internal(e) => {
                log::error!("Request failed: {e:#}");
                "An internal server error occurred".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "error_description": description,
        }))
    }
}

impl From<IssueError> for AppError {
    fn from(err: IssueError) -> Self {
        Self::Internal(anyhow::Error::new(err).context("failed to issue remember-me token"))
    }
}

impl From<SeedError> for AppError {
    fn from(err: SeedError) -> Self {
        match err {
            SeedError::NotFound(identity_id) => Self::NotFound(format!("identity '{identity_id}'")),
            SeedError::Store(_) => Self::Internal(anyhow::Error::new(err)),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        Self::Internal(anyhow::anyhow!("blocking task failed: {err}"))
    }
}
