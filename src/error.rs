use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retrieval::VectorError;
use crate::services::rag::RagError;
use crate::services::session::SessionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_message = match self {
            AppError::BadRequest(ref e) => e.clone(),
            AppError::NotFound(ref e) => e.clone(),
            AppError::Conflict(ref e) => e.clone(),
            AppError::Io(ref e) => {
                tracing::error!("IO error: {:?}", e);
                "IO error".to_string()
            }
            AppError::ExternalServiceError(ref e) => {
                tracing::error!("External service error: {}", e);
                e.clone()
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                e.clone()
            }
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            detail: error_message,
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<VectorError> for AppError {
    fn from(err: VectorError) -> Self {
        match err {
            VectorError::Embedding(e) => AppError::ExternalServiceError(e.to_string()),
            VectorError::DimensionMismatch { .. } => {
                AppError::Conflict(format!("{}. Rebuild the index.", err))
            }
            VectorError::CollectionNotFound(name) => {
                AppError::NotFound(format!("Collection not found: {}", name))
            }
            VectorError::Storage(e) => AppError::Io(e),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoIndex(message) => AppError::Conflict(message),
            SessionError::EmptyQuestion | SessionError::InvalidUpload(_) => {
                AppError::BadRequest(err.to_string())
            }
            SessionError::Io(e) => AppError::Io(e),
            SessionError::Index(e) => e.into(),
            SessionError::Rag(RagError::Retrieval(e)) => e.into(),
            SessionError::Rag(RagError::Generation(e)) => {
                AppError::ExternalServiceError(e.to_string())
            }
            SessionError::Chunking(_) | SessionError::Join(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::embeddings::EmbeddingError;
    use crate::services::llm::LlmError;

    #[test]
    fn test_status_codes() {
        let cases: Vec<(AppError, StatusCode)> = vec![
            (SessionError::EmptyQuestion.into(), StatusCode::BAD_REQUEST),
            (
                SessionError::NoIndex("No documents found.".to_string()).into(),
                StatusCode::CONFLICT,
            ),
            (
                SessionError::Index(VectorError::Embedding(EmbeddingError::ApiError(
                    "down".to_string(),
                )))
                .into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                SessionError::Rag(RagError::Generation(LlmError::Request("down".to_string())))
                    .into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                SessionError::Join("cancelled".to_string()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{}", error);
        }
    }

    #[test]
    fn test_no_index_message_is_passed_through() {
        let error: AppError = SessionError::NoIndex("No documents found.".to_string()).into();
        assert_eq!(error.to_string(), "Conflict: No documents found.");
        assert_eq!(error.error_response().status(), StatusCode::CONFLICT);
    }
}
