//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_core::{AttemptSummary, RelayError};

use crate::assembler::{ErrorEnvelope, ResultAssembler};

/// Shown with every exhaustion response
pub const EXHAUSTED_MESSAGE: &str = "All methods failed to resolve the request";

const EXHAUSTED_SUGGESTION: &str =
    "The upstream providers are unavailable or returned nothing usable. \
     Check the input and try again in a few minutes.";

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("All methods failed to resolve the request")]
    ProvidersExhausted { attempts: Vec<AttemptSummary> },

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ProvidersExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire form of this error
    pub fn into_envelope(self) -> ErrorEnvelope {
        let message = self.to_string();
        match self {
            AppError::BadRequest(_) => ResultAssembler::error(message),
            AppError::ProvidersExhausted { attempts } => {
                ResultAssembler::exhausted(message, EXHAUSTED_SUGGESTION, attempts)
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ResultAssembler::error("Internal server error")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.into_envelope())).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Validation(msg) => AppError::BadRequest(msg),
            RelayError::AllProvidersExhausted { attempts } => {
                AppError::ProvidersExhausted { attempts }
            }
            RelayError::Config(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            RelayError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::FailureKind;

    #[test]
    fn test_relay_error_mapping() {
        let err = AppError::from(RelayError::Validation("bad".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "bad");

        let err = AppError::from(RelayError::AllProvidersExhausted {
            attempts: vec![AttemptSummary {
                provider: "a".into(),
                outcome: FailureKind::Rejected,
                reason: "HTTP 500".into(),
            }],
        });
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), EXHAUSTED_MESSAGE);

        let err = AppError::from(RelayError::Config("x".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
