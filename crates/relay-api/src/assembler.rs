//! Response envelopes
//!
//! Every answer leaves the API in one of two shapes:
//! `{status: "success", data, meta}` or `{status: "error", message, ...}`.
//! Offline results that never went through a provider chain carry no `meta`.
//!
//! Author: hephaex@gmail.com

use std::time::Duration;

use chrono::{DateTime, Utc};
use relay_chain::ChainSuccess;
use relay_core::{AttemptSummary, Query};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const STATUS_SUCCESS: &str = "success";
const STATUS_ERROR: &str = "error";

/// Request metadata attached to a successful answer
#[derive(Debug, Clone, Serialize)]
pub struct ResponseMeta {
    pub request_id: Uuid,
    pub query: Query,
    pub provider: String,
    /// Providers called, including the one that answered
    pub attempts: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<AttemptSummary>,
    pub elapsed_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope<T> {
    pub status: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptSummary>,
}

/// Builds the outbound envelopes
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn success<T>(query: &Query, success: ChainSuccess<T>, elapsed: Duration) -> SuccessEnvelope<T> {
        SuccessEnvelope {
            status: STATUS_SUCCESS.to_string(),
            data: success.record,
            meta: Some(ResponseMeta {
                request_id: Uuid::new_v4(),
                query: query.clone(),
                provider: success.provider,
                attempts: success.attempts,
                failures: success.failures,
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                timestamp: Utc::now(),
            }),
        }
    }

    /// Success envelope for data produced without a provider chain
    pub fn data<T>(data: T) -> SuccessEnvelope<T> {
        SuccessEnvelope {
            status: STATUS_SUCCESS.to_string(),
            data,
            meta: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ErrorEnvelope {
        ErrorEnvelope {
            status: STATUS_ERROR.to_string(),
            message: message.into(),
            suggestion: None,
            attempts: Vec::new(),
        }
    }

    pub fn exhausted(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        attempts: Vec<AttemptSummary>,
    ) -> ErrorEnvelope {
        ErrorEnvelope {
            suggestion: Some(suggestion.into()),
            attempts,
            ..Self::error(message)
        }
    }
}
