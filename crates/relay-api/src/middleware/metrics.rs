//! Metrics tracking middleware
//!
//! Tracks request counts, latency and status codes per endpoint
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Metrics tracking middleware
///
/// Records:
/// - Request count per endpoint
/// - Request latency
/// - Response status codes
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let endpoint = normalize_endpoint(request.uri().path());
    state.increment_requests();

    let response = next.run(request).await;

    let latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
    state
        .record_request(endpoint, response.status().as_u16(), latency_us)
        .await;

    response
}

/// Normalize endpoint paths for consistent metrics
///
/// Drops trailing slashes and collapses unknown paths into one bucket
fn normalize_endpoint(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    let path = if trimmed.is_empty() { "/" } else { trimmed };

    match path {
        "/" | "/health" | "/ready" | "/metrics" => path.to_string(),
        p if p
            .strip_prefix("/api/v1/")
            .is_some_and(|rest| !rest.contains('/')) =>
        {
            p.to_string()
        }
        _ => "other".to_string(),
    }
}
