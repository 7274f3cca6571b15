//! Media resolution handler
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use relay_core::CanonicalMediaRecord;
use serde::Deserialize;

use crate::assembler::{ResultAssembler, SuccessEnvelope};
use crate::error::AppError;
use crate::state::AppState;

/// Query string of `GET /api/v1/media`
#[derive(Debug, Default, Deserialize)]
pub struct MediaParams {
    pub url: Option<String>,
}

/// Resolve a short-video link into a direct media URL
pub async fn resolve_media(
    State(state): State<Arc<AppState>>,
    params: Result<Query<MediaParams>, QueryRejection>,
) -> Result<Json<SuccessEnvelope<CanonicalMediaRecord>>, AppError> {
    let Query(params) = params?;
    let started = Instant::now();
    let query = relay_core::Query::media(
        params.url.as_deref().unwrap_or_default(),
        &state.config.media.platform_markers,
    )?;

    let outcome = state.chain.resolve(&query, &state.media_providers).await;
    state.record_chain_outcome(outcome.is_resolved());
    let success = outcome.into_result()?;

    Ok(Json(ResultAssembler::success(&query, success, started.elapsed())))
}
