//! Identity lookup handler
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use relay_core::AggregateReport;
use serde::Deserialize;

use crate::assembler::{ResultAssembler, SuccessEnvelope};
use crate::error::AppError;
use crate::state::AppState;

/// Query string of `GET /api/v1/identity`
#[derive(Debug, Default, Deserialize)]
pub struct IdentityParams {
    pub cnic: Option<String>,
    pub mobile: Option<String>,
}

/// Look up the owner and registered numbers for a CNIC or mobile number
pub async fn lookup_identity(
    State(state): State<Arc<AppState>>,
    params: Result<Query<IdentityParams>, QueryRejection>,
) -> Result<Json<SuccessEnvelope<AggregateReport>>, AppError> {
    let Query(params) = params?;
    let started = Instant::now();
    let query = relay_core::Query::identity(params.cnic.as_deref(), params.mobile.as_deref())?;

    let outcome = state.chain.resolve(&query, &state.identity_providers).await;
    state.record_chain_outcome(outcome.is_resolved());
    let success = outcome.into_result()?;

    tracing::info!(
        "Identity lookup found {} record(s) via {}",
        success.record.record_count,
        success.provider
    );

    Ok(Json(ResultAssembler::success(&query, success, started.elapsed())))
}
