//! Relay API - HTTP server
//!
//! Exposes the provider chains over HTTP:
//! - `GET /api/v1/media?url=` resolves a short-video link
//! - `GET /api/v1/identity?cnic=&mobile=` looks up SIM ownership
//! - `/health`, `/ready` and `/metrics` for operations
//!
//! Author: hephaex@gmail.com

pub mod assembler;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::{http::HeaderValue, middleware::from_fn_with_state, routing::get, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::health;
use crate::middleware::metrics_middleware;
use crate::state::AppState;

pub use assembler::{ErrorEnvelope, ResultAssembler, SuccessEnvelope};
pub use error::AppError;

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .nest("/api/v1", routes::api_routes())
        .layer(from_fn_with_state(state.clone(), metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Permissive when no origins are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

// ============================================================================
// Test support
// ============================================================================

/// Router over a scripted fetcher with the default configuration
#[cfg(feature = "test-utils")]
pub fn create_router_for_testing(fetcher: Arc<relay_chain::testing::ScriptedFetcher>) -> Router {
    create_router_for_testing_with(relay_core::AppConfig::default(), fetcher)
}

/// Router over a scripted fetcher; inter-attempt delays are disabled
#[cfg(feature = "test-utils")]
pub fn create_router_for_testing_with(
    mut config: relay_core::AppConfig,
    fetcher: Arc<relay_chain::testing::ScriptedFetcher>,
) -> Router {
    config.http.inter_attempt_delay_ms = 0;
    let state = AppState::with_fetcher(config, fetcher).expect("test configuration is valid");
    create_router(Arc::new(state))
}
