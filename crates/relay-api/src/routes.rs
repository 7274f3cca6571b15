//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::{identity, media};
use crate::state::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/media", get(media::resolve_media))
        .route("/identity", get(identity::lookup_identity))
}
