//! HTTP trigger server
//!
//! This module provides the key-trigger endpoint and the status REST API
//! for the keytap node.

pub mod rest;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::AppState;

/// Create the server router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Key press trigger (method-agnostic)
        .route("/enter", get(rest::trigger).post(rest::trigger))
        // Health check
        .route("/health", get(rest::health))
        // Node status
        .route("/api/status", get(rest::status))
        // CORS for local tooling
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
