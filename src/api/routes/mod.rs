//! API routes module

pub mod chat;
pub mod health;
pub mod nearby;

use std::sync::{Arc, RwLock};

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<RwLock<AppState>>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Streaming chat relay
        .nest("/chat", chat::router())
        // Health check
        .nest("/health", health::router())
        // Nearby places proxy
        .nest("/nearby", nearby::router())
}
