//! Router for the health check API

use std::sync::{Arc, RwLock};

use axum::{Router, extract::State, response::Json, routing::get};

use super::public;
use crate::api::state::AppState;

type SharedState = Arc<RwLock<AppState>>;

/// Report which provider and model the relay would use. No side
/// effects; credentials themselves are never echoed back.
async fn health(State(state): State<SharedState>) -> Json<public::HealthResponse> {
    let config = {
        let shared_state = state.read().expect("Unable to read shared state");
        shared_state.config.clone()
    };
    let provider = config.provider();

    Json(public::HealthResponse {
        ok: true,
        provider: provider
            .as_ref()
            .map(|p| p.kind.as_str())
            .unwrap_or("openai")
            .to_string(),
        has_key: provider.is_some(),
        model: config.model_name(),
    })
}

/// Create the health router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(health))
}
