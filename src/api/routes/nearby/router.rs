//! Router for the nearby places API

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use axum_extra::extract::Query;
use serde_json::json;

use super::public;
use crate::api::state::AppState;
use crate::places::{NearbyError, search_nearby};

type SharedState = Arc<RwLock<AppState>>;

/// Proxy a point-of-interest search to Overpass and return the
/// filtered, deduped, distance-sorted places.
async fn nearby(
    State(state): State<SharedState>,
    Query(params): Query<public::NearbyParams>,
) -> Result<Response, crate::api::public::ApiError> {
    let Some((lat, lon)) = params.lat.zip(params.lon) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing lat/lon" })),
        )
            .into_response());
    };
    let radius = params.radius.unwrap_or(5000);

    let overpass_api_url = {
        let shared_state = state.read().expect("Unable to read shared state");
        shared_state.config.overpass_api_url.clone()
    };

    match search_nearby(&overpass_api_url, lat, lon, radius).await {
        Ok(places) => Ok(Json(places).into_response()),
        Err(NearbyError::Overpass(detail)) => {
            tracing::error!("Overpass rejected nearby query: {}", detail);
            Ok((
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Overpass error", "detail": detail })),
            )
                .into_response())
        }
        Err(NearbyError::Transport(err)) => Err(err.into()),
    }
}

/// Create the nearby router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(nearby))
}
