//! Router for the streaming chat relay

use std::convert::Infallible;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Response, sse::Event, sse::KeepAlive, sse::Sse},
    routing::post,
};
use http::{HeaderValue, header};
use tokio::sync::mpsc;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::public;
use crate::api::state::AppState;
use crate::auth::RequireAuth;
use crate::relay::{Frame, handle_chat_turn};

type SharedState = Arc<RwLock<AppState>>;

/// Stream the next assistant turn for the submitted transcript.
///
/// Configuration and upstream failures are reported inside the frame
/// stream; once headers are out this endpoint only ever ends with a
/// Done frame or a dropped connection, never an error status.
async fn chat_handler(
    RequireAuth(_claims): RequireAuth,
    State(state): State<SharedState>,
    axum::Json(payload): axum::Json<public::ChatRequest>,
) -> Response {
    let (config, moderation) = {
        let shared_state = state.read().expect("Unable to read shared state");
        (shared_state.config.clone(), shared_state.moderation.clone())
    };

    let (tx, rx) = mpsc::unbounded_channel::<Frame>();

    // The turn runs detached; a disconnected client closes the
    // channel and the turn is abandoned mid-stream
    tokio::spawn(async move {
        handle_chat_turn(tx, payload.history, &config, moderation.as_ref()).await;
    });

    let sse_stream = UnboundedReceiverStream::new(rx)
        .map(|frame| Ok::<Event, Infallible>(Event::default().data(frame.to_data())));

    let mut resp = Sse::new(sse_stream)
        .keep_alive(
            KeepAlive::default()
                .text("keep-alive")
                .interval(Duration::from_millis(100)),
        )
        .into_response();
    resp.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-transform"),
    );
    resp
}

/// Create the chat router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", post(chat_handler))
}
