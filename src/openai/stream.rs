use std::time::Duration;

use futures_util::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use super::{Message, Provider};

/// Failure categories for one streaming completion call. The relay
/// maps each category to a fixed user-facing hint, so classification
/// happens here where the transport details are still visible.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("upstream rejected the API key")]
    InvalidCredential,
    #[error("upstream rate or billing limit reached")]
    RateLimited,
    #[error("network error reaching upstream")]
    Network(#[source] reqwest::Error),
    #[error("upstream request failed: {0}")]
    Upstream(String),
}

fn classify_transport(err: reqwest::Error) -> CompletionError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        CompletionError::Network(err)
    } else {
        CompletionError::Upstream(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    choices: Vec<ChunkChoice>,
}

/// Open one token-streaming chat completion call and forward every
/// non-empty content fragment through `tx` in arrival order, one
/// fragment per send. Returns the full accumulated assistant text.
///
/// A closed receiver is not an error: the caller went away, so the
/// rest of the provider stream is abandoned and whatever accumulated
/// is returned.
pub async fn completion_stream(
    tx: mpsc::UnboundedSender<String>,
    messages: &[Message],
    provider: &Provider,
    timeout: Duration,
) -> Result<String, CompletionError> {
    let payload = json!({
        "model": provider.model,
        "messages": messages,
        "stream": true,
        "temperature": 0.7,
    });
    let url = format!(
        "{}/v1/chat/completions",
        provider.api_hostname.trim_end_matches('/')
    );
    let response = reqwest::Client::new()
        .post(url)
        .bearer_auth(&provider.api_key)
        .header("Content-Type", "application/json")
        .timeout(timeout)
        .json(&payload)
        .send()
        .await
        .map_err(classify_transport)?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(CompletionError::InvalidCredential);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(CompletionError::RateLimited);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CompletionError::Upstream(format!(
            "status {}: {}",
            status, body
        )));
    }

    let mut stream = response.bytes_stream();

    let mut content_buf = String::new();
    // Byte buffer so SSE events fragmented over HTTP/2 frames (or a
    // UTF-8 sequence split across reads) reassemble before parsing
    let mut buffer: Vec<u8> = Vec::new();

    'outer: while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(classify_transport)?;
        buffer.extend_from_slice(&chunk);

        // Process all complete SSE events from the buffer
        while let Some(event_end) = buffer.windows(2).position(|w| w == b"\n\n") {
            let event: Vec<u8> = buffer.drain(..event_end + 2).collect();
            let event_data = String::from_utf8_lossy(&event[..event_end]);

            let event_data = event_data.trim();
            if event_data.is_empty() {
                continue;
            }

            let Some(data) = event_data.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() {
                continue;
            }

            if data == "[DONE]" {
                break 'outer;
            }

            // A record that doesn't parse is dropped, not fatal; the
            // provider occasionally interleaves comments or chunks we
            // don't model
            let chunk = match serde_json::from_str::<CompletionChunk>(data) {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!("Skipping unparseable completion chunk {}: {}", data, e);
                    continue;
                }
            };
            let Some(choice) = chunk.choices.first() else {
                continue;
            };

            if let Some(content) = &choice.delta.content {
                if !content.is_empty() {
                    content_buf.push_str(content);
                    if tx.send(content.clone()).is_err() {
                        break 'outer;
                    }
                }
            }
            if choice.finish_reason.is_some() {
                break 'outer;
            }
        }
    }

    Ok(content_buf)
}
