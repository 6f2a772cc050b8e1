//! Test utilities for integration tests
#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use axum::Router;
use axum::body::Body;

use mindcare::api::{AppState, app};
use mindcare::core::AppConfig;

/// A config with no credentials and no auth, detached from the
/// environment so tests stay deterministic.
pub fn test_config() -> AppConfig {
    AppConfig {
        openai_api_key: None,
        openai_api_hostname: "https://api.openai.com".to_string(),
        openai_model: "gpt-4o-mini".to_string(),
        azure_endpoint: None,
        azure_api_key: None,
        azure_deployment: None,
        system_message: "Eres un asistente de prueba.".to_string(),
        overpass_api_url: "https://overpass-api.de/api/interpreter".to_string(),
        upstream_timeout_secs: 5,
        auth_jwt_secret: None,
        auth_issuer: None,
        auth_audience: None,
    }
}

pub fn test_app_with_state(state: AppState) -> Router {
    app(Arc::new(RwLock::new(state)))
}

pub fn test_app_with_config(config: AppConfig) -> Router {
    test_app_with_state(AppState::new(config))
}

pub fn test_app() -> Router {
    test_app_with_config(test_config())
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body was not utf-8")
}

/// The `data:` records of an event-stream body, in order. Comment
/// records such as keep-alives are dropped, so assertions stay
/// deterministic under timing.
pub fn data_records(body: &str) -> Vec<&str> {
    body.split("\n\n")
        .map(str::trim)
        .filter(|record| record.starts_with("data:"))
        .collect()
}
