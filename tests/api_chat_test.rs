//! Integration tests for the streaming chat relay endpoint

mod test_utils;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    use anyhow::Result;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use jsonwebtoken::{EncodingKey, Header, encode};
    use tower::util::ServiceExt;

    use mindcare::api::AppState;
    use mindcare::core::AppConfig;
    use mindcare::relay::moderation::Moderation;
    use mindcare::relay::{CONFIG_ERROR_MESSAGE, CRISIS_MESSAGE};

    use crate::test_utils::{
        body_to_string, data_records, test_app, test_app_with_config, test_app_with_state,
        test_config,
    };

    fn chat_request(history: serde_json::Value) -> Request<Body> {
        Request::builder()
            .uri("/api/chat")
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "history": history }).to_string(),
            ))
            .unwrap()
    }

    /// Tests that a missing credential set still streams a readable
    /// config error with an OK status
    #[tokio::test]
    async fn it_streams_config_error_when_no_credentials() {
        let app = test_app();

        let response = app
            .oneshot(chat_request(
                serde_json::json!([{ "role": "user", "content": "Hola" }]),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/event-stream"));
        assert_eq!(
            response
                .headers()
                .get("cache-control")
                .unwrap()
                .to_str()
                .unwrap(),
            "no-cache, no-transform"
        );

        let body = body_to_string(response.into_body()).await;
        assert_eq!(
            data_records(&body),
            vec![
                format!("data: {{\"delta\":\"{}\"}}", CONFIG_ERROR_MESSAGE).as_str(),
                "data: [DONE]",
            ]
        );
    }

    /// Tests that an empty history yields a stream containing only Done
    #[tokio::test]
    async fn it_streams_done_only_for_empty_history() {
        let config = AppConfig {
            openai_api_key: Some("sk-test".to_string()),
            ..test_config()
        };
        let app = test_app_with_config(config);

        let response = app
            .oneshot(chat_request(serde_json::json!([])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_string(response.into_body()).await;
        assert_eq!(data_records(&body), vec!["data: [DONE]"]);
    }

    /// Tests that the relay forwards upstream fragments in order and
    /// terminates with Done
    #[tokio::test]
    async fn it_relays_upstream_fragments() {
        let mut server = mockito::Server::new_async().await;
        let sse_response = "data: {\"choices\":[{\"delta\":{\"content\":\"Hola\"},\"finish_reason\":null}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\", ¿cómo estás?\"},\"finish_reason\":null}]}\n\n\
data: [DONE]\n\n";
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(sse_response)
            .create_async()
            .await;

        let config = AppConfig {
            openai_api_key: Some("sk-test".to_string()),
            openai_api_hostname: server.url(),
            ..test_config()
        };
        let app = test_app_with_config(config);

        let response = app
            .oneshot(chat_request(
                serde_json::json!([{ "role": "user", "content": "Hola" }]),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_string(response.into_body()).await;
        mock.assert_async().await;
        assert_eq!(
            data_records(&body),
            vec![
                "data: {\"delta\":\"Hola\"}",
                "data: {\"delta\":\", ¿cómo estás?\"}",
                "data: [DONE]",
            ]
        );
    }

    /// Tests that upstream rate limiting turns into a readable hint
    /// inside the stream, not an error status
    #[tokio::test]
    async fn it_reports_rate_limit_hint_inside_the_stream() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"Rate limit reached"}}"#)
            .create_async()
            .await;

        let config = AppConfig {
            openai_api_key: Some("sk-test".to_string()),
            openai_api_hostname: server.url(),
            ..test_config()
        };
        let app = test_app_with_config(config);

        let response = app
            .oneshot(chat_request(
                serde_json::json!([{ "role": "user", "content": "Hola" }]),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_string(response.into_body()).await;
        mock.assert_async().await;
        let records = data_records(&body);
        assert_eq!(records.len(), 2);
        assert!(records[0].contains("Lo siento, Límite de uso alcanzado o billing pendiente."));
        assert_eq!(records[1], "data: [DONE]");
    }

    struct Flagged;

    #[async_trait]
    impl Moderation for Flagged {
        async fn is_flagged(&self, _text: &str) -> Result<bool> {
            Ok(true)
        }
    }

    /// Tests that a flagged message short-circuits to the crisis
    /// message without ever contacting the provider
    #[tokio::test]
    async fn it_never_contacts_upstream_for_flagged_messages() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let config = AppConfig {
            openai_api_key: Some("sk-test".to_string()),
            openai_api_hostname: server.url(),
            ..test_config()
        };
        let state = AppState::new(config).with_moderation(Arc::new(Flagged));
        let app = test_app_with_state(state);

        let response = app
            .oneshot(chat_request(
                serde_json::json!([{ "role": "user", "content": "ya no puedo más" }]),
            ))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_string(response.into_body()).await;
        let records = data_records(&body);
        assert_eq!(records.len(), 2);
        let payload: serde_json::Value =
            serde_json::from_str(records[0].strip_prefix("data:").unwrap().trim()).unwrap();
        assert_eq!(payload["delta"], CRISIS_MESSAGE);
        assert_eq!(records[1], "data: [DONE]");
    }

    fn make_token(secret: &str) -> String {
        let exp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600;
        encode(
            &Header::default(),
            &serde_json::json!({ "sub": "user-123", "exp": exp }),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    /// Tests that a configured verifier rejects requests without a
    /// bearer token before any stream starts
    #[tokio::test]
    async fn it_requires_a_token_when_auth_is_configured() {
        let config = AppConfig {
            auth_jwt_secret: Some("test-secret".to_string()),
            ..test_config()
        };
        let app = test_app_with_config(config);

        let response = app
            .oneshot(chat_request(
                serde_json::json!([{ "role": "user", "content": "Hola" }]),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_to_string(response.into_body()).await;
        assert!(body.contains("No token provided"));
    }

    /// Tests that a bad token is rejected with 401
    #[tokio::test]
    async fn it_rejects_an_invalid_token() {
        let config = AppConfig {
            auth_jwt_secret: Some("test-secret".to_string()),
            ..test_config()
        };
        let app = test_app_with_config(config);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/chat")
                    .method("POST")
                    .header("content-type", "application/json")
                    .header("authorization", "Bearer not-a-jwt")
                    .body(Body::from(
                        serde_json::json!({ "history": [] }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_to_string(response.into_body()).await;
        assert!(body.contains("Invalid token"));
    }

    /// Tests that a valid token passes verification and streaming
    /// proceeds as usual
    #[tokio::test]
    async fn it_streams_for_a_valid_token() {
        let config = AppConfig {
            auth_jwt_secret: Some("test-secret".to_string()),
            ..test_config()
        };
        let app = test_app_with_config(config);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/chat")
                    .method("POST")
                    .header("content-type", "application/json")
                    .header(
                        "authorization",
                        format!("Bearer {}", make_token("test-secret")),
                    )
                    .body(Body::from(
                        serde_json::json!({
                            "history": [{ "role": "user", "content": "Hola" }]
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        // No provider credential configured, so the stream carries
        // the config error followed by Done
        let body = body_to_string(response.into_body()).await;
        assert_eq!(data_records(&body).len(), 2);
    }
}
