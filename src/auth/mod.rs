//! Server-side identity verification for the chat relay. The relay
//! never trusts a client-asserted sign-in state; it validates a
//! signed bearer token per request whenever a verification secret is
//! configured.

use std::sync::{Arc, RwLock};

use axum::{
    Json,
    extract::FromRequestParts,
    http::StatusCode,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use http::header;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use serde_json::json;

use crate::api::AppState;

type SharedState = Arc<RwLock<AppState>>;

/// Claims carried by a verified identity token.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token")]
    InvalidToken,
}

/// Validates HS256-signed identity tokens against a shared secret,
/// with optional issuer and audience pinning.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = audience {
            validation.set_audience(&[audience]);
        } else {
            // Without a pinned audience, tokens carrying an aud claim
            // would be rejected outright
            validation.validate_aud = false;
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

/// Extractor that enforces token verification on a route. Yields the
/// verified claims, or None when no verifier is configured (the
/// relay then runs open, which `AppState::new` warns about).
pub struct RequireAuth(pub Option<Claims>);

impl FromRequestParts<SharedState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let verifier = {
            let shared_state = state.read().expect("Unable to read shared state");
            shared_state.verifier.clone()
        };
        let Some(verifier) = verifier else {
            return Ok(RequireAuth(None));
        };

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));
        let Some(token) = token else {
            return Err(AuthRejection::MissingToken);
        };

        match verifier.verify(token) {
            Ok(claims) => Ok(RequireAuth(Some(claims))),
            Err(e) => {
                tracing::warn!("Rejected chat request: {}", e);
                Err(AuthRejection::InvalidToken)
            }
        }
    }
}

#[derive(Debug)]
pub enum AuthRejection {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            AuthRejection::MissingToken => "No token provided",
            AuthRejection::InvalidToken => "Invalid token",
        };
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
    }
}
