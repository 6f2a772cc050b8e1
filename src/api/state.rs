use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::core::AppConfig;
use crate::relay::moderation::{Disabled, Moderation};

pub struct AppState {
    pub config: AppConfig,
    pub verifier: Option<Arc<TokenVerifier>>,
    pub moderation: Arc<dyn Moderation>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let verifier = config.auth_jwt_secret.as_ref().map(|secret| {
            Arc::new(TokenVerifier::new(
                secret,
                config.auth_issuer.as_deref(),
                config.auth_audience.as_deref(),
            ))
        });
        if verifier.is_none() {
            tracing::warn!(
                "MINDCARE_AUTH_JWT_SECRET is not set, /api/chat accepts unauthenticated requests"
            );
        }

        Self {
            config,
            verifier,
            moderation: Arc::new(Disabled),
        }
    }

    /// Swap in a moderation hook. The default is off; the relay's
    /// flagged branch stays live either way.
    pub fn with_moderation(mut self, moderation: Arc<dyn Moderation>) -> Self {
        self.moderation = moderation;
        self
    }
}
