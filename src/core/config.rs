use std::env;

use crate::openai::{Provider, ProviderKind};

/// Fixed system instruction prepended to every relay call.
pub const SYSTEM_MESSAGE: &str = "\
Eres MindCare, un asistente de apoyo emocional para jóvenes. Eres empático, claro y NO eres terapeuta.
- Valida emociones, ofrece psicoeducación ligera y sugiere hábitos saludables.
- Evita diagnósticos o tratamientos. No des consejos médicos/legales.
- Si surge riesgo (p. ej., ideas suicidas, autolesiones), responde de forma prioritaria,
  fomenta buscar ayuda humana inmediata y comparte recursos de crisis.
- Lenguaje: español de México, cálido y respetuoso.";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub openai_api_key: Option<String>,
    pub openai_api_hostname: String,
    pub openai_model: String,
    pub azure_endpoint: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_deployment: Option<String>,
    pub system_message: String,
    pub overpass_api_url: String,
    // Ceiling on one upstream streaming call so an abandoned request
    // can't hold resources forever
    pub upstream_timeout_secs: u64,
    pub auth_jwt_secret: Option<String>,
    pub auth_issuer: Option<String>,
    pub auth_audience: Option<String>,
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl Default for AppConfig {
    fn default() -> Self {
        let openai_api_key = env_opt("OPENAI_API_KEY");
        let openai_api_hostname =
            env::var("OPENAI_API_HOSTNAME").unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let azure_endpoint = env_opt("AZURE_ENDPOINT");
        let azure_api_key = env_opt("AZURE_API_KEY");
        let azure_deployment = env_opt("AZURE_DEPLOYMENT");
        let system_message =
            env::var("MINDCARE_SYSTEM_MESSAGE").unwrap_or_else(|_| SYSTEM_MESSAGE.to_string());
        let overpass_api_url = env::var("MINDCARE_OVERPASS_URL")
            .unwrap_or_else(|_| "https://overpass-api.de/api/interpreter".to_string());
        let upstream_timeout_secs = env::var("MINDCARE_UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);
        let auth_jwt_secret = env_opt("MINDCARE_AUTH_JWT_SECRET");
        let auth_issuer = env_opt("MINDCARE_AUTH_ISSUER");
        let auth_audience = env_opt("MINDCARE_AUTH_AUDIENCE");

        Self {
            openai_api_key,
            openai_api_hostname,
            openai_model,
            azure_endpoint,
            azure_api_key,
            azure_deployment,
            system_message,
            overpass_api_url,
            upstream_timeout_secs,
            auth_jwt_secret,
            auth_issuer,
            auth_audience,
        }
    }
}

impl AppConfig {
    /// Resolve the upstream provider from the configured credential
    /// sets. Azure wins when the full endpoint + key + deployment
    /// triple is present (the deployment doubles as the model name),
    /// otherwise OpenAI when a key is set, otherwise none.
    pub fn provider(&self) -> Option<Provider> {
        if let (Some(endpoint), Some(api_key), Some(deployment)) = (
            self.azure_endpoint.as_ref(),
            self.azure_api_key.as_ref(),
            self.azure_deployment.as_ref(),
        ) {
            return Some(Provider {
                kind: ProviderKind::Azure,
                api_hostname: endpoint.trim_end_matches('/').to_string(),
                api_key: api_key.clone(),
                model: deployment.clone(),
            });
        }

        self.openai_api_key.as_ref().map(|key| Provider {
            kind: ProviderKind::OpenAi,
            api_hostname: self.openai_api_hostname.clone(),
            api_key: key.clone(),
            model: self.openai_model.clone(),
        })
    }

    /// Model name reported by the health endpoint, meaningful even
    /// when no credential is configured.
    pub fn model_name(&self) -> String {
        self.azure_deployment
            .clone()
            .unwrap_or_else(|| self.openai_model.clone())
    }
}
