//! Public types for the health check API
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub provider: String,
    #[serde(rename = "hasKey")]
    pub has_key: bool,
    pub model: String,
}
