//! Public types for the chat relay API
use serde::Deserialize;

use crate::openai::Message;

#[derive(Deserialize)]
pub struct ChatRequest {
    // A missing history is treated as empty, matching the widget
    #[serde(default)]
    pub history: Vec<Message>,
}
