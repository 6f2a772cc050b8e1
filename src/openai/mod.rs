//! Types for the OpenAI-compatible chat completion protocol. Both
//! supported providers (OpenAI and Azure deployments) speak the same
//! wire format, so provider selection is just a matter of which
//! hostname, key and model name end up in the [`Provider`].

mod stream;
pub use stream::{CompletionError, completion_stream};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Assistant,
    User,
}

/// One message in a conversation, tagged with the speaker role.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Azure,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Azure => "azure",
        }
    }
}

/// A usable upstream credential set resolved from configuration.
#[derive(Clone, Debug)]
pub struct Provider {
    pub kind: ProviderKind,
    pub api_hostname: String,
    pub api_key: String,
    pub model: String,
}
