use anyhow::Result;
use async_trait::async_trait;

/// Safety pre-check run on the latest user message before any
/// upstream call is opened. Implementations decide what "flagged"
/// means; the relay decides what happens when it fires.
#[async_trait]
pub trait Moderation: Send + Sync {
    async fn is_flagged(&self, text: &str) -> Result<bool>;
}

/// Default hook: moderation is off and every message passes.
pub struct Disabled;

#[async_trait]
impl Moderation for Disabled {
    async fn is_flagged(&self, _text: &str) -> Result<bool> {
        Ok(false)
    }
}
