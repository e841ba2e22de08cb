//! Text-generation boundary consumed by the dialogue driver and the
//! fallback specialty classifier.

use async_trait::async_trait;

use crate::error::Result;

use super::client::LlmClient;
use super::types::Message;

/// Opaque text-generation service.
///
/// Implementations may fail transiently; callers in this crate treat any
/// error as "no result".
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        let response = self
            .chat(vec![Message::user(prompt)], temperature)
            .await?;
        Ok(response.content)
    }
}
