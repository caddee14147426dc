pub mod claude;
pub mod normalize;
pub mod prompt;

use async_trait::async_trait;

use crate::error::Result;

/// A text-completion service: one self-contained prompt in, free-form text out.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String>;
}
