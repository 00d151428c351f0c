use async_trait::async_trait;

use crate::models::error::SessionError;

/// External image generation service.
///
/// Best effort: `Ok(None)` means the service answered without an image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, SessionError>;
}
