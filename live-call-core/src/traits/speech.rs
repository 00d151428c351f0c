use async_trait::async_trait;

use crate::models::error::SessionError;
use crate::models::media::PlaybackBuffer;

/// Turns text into speech audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<PlaybackBuffer, SessionError>;

    /// Abort anything this synthesizer is still saying on its own.
    ///
    /// Only synthesizers that play audio themselves need this.
    fn cancel(&self) {}
}
