use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::models::error::SessionError;
use crate::traits::audio_output::AudioOutput;
use crate::traits::speech::SpeechSynthesizer;

/// Which synthesizer ended up speaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechRoute {
    Primary,
    Fallback,
}

/// One-shot text-to-speech outside the live session.
///
/// Give it an output of its own; it schedules at the output's current time
/// and does not coordinate with a session's playback. Tries the primary
/// synthesizer first and falls back to the secondary one if synthesis or
/// playback fails. No fallback is installed by default: callers pass one to
/// [`SpeechHelper::with_fallback`] (the terminal app uses espeak-ng).
pub struct SpeechHelper {
    primary: Arc<dyn SpeechSynthesizer>,
    fallback: Option<Arc<dyn SpeechSynthesizer>>,
    output: Arc<dyn AudioOutput>,
    playing: Arc<AtomicUsize>,
}

impl SpeechHelper {
    pub fn new(primary: Arc<dyn SpeechSynthesizer>, output: Arc<dyn AudioOutput>) -> Self {
        Self {
            primary,
            fallback: None,
            output,
            playing: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn SpeechSynthesizer>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Whether anything this helper scheduled is still playing.
    pub fn is_speaking(&self) -> bool {
        self.playing.load(Ordering::SeqCst) > 0
    }

    /// Speak `text` right away.
    pub async fn speak(&self, text: &str) -> Result<SpeechRoute, SessionError> {
        if let Some(ref fallback) = self.fallback {
            fallback.cancel();
        }

        let primary_error = match self.speak_with(self.primary.as_ref(), text).await {
            Ok(()) => return Ok(SpeechRoute::Primary),
            Err(e) => e,
        };

        let Some(ref fallback) = self.fallback else {
            return Err(primary_error);
        };
        log::warn!("Primary speech failed ({}), using fallback", primary_error);
        self.speak_with(fallback.as_ref(), text).await?;
        Ok(SpeechRoute::Fallback)
    }

    async fn speak_with(
        &self,
        synthesizer: &dyn SpeechSynthesizer,
        text: &str,
    ) -> Result<(), SessionError> {
        let buffer = synthesizer.synthesize(text).await?;
        if buffer.is_empty() {
            return Err(SessionError::PlaybackFailed("synthesizer returned no audio".into()));
        }
        let now = self.output.current_time();
        let playing = Arc::clone(&self.playing);
        playing.fetch_add(1, Ordering::SeqCst);
        let ended = Arc::clone(&playing);
        let result = self.output.schedule(
            buffer,
            now,
            Box::new(move |_| {
                ended.fetch_sub(1, Ordering::SeqCst);
            }),
        );
        if result.is_err() {
            playing.fetch_sub(1, Ordering::SeqCst);
        }
        result
    }
}
