use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use live_call_core::models::media::parse_pcm_rate;
use live_call_core::processing::pcm::decode_pcm16;
use live_call_core::{PlaybackBuffer, SessionError, SpeechSynthesizer};

use crate::config::GeminiConfig;
use crate::protocol::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use crate::rest::GeminiRest;

/// Rate of the PCM returned by the speech model when the part does not say.
pub const TTS_SAMPLE_RATE: u32 = 24000;

/// `SpeechSynthesizer` backed by a Gemini TTS model.
pub struct GeminiSpeech {
    rest: GeminiRest,
}

impl GeminiSpeech {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            rest: GeminiRest::new(config),
        }
    }
}

/// Decode the first inline audio part into a playable buffer.
pub fn speech_buffer(response: &GenerateContentResponse) -> Result<PlaybackBuffer, SessionError> {
    let data = response
        .first_inline_data()
        .ok_or_else(|| SessionError::PlaybackFailed("speech response contained no audio".into()))?;

    let bytes = STANDARD
        .decode(data.data.as_bytes())
        .map_err(|e| SessionError::EncodingFailed(format!("invalid base64 speech: {}", e)))?;

    Ok(PlaybackBuffer {
        samples: decode_pcm16(&bytes),
        sample_rate: parse_pcm_rate(&data.mime_type).unwrap_or(TTS_SAMPLE_RATE),
    })
}

#[async_trait]
impl SpeechSynthesizer for GeminiSpeech {
    async fn synthesize(&self, text: &str) -> Result<PlaybackBuffer, SessionError> {
        let config = self.rest.config();
        let request = GenerateContentRequest {
            contents: vec![Content::text(text)],
            generation_config: Some(GenerationConfig::audio(&config.tts_voice)),
        };
        let response = self.rest.generate_content(&config.tts_model, &request).await?;
        speech_buffer(&response)
    }
}
