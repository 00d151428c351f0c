use std::time::Duration;

use live_call_core::SessionError;

pub const DEFAULT_LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Connection settings for the Gemini services.
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: String,
    /// WebSocket endpoint of the Live API, without query string.
    pub live_endpoint: String,
    /// Base URL for REST calls (image generation, speech).
    pub api_base: String,
    pub live_model: String,
    pub image_model: String,
    pub tts_model: String,
    /// Voice used by the speech service.
    pub tts_voice: String,
    /// How long to wait for `setupComplete` after opening the socket (default: 15 s).
    pub setup_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            live_endpoint: DEFAULT_LIVE_ENDPOINT.into(),
            api_base: DEFAULT_API_BASE.into(),
            live_model: DEFAULT_LIVE_MODEL.into(),
            image_model: DEFAULT_IMAGE_MODEL.into(),
            tts_model: DEFAULT_TTS_MODEL.into(),
            tts_voice: "Kore".into(),
            setup_timeout_secs: 15,
        }
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Read settings from the process environment.
    ///
    /// `GEMINI_API_KEY` (or `API_KEY`) is required; `GEMINI_API_BASE` and
    /// `GEMINI_LIVE_ENDPOINT` override the default endpoints.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SessionError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = non_empty("GEMINI_API_KEY")
            .or_else(|| non_empty("API_KEY"))
            .ok_or_else(|| {
                SessionError::ConfigurationFailed("GEMINI_API_KEY is not set".into())
            })?;

        let mut config = Self::new(api_key);
        if let Some(base) = non_empty("GEMINI_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(endpoint) = non_empty("GEMINI_LIVE_ENDPOINT") {
            config.live_endpoint = endpoint;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.api_key.trim().is_empty() {
            return Err(SessionError::ConfigurationFailed("API key is empty".into()));
        }
        if !self.live_endpoint.starts_with("ws://") && !self.live_endpoint.starts_with("wss://") {
            return Err(SessionError::ConfigurationFailed(format!(
                "live endpoint must be a ws:// or wss:// URL: {}",
                self.live_endpoint
            )));
        }
        if self.setup_timeout_secs == 0 {
            return Err(SessionError::ConfigurationFailed(
                "setup timeout must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn live_url(&self) -> String {
        format!("{}?key={}", self.live_endpoint, self.api_key)
    }

    pub fn generate_content_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.setup_timeout_secs)
    }
}
