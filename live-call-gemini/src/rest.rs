use live_call_core::SessionError;

use crate::config::GeminiConfig;
use crate::protocol::{GenerateContentRequest, GenerateContentResponse};

/// Thin `generateContent` client shared by the image and speech services.
#[derive(Clone)]
pub struct GeminiRest {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiRest {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, SessionError> {
        let url = self.config.generate_content_url(model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| SessionError::TransportError(format!("{} request failed: {}", model, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::TransportError(format!(
                "{} returned {}: {}",
                model,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| SessionError::EncodingFailed(format!("invalid {} response: {}", model, e)))
    }
}
