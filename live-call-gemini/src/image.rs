use async_trait::async_trait;

use live_call_core::{ImageGenerator, SessionError};

use crate::config::GeminiConfig;
use crate::protocol::{Content, GenerateContentRequest, GenerateContentResponse};
use crate::rest::GeminiRest;

/// `ImageGenerator` backed by a Gemini image model.
pub struct GeminiImageGenerator {
    rest: GeminiRest,
}

impl GeminiImageGenerator {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            rest: GeminiRest::new(config),
        }
    }
}

/// `data:<mime>;base64,<data>` for the first inline image of the response.
pub fn image_reference(response: &GenerateContentResponse) -> Option<String> {
    response
        .first_inline_data()
        .map(|data| format!("data:{};base64,{}", data.mime_type, data.data))
}

#[async_trait]
impl ImageGenerator for GeminiImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, SessionError> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(prompt)],
            generation_config: None,
        };
        let model = &self.rest.config().image_model;
        let response = self
            .rest
            .generate_content(model, &request)
            .await
            .map_err(|e| SessionError::ToolExecutionFailed(e.to_string()))?;

        let reference = image_reference(&response);
        if reference.is_none() {
            log::debug!("{} answered without an image", model);
        }
        Ok(reference)
    }
}
