use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::{SessionConfig, ROAST_IMAGE_TOOL};

/// What the transport sends when it opens a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSetup {
    pub persona: String,
    pub voice_name: String,
    pub response_modality: ResponseModality,
    pub tools: Vec<ToolDeclaration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    Audio,
}

/// A function the remote agent may call, described with a JSON schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl SessionSetup {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            persona: config.persona.clone(),
            voice_name: config.voice_name.clone(),
            response_modality: ResponseModality::Audio,
            tools: vec![ToolDeclaration::roast_image()],
        }
    }
}

impl ToolDeclaration {
    /// `generate_roast_image(description: string)`
    pub fn roast_image() -> Self {
        Self {
            name: ROAST_IMAGE_TOOL.to_string(),
            description: "Generates a funny, caricature-style image of the user to roast them.".into(),
            parameters: serde_json::json!({
                "type": "OBJECT",
                "properties": {
                    "description": {
                        "type": "STRING",
                        "description": "Visual description of the funny/roast image."
                    }
                },
                "required": ["description"]
            }),
        }
    }
}
