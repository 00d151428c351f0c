use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::SessionError;

/// Name of the only tool the session declares to the remote agent.
pub const ROAST_IMAGE_TOOL: &str = "generate_roast_image";

/// Configuration for a live session.
///
/// Everything the transport needs for its setup message plus the fixed
/// media policies (chunk size, frame rate, JPEG quality, playback rate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// System instruction for the remote agent. Opaque to the client.
    pub persona: String,

    /// Prebuilt voice the agent should speak with (default: "Kore").
    pub voice_name: String,

    /// Sample rate assumed for inbound audio without a declared rate (default: 24000).
    pub output_sample_rate: u32,

    /// Frames per outbound audio chunk (default: 4096).
    pub capture_chunk_frames: usize,

    /// Trailing tolerance before "speaking stopped" is reported (default: 0.2 s).
    pub speaking_tolerance_secs: f64,

    pub video: VideoConfig,

    pub tools: ToolConfig,
}

/// Video sampling policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Timer period between sampled frames (default: 1000 ms, i.e. 1 fps).
    pub frame_interval_ms: u64,

    /// Each dimension is divided by this factor before compression (default: 4).
    pub downscale_factor: u32,

    /// JPEG quality, 1–100 (default: 60).
    pub jpeg_quality: u8,
}

/// Tool execution policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Appended to the agent-provided description before image generation.
    pub image_prompt_suffix: String,

    /// Result text sent back to the agent once a tool call completes.
    pub acknowledgement: String,

    /// How long the presentation layer should show a generated image (default: 8 s).
    pub image_display_secs: u64,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.output_sample_rate == 0 {
            return Err("output sample rate must be positive".into());
        }
        if self.capture_chunk_frames == 0 {
            return Err("capture chunk size must be positive".into());
        }
        if !self.speaking_tolerance_secs.is_finite() || self.speaking_tolerance_secs < 0.0 {
            return Err(format!(
                "invalid speaking tolerance: {}",
                self.speaking_tolerance_secs
            ));
        }
        if self.voice_name.trim().is_empty() {
            return Err("voice name must not be empty".into());
        }
        self.video.validate()
    }

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, SessionError> {
        let json = fs::read_to_string(path).map_err(|e| {
            SessionError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: SessionConfig = serde_json::from_str(&json).map_err(|e| {
            SessionError::ConfigurationFailed(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate().map_err(SessionError::ConfigurationFailed)?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn to_json_file(&self, path: &Path) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            SessionError::ConfigurationFailed(format!("failed to serialize config: {}", e))
        })?;
        fs::write(path, json).map_err(|e| {
            SessionError::ConfigurationFailed(format!("failed to write {}: {}", path.display(), e))
        })
    }
}

impl VideoConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_interval_ms == 0 {
            return Err("frame interval must be positive".into());
        }
        if self.downscale_factor == 0 {
            return Err("downscale factor must be positive".into());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!("unsupported JPEG quality: {}", self.jpeg_quality));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl ToolConfig {
    pub fn image_display_duration(&self) -> Duration {
        Duration::from_secs(self.image_display_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persona: String::new(),
            voice_name: "Kore".into(),
            output_sample_rate: 24000,
            capture_chunk_frames: 4096,
            speaking_tolerance_secs: 0.2,
            video: VideoConfig::default(),
            tools: ToolConfig::default(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 1000,
            downscale_factor: 4,
            jpeg_quality: 60,
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            image_prompt_suffix: ", funny caricature style, distorted, roast".into(),
            acknowledgement: "Image generated successfully.".into(),
            image_display_secs: 8,
        }
    }
}
