use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Mime tag for compressed video frames.
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// An audio device backing a capture provider or an audio output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// One realtime input payload as it goes over the wire: mime tag + base64 data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

impl MediaChunk {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }
}

/// Encoded microphone audio: 16-bit signed little-endian mono PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInputChunk {
    pub pcm: Vec<u8>,
    pub sample_rate_hz: u32,
}

impl AudioInputChunk {
    pub fn mime_type(&self) -> String {
        pcm_mime_type(self.sample_rate_hz)
    }

    pub fn frame_count(&self) -> usize {
        self.pcm.len() / 2
    }

    pub fn into_media_chunk(self) -> MediaChunk {
        MediaChunk::from_bytes(self.mime_type(), &self.pcm)
    }
}

/// A raw RGBA frame taken from a live video source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

/// A compressed frame ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInputFrame {
    pub compressed: Vec<u8>,
    pub mime_type: String,
}

impl VideoInputFrame {
    pub fn into_media_chunk(self) -> MediaChunk {
        MediaChunk::from_bytes(self.mime_type, &self.compressed)
    }
}

/// Decoded mono audio ready to be scheduled on an output device.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PlaybackBuffer {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// `audio/pcm;rate=<rate>`
pub fn pcm_mime_type(sample_rate_hz: u32) -> String {
    format!("audio/pcm;rate={}", sample_rate_hz)
}

/// Extract the `rate=` parameter from an audio mime tag, if any.
pub fn parse_pcm_rate(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("rate"))
        .and_then(|(_, value)| value.trim().parse().ok())
}
