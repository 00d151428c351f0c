//! # live-call-gemini
//!
//! Gemini backends for `live-call-core`:
//!
//! - [`GeminiLiveTransport`]: the Live API WebSocket as a `Transport`
//! - [`GeminiImageGenerator`]: image generation for the roast tool
//! - [`GeminiSpeech`]: one-shot text-to-speech

pub mod config;
pub mod image;
pub mod protocol;
pub mod rest;
pub mod transport;
pub mod tts;

pub use config::GeminiConfig;
pub use image::GeminiImageGenerator;
pub use transport::{GeminiLiveTransport, GeminiSink};
pub use tts::GeminiSpeech;
