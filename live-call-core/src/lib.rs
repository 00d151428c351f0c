//! # live-call-core
//!
//! Platform-agnostic core of a real-time voice/video call with a remote AI agent.
//!
//! Provides the session lifecycle, the capture and video pipelines, gapless
//! playback scheduling and tool-call handling. Transports (Gemini Live),
//! image/speech services and audio devices (cpal) live in sibling crates and
//! plug in through the traits below.
//!
//! ## Architecture
//!
//! ```text
//! live-call-core (this crate)
//! ├── traits/       ← Transport, CaptureProvider, AudioOutput, VideoSource, ImageGenerator, SessionDelegate
//! ├── models/       ← SessionError, SessionState, SessionConfig, MediaChunk, InboundMessage, etc.
//! ├── processing/   ← PCM16 codec, sample chunker, JPEG frame encoder
//! ├── session/      ← LiveSession (lifecycle), encoder, video sampler, router, playback, tools
//! └── speech        ← SpeechHelper (one-shot TTS with fallback)
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod speech;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{SessionConfig, ToolConfig, VideoConfig, ROAST_IMAGE_TOOL};
pub use models::diagnostics::SessionDiagnostics;
pub use models::error::SessionError;
pub use models::events::{ImageEvent, SessionEvent};
pub use models::media::{AudioDevice, MediaChunk, PlaybackBuffer, VideoFrame};
pub use models::message::{AudioPayload, InboundMessage, ToolCallRequest, ToolResult};
pub use models::setup::{SessionSetup, ToolDeclaration};
pub use models::state::SessionState;
pub use session::live::{LiveSession, SessionMedia};
pub use speech::{SpeechHelper, SpeechRoute};
pub use traits::audio_output::{AudioOutput, PlaybackEndedCallback};
pub use traits::capture_provider::{AudioBufferCallback, CaptureProvider};
pub use traits::image_generator::ImageGenerator;
pub use traits::session_delegate::{ChannelDelegate, DelegateHandle, SessionDelegate};
pub use traits::speech::SpeechSynthesizer;
pub use traits::transport::{Transport, TransportConnection, TransportEvent, TransportSink};
pub use traits::video_source::VideoSource;
