use thiserror::Error;

/// Errors that can occur while running a live session.
///
/// Dropped capture chunks are counted in `SessionDiagnostics`, not
/// reported here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("capture denied: {0}")]
    CaptureDenied(String),

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("playback failed: {0}")]
    PlaybackFailed(String),

    #[error("tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("session disconnected")]
    Disconnected,
}
