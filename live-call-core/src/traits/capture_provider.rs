use std::sync::Arc;

use crate::models::error::SessionError;
use crate::models::media::AudioDevice;

/// Callback invoked when a captured audio buffer is available.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples.
/// - `sample_rate`: The device-native sample rate of the delivered audio.
/// - `channels`: Number of interleaved channels.
pub type AudioBufferCallback = Arc<dyn Fn(&[f32], f64, u16) + Send + Sync + 'static>;

/// Interface for a platform microphone.
///
/// Implemented by `CpalMicCapture` in `live-call-cpal`.
pub trait CaptureProvider: Send + Sync {
    /// Whether this capture source can currently be opened.
    fn is_available(&self) -> bool;

    /// Start capturing audio, delivering buffers via `callback`.
    ///
    /// The callback fires on the device's audio thread. Keep processing minimal.
    /// A refused permission or an unusable device is reported as
    /// `SessionError::CaptureDenied` or `SessionError::DeviceNotAvailable`.
    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), SessionError>;

    /// Stop capturing and release the device. Safe to call more than once.
    fn stop(&mut self) -> Result<(), SessionError>;

    /// Information about the device backing this provider.
    fn device_info(&self) -> AudioDevice;
}
