use crate::models::error::SessionError;
use crate::models::media::PlaybackBuffer;

/// Invoked once a scheduled buffer has finished playing, with the output
/// clock time at that moment.
pub type PlaybackEndedCallback = Box<dyn FnOnce(f64) + Send + 'static>;

/// An audio output device with its own monotonic clock.
///
/// Implemented by `CpalSpeaker` in `live-call-cpal`.
pub trait AudioOutput: Send + Sync {
    /// Output clock in seconds. Never decreases.
    fn current_time(&self) -> f64;

    /// Play `buffer` starting at `start_time` on the output clock.
    ///
    /// A start time in the past means "as soon as possible".
    fn schedule(
        &self,
        buffer: PlaybackBuffer,
        start_time: f64,
        on_ended: PlaybackEndedCallback,
    ) -> Result<(), SessionError>;

    /// Stop playback and release the device.
    ///
    /// Pending buffers are discarded without invoking their callbacks.
    /// Safe to call more than once.
    fn close(&self) -> Result<(), SessionError>;
}
