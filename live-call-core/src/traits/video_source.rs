use crate::models::media::VideoFrame;

/// A live video surface the sampler can read frames from.
pub trait VideoSource: Send + Sync {
    /// Current frame dimensions, `(0, 0)` when no frame is available yet.
    fn dimensions(&self) -> (u32, u32);

    /// Snapshot of the current frame as RGBA.
    fn current_frame(&self) -> Option<VideoFrame>;
}
