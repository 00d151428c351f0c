use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::processing::frame::FrameEncoder;
use crate::session::outbound::OutboundQueue;
use crate::session::shared::SessionShared;
use crate::traits::video_source::VideoSource;

/// What happened on one sampler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    Queued,
    /// The outbound slot was busy; the frame was dropped.
    Dropped,
    /// Session inactive, source not ready or frame unusable.
    Skipped,
}

/// Fixed-interval camera sampler.
pub struct VideoSampler {
    handle: JoinHandle<()>,
}

impl VideoSampler {
    pub(crate) fn start(
        source: Arc<dyn VideoSource>,
        encoder: FrameEncoder,
        interval: Duration,
        queue: OutboundQueue,
        shared: Arc<SessionShared>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately; the first frame goes out one interval in
            ticker.tick().await;
            loop {
                ticker.tick().await;
                sample_once(source.as_ref(), &encoder, &queue, &shared);
            }
        });
        log::debug!("Video sampler started ({:?} interval)", interval);
        Self { handle }
    }

    /// Cancel the timer. No tick runs after this returns.
    pub fn stop(self) {
        self.handle.abort();
        log::debug!("Video sampler stopped");
    }
}

/// Run a single sampling tick.
pub(crate) fn sample_once(
    source: &dyn VideoSource,
    encoder: &FrameEncoder,
    queue: &OutboundQueue,
    shared: &SessionShared,
) -> SampleOutcome {
    if !shared.is_active() {
        return SampleOutcome::Skipped;
    }

    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        shared.record(|d| d.video_ticks_skipped += 1);
        return SampleOutcome::Skipped;
    }

    let Some(frame) = source.current_frame() else {
        shared.record(|d| d.video_ticks_skipped += 1);
        return SampleOutcome::Skipped;
    };

    match encoder.encode(frame) {
        Ok(Some(encoded)) => {
            if queue.offer(encoded.into_media_chunk()) {
                SampleOutcome::Queued
            } else {
                SampleOutcome::Dropped
            }
        }
        Ok(None) => {
            shared.record(|d| d.video_ticks_skipped += 1);
            SampleOutcome::Skipped
        }
        Err(e) => {
            log::warn!("Skipping video frame: {}", e);
            shared.record(|d| d.video_ticks_skipped += 1);
            SampleOutcome::Skipped
        }
    }
}
