use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;

use crate::models::error::SessionError;
use crate::models::media::PlaybackBuffer;
use crate::models::message::AudioPayload;
use crate::processing::pcm::decode_pcm16;
use crate::traits::audio_output::{AudioOutput, PlaybackEndedCallback};
use crate::traits::session_delegate::DelegateHandle;

/// The output-clock time at which the next chunk may start.
///
/// Only ever advanced by a successfully scheduled chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackSchedule {
    next_start_time: f64,
}

impl PlaybackSchedule {
    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    /// Start time for the next chunk given the current clock.
    pub fn start_for(&self, now: f64) -> f64 {
        now.max(self.next_start_time)
    }

    fn commit(&mut self, start: f64, duration: f64) {
        self.next_start_time = start + duration;
    }

    /// Whether the agent has stopped speaking at `now`.
    pub fn is_drained(&self, now: f64, tolerance: f64) -> bool {
        now >= self.next_start_time - tolerance
    }
}

/// Schedules agent speech back-to-back on the output clock.
pub struct PlaybackScheduler {
    output: Arc<dyn AudioOutput>,
    schedule: Arc<Mutex<PlaybackSchedule>>,
    default_sample_rate: u32,
    tolerance: f64,
    delegate: DelegateHandle,
}

impl PlaybackScheduler {
    pub fn new(
        output: Arc<dyn AudioOutput>,
        default_sample_rate: u32,
        tolerance: f64,
        delegate: DelegateHandle,
    ) -> Self {
        Self {
            output,
            schedule: Arc::new(Mutex::new(PlaybackSchedule::default())),
            default_sample_rate,
            tolerance,
            delegate,
        }
    }

    pub fn schedule(&self) -> PlaybackSchedule {
        *self.schedule.lock()
    }

    /// Decode one audio message and queue it after whatever is already playing.
    ///
    /// Returns the start time, or `None` when the payload held no samples.
    pub fn enqueue(&self, payload: &AudioPayload) -> Result<Option<f64>, SessionError> {
        let bytes = STANDARD
            .decode(payload.data.as_bytes())
            .map_err(|e| SessionError::EncodingFailed(format!("invalid base64 audio: {}", e)))?;

        let buffer = PlaybackBuffer {
            samples: decode_pcm16(&bytes),
            sample_rate: payload.sample_rate_hz.unwrap_or(self.default_sample_rate),
        };
        if buffer.is_empty() {
            log::warn!("Ignoring empty audio chunk");
            return Ok(None);
        }

        self.play(buffer).map(Some)
    }

    /// Queue a decoded buffer.
    pub fn play(&self, buffer: PlaybackBuffer) -> Result<f64, SessionError> {
        let duration = buffer.duration_secs();
        let start = {
            let mut schedule = self.schedule.lock();
            let start = schedule.start_for(self.output.current_time());
            self.output.schedule(buffer, start, self.on_ended())?;
            schedule.commit(start, duration);
            start
        };

        if let Some(delegate) = self.delegate.get() {
            delegate.on_speaking_changed(true);
        }
        Ok(start)
    }

    fn on_ended(&self) -> PlaybackEndedCallback {
        let schedule = Arc::clone(&self.schedule);
        let delegate = self.delegate.clone();
        let tolerance = self.tolerance;
        Box::new(move |now: f64| {
            if schedule.lock().is_drained(now, tolerance) {
                if let Some(delegate) = delegate.get() {
                    delegate.on_speaking_changed(false);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::events::SessionEvent;
    use crate::processing::pcm::encode_pcm16;
    use crate::session::test_support::{ManualOutput, RecordingDelegate};
    use crate::traits::session_delegate::SessionDelegate;
    use approx::assert_abs_diff_eq;

    fn payload(samples: usize, rate: Option<u32>) -> AudioPayload {
        AudioPayload {
            data: STANDARD.encode(encode_pcm16(&vec![0.25; samples])),
            sample_rate_hz: rate,
        }
    }

    fn scheduler(output: &Arc<ManualOutput>, delegate: &Arc<RecordingDelegate>) -> PlaybackScheduler {
        PlaybackScheduler::new(
            Arc::clone(output) as Arc<dyn AudioOutput>,
            24000,
            0.2,
            DelegateHandle::new(Some(Arc::clone(delegate) as Arc<dyn SessionDelegate>)),
        )
    }

    #[test]
    fn chunks_play_back_to_back() {
        let output = ManualOutput::new();
        let delegate = RecordingDelegate::new();
        let scheduler = scheduler(&output, &delegate);

        output.set_time(1.0);
        let first = scheduler.enqueue(&payload(12000, None)).unwrap().unwrap();
        let second = scheduler.enqueue(&payload(12000, None)).unwrap().unwrap();

        assert_abs_diff_eq!(first, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(second, 1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(scheduler.schedule().next_start_time(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn delegate_installed_after_construction_hears_speaking() {
        let output = ManualOutput::new();
        let handle = DelegateHandle::default();
        let scheduler = PlaybackScheduler::new(
            Arc::clone(&output) as Arc<dyn AudioOutput>,
            24000,
            0.2,
            handle.clone(),
        );

        let delegate = RecordingDelegate::new();
        handle.set(Arc::clone(&delegate) as Arc<dyn SessionDelegate>);
        scheduler.enqueue(&payload(2400, None)).unwrap();
        output.advance_to(0.1);

        assert_eq!(
            delegate.events(),
            vec![
                SessionEvent::SpeakingChanged(true),
                SessionEvent::SpeakingChanged(false)
            ]
        );
    }

    #[test]
    fn late_chunk_starts_now() {
        let output = ManualOutput::new();
        let delegate = RecordingDelegate::new();
        let scheduler = scheduler(&output, &delegate);

        scheduler.enqueue(&payload(2400, None)).unwrap();
        output.set_time(5.0);
        let start = scheduler.enqueue(&payload(2400, None)).unwrap().unwrap();

        assert_abs_diff_eq!(start, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn declared_rate_sets_duration() {
        let output = ManualOutput::new();
        let delegate = RecordingDelegate::new();
        let scheduler = scheduler(&output, &delegate);

        scheduler.enqueue(&payload(16000, Some(16000))).unwrap();

        assert_abs_diff_eq!(scheduler.schedule().next_start_time(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn speaking_stops_only_after_last_chunk() {
        let output = ManualOutput::new();
        let delegate = RecordingDelegate::new();
        let scheduler = scheduler(&output, &delegate);

        // Two 1 s chunks: [0, 1) and [1, 2)
        scheduler.enqueue(&payload(24000, None)).unwrap();
        scheduler.enqueue(&payload(24000, None)).unwrap();

        output.advance_to(1.0);
        assert!(!delegate.events().contains(&SessionEvent::SpeakingChanged(false)));

        output.advance_to(2.0);
        let events = delegate.events();
        assert_eq!(events.last(), Some(&SessionEvent::SpeakingChanged(false)));
        assert_eq!(
            events.iter().filter(|e| **e == SessionEvent::SpeakingChanged(true)).count(),
            2
        );
    }

    #[test]
    fn empty_payload_is_ignored() {
        let output = ManualOutput::new();
        let delegate = RecordingDelegate::new();
        let scheduler = scheduler(&output, &delegate);

        assert_eq!(scheduler.enqueue(&payload(0, None)).unwrap(), None);
        assert!(output.scheduled().is_empty());
        assert!(delegate.events().is_empty());
    }

    #[test]
    fn invalid_base64_is_an_encoding_error() {
        let output = ManualOutput::new();
        let delegate = RecordingDelegate::new();
        let scheduler = scheduler(&output, &delegate);

        let bad = AudioPayload {
            data: "not base64!".to_string(),
            sample_rate_hz: None,
        };
        assert!(matches!(scheduler.enqueue(&bad), Err(SessionError::EncodingFailed(_))));
        assert_eq!(scheduler.schedule(), PlaybackSchedule::default());
    }

    #[test]
    fn failed_schedule_does_not_advance() {
        let output = ManualOutput::new();
        let delegate = RecordingDelegate::new();
        let scheduler = scheduler(&output, &delegate);

        output.close().unwrap();
        assert!(scheduler.enqueue(&payload(2400, None)).is_err());
        assert_eq!(scheduler.schedule().next_start_time(), 0.0);
    }
}
