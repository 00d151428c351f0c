//! Frame-counted playback clock with scheduled mono buffers.
//!
//! The clock only advances when the device pulls samples through
//! [`PlaybackTimeline::render`], so scheduled start times line up with what
//! the listener actually hears.

use parking_lot::Mutex;

use live_call_core::processing::pcm::resample_to_length;
use live_call_core::{AudioOutput, PlaybackBuffer, PlaybackEndedCallback, SessionError};

struct Voice {
    samples: Vec<f32>,
    start_frame: u64,
    on_ended: PlaybackEndedCallback,
}

impl Voice {
    fn end_frame(&self) -> u64 {
        self.start_frame + self.samples.len() as u64
    }
}

#[derive(Default)]
struct TimelineState {
    frames_rendered: u64,
    voices: Vec<Voice>,
    closed: bool,
}

/// Mixes scheduled buffers into interleaved device frames.
pub struct PlaybackTimeline {
    sample_rate: u32,
    state: Mutex<TimelineState>,
}

impl PlaybackTimeline {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            state: Mutex::new(TimelineState::default()),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Buffers scheduled and not yet finished.
    pub fn pending(&self) -> usize {
        self.state.lock().voices.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn frame_at(&self, time: f64) -> u64 {
        (time * self.sample_rate as f64).round() as u64
    }

    /// Fill `out` with the next `out.len() / channels` frames.
    ///
    /// Each scheduled mono buffer is copied into every channel. Buffers that
    /// finish inside this block have their callbacks invoked after the lock
    /// is released, with the clock at the end of the block.
    pub fn render(&self, out: &mut [f32], channels: u16) {
        out.fill(0.0);
        let channels = channels.max(1) as usize;
        let frames = (out.len() / channels) as u64;

        let (finished, now) = {
            let mut state = self.state.lock();
            let block_start = state.frames_rendered;
            let block_end = block_start + frames;

            for voice in &state.voices {
                let from = voice.start_frame.max(block_start);
                let to = voice.end_frame().min(block_end);
                for frame in from..to {
                    let sample = voice.samples[(frame - voice.start_frame) as usize];
                    let base = (frame - block_start) as usize * channels;
                    for slot in &mut out[base..base + channels] {
                        *slot += sample;
                    }
                }
            }

            state.frames_rendered = block_end;
            let (finished, pending): (Vec<Voice>, Vec<Voice>) = state
                .voices
                .drain(..)
                .partition(|voice| voice.end_frame() <= block_end);
            state.voices = pending;
            (finished, block_end as f64 / self.sample_rate as f64)
        };

        for slot in out.iter_mut() {
            *slot = slot.clamp(-1.0, 1.0);
        }
        for voice in finished {
            (voice.on_ended)(now);
        }
    }
}

impl AudioOutput for PlaybackTimeline {
    fn current_time(&self) -> f64 {
        self.state.lock().frames_rendered as f64 / self.sample_rate as f64
    }

    fn schedule(
        &self,
        buffer: PlaybackBuffer,
        start_time: f64,
        on_ended: PlaybackEndedCallback,
    ) -> Result<(), SessionError> {
        // Both ends are rounded to frames; back-to-back buffers meet exactly.
        let start_time = start_time.max(0.0);
        let requested = self.frame_at(start_time);
        let end = self.frame_at(start_time + buffer.duration_secs());
        let samples = resample_to_length(&buffer.samples, (end - requested) as usize);

        let mut state = self.state.lock();
        if state.closed {
            return Err(SessionError::PlaybackFailed("output is closed".into()));
        }
        let start_frame = requested.max(state.frames_rendered);
        state.voices.push(Voice {
            samples,
            start_frame,
            on_ended,
        });
        Ok(())
    }

    fn close(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.closed = true;
        state.voices.clear();
        Ok(())
    }
}
