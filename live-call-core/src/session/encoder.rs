use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::media::AudioInputChunk;
use crate::processing::chunker::SampleChunker;
use crate::processing::pcm::{downmix_to_mono, encode_pcm16, rms_level};
use crate::session::outbound::OutboundQueue;
use crate::session::shared::SessionShared;
use crate::traits::capture_provider::AudioBufferCallback;

/// Encode one fixed-size chunk of mono samples for the wire.
///
/// Returns the raw RMS loudness of the chunk alongside the encoded chunk.
pub fn encode_chunk(samples: &[f32], sample_rate_hz: u32) -> (f32, AudioInputChunk) {
    let level = rms_level(samples);
    let chunk = AudioInputChunk {
        pcm: encode_pcm16(samples),
        sample_rate_hz,
    };
    (level, chunk)
}

/// Microphone pipeline: capture callback → mono chunks → PCM16 → outbound queue.
///
/// Runs on the capture thread. Nothing here blocks on the transport.
pub struct AudioEncoder {
    shared: Arc<SessionShared>,
    queue: OutboundQueue,
    chunker: Mutex<SampleChunker>,
    attached: AtomicBool,
}

impl AudioEncoder {
    pub(crate) fn new(shared: Arc<SessionShared>, queue: OutboundQueue, chunk_frames: usize) -> Arc<Self> {
        Arc::new(Self {
            shared,
            queue,
            chunker: Mutex::new(SampleChunker::new(chunk_frames)),
            attached: AtomicBool::new(true),
        })
    }

    /// Callback to hand to a `CaptureProvider`.
    pub fn callback(self: &Arc<Self>) -> AudioBufferCallback {
        let encoder = Arc::clone(self);
        Arc::new(move |samples: &[f32], sample_rate: f64, channels: u16| {
            encoder.process(samples, sample_rate, channels);
        })
    }

    /// Handle one buffer from the capture device.
    pub fn process(&self, samples: &[f32], sample_rate: f64, channels: u16) {
        if !self.attached.load(Ordering::SeqCst) || samples.is_empty() {
            return;
        }

        let mono = downmix_to_mono(samples, channels.max(1) as usize);
        let frame_count = mono.len() as u64;
        self.shared.record(|d| {
            d.capture_callback_count += 1;
            d.capture_samples_total += frame_count;
            if d.capture_format.is_empty() {
                d.capture_format = format!("{} Hz, {} ch", sample_rate, channels);
            }
        });

        let chunks = self.chunker.lock().push(&mono);
        if chunks.is_empty() {
            return;
        }
        if !self.shared.is_active() {
            let dropped = chunks.len() as u64;
            self.shared.record(|d| d.audio_chunks_dropped += dropped);
            return;
        }

        // One device buffer is queued as one batch
        let rate = sample_rate.round() as u32;
        let delegate = self.shared.delegate();
        let batch = chunks
            .iter()
            .map(|samples| {
                let (level, chunk) = encode_chunk(samples, rate);
                if let Some(delegate) = &delegate {
                    delegate.on_loudness(level);
                }
                chunk.into_media_chunk()
            })
            .collect();
        self.queue.offer_batch(batch);
    }

    /// Stop accepting buffers. Later callbacks from the device are ignored.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
        self.chunker.lock().reset();
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}
