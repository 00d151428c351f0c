//! In-memory fakes for session tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

use crate::models::error::SessionError;
use crate::models::events::{ImageEvent, SessionEvent};
use crate::models::media::{AudioDevice, MediaChunk, PlaybackBuffer, VideoFrame};
use crate::models::message::{AudioPayload, ToolResult};
use crate::models::setup::SessionSetup;
use crate::models::state::SessionState;
use crate::processing::pcm::encode_pcm16;
use crate::traits::audio_output::{AudioOutput, PlaybackEndedCallback};
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider};
use crate::traits::image_generator::ImageGenerator;
use crate::traits::session_delegate::SessionDelegate;
use crate::traits::transport::{Transport, TransportConnection, TransportEvent, TransportSink};
use crate::traits::video_source::VideoSource;

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 2s");
}

/// Base64 PCM16 payload of `samples` quiet samples at the default rate.
pub fn pcm_payload(samples: usize) -> AudioPayload {
    AudioPayload {
        data: STANDARD.encode(encode_pcm16(&vec![0.1; samples])),
        sample_rate_hz: None,
    }
}

#[derive(Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    pub fn states(&self) -> Vec<SessionState> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::StateChanged(state) => Some(*state),
                _ => None,
            })
            .collect()
    }
}

impl SessionDelegate for RecordingDelegate {
    fn on_state_changed(&self, state: SessionState) {
        self.events.lock().push(SessionEvent::StateChanged(state));
    }

    fn on_speaking_changed(&self, speaking: bool) {
        self.events.lock().push(SessionEvent::SpeakingChanged(speaking));
    }

    fn on_loudness(&self, level: f32) {
        self.events.lock().push(SessionEvent::Loudness(level));
    }

    fn on_image_generated(&self, image: &ImageEvent) {
        self.events.lock().push(SessionEvent::ImageGenerated(image.clone()));
    }

    fn on_error(&self, error: &SessionError) {
        self.events.lock().push(SessionEvent::Error(error.clone()));
    }
}

/// Sink that records everything sent through it.
#[derive(Default)]
pub struct RecordingSink {
    media: Mutex<Vec<MediaChunk>>,
    tool_results: Mutex<Vec<ToolResult>>,
    closed: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn media(&self) -> Vec<MediaChunk> {
        self.media.lock().clone()
    }

    pub fn tool_results(&self) -> Vec<ToolResult> {
        self.tool_results.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportSink for RecordingSink {
    async fn send_realtime_input(&self, chunk: MediaChunk) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Disconnected);
        }
        self.media.lock().push(chunk);
        Ok(())
    }

    async fn send_tool_result(&self, result: ToolResult) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Disconnected);
        }
        self.tool_results.lock().push(result);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Forwards to a shared `RecordingSink` so tests keep a handle after `open`.
struct SharedSink(Arc<RecordingSink>);

#[async_trait]
impl TransportSink for SharedSink {
    async fn send_realtime_input(&self, chunk: MediaChunk) -> Result<(), SessionError> {
        self.0.send_realtime_input(chunk).await
    }

    async fn send_tool_result(&self, result: ToolResult) -> Result<(), SessionError> {
        self.0.send_tool_result(result).await
    }

    fn close(&self) {
        self.0.close();
    }
}

/// Transport whose connections are driven by the test.
pub struct FakeTransport {
    sink: Arc<RecordingSink>,
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    setups: Mutex<Vec<SessionSetup>>,
    opens: AtomicUsize,
    fail_with: Mutex<Option<SessionError>>,
    gate: Option<Notify>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    pub fn failing(error: SessionError) -> Arc<Self> {
        let transport = Self::build(None);
        *transport.fail_with.lock() = Some(error);
        Arc::new(transport)
    }

    /// `open` waits until `release_open` is called.
    pub fn gated() -> Arc<Self> {
        Arc::new(Self::build(Some(Notify::new())))
    }

    fn build(gate: Option<Notify>) -> Self {
        Self {
            sink: RecordingSink::new(),
            events: Mutex::new(None),
            setups: Mutex::new(Vec::new()),
            opens: AtomicUsize::new(0),
            fail_with: Mutex::new(None),
            gate,
        }
    }

    pub fn release_open(&self) {
        if let Some(ref gate) = self.gate {
            gate.notify_one();
        }
    }

    pub fn sink(&self) -> Arc<RecordingSink> {
        Arc::clone(&self.sink)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn setups(&self) -> Vec<SessionSetup> {
        self.setups.lock().clone()
    }

    /// Push an event as if it came from the remote side.
    pub async fn push(&self, event: TransportEvent) {
        let tx = self.events.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(&self, setup: &SessionSetup) -> Result<TransportConnection, SessionError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.setups.lock().push(setup.clone());
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        if let Some(error) = self.fail_with.lock().clone() {
            return Err(error);
        }
        let (tx, rx) = mpsc::channel(16);
        *self.events.lock() = Some(tx);
        Ok(TransportConnection {
            sink: Box::new(SharedSink(Arc::clone(&self.sink))),
            events: rx,
        })
    }
}

#[derive(Clone)]
pub struct ScheduledChunk {
    pub start: f64,
    pub duration: f64,
}

/// Output with a manually advanced clock.
#[derive(Default)]
pub struct ManualOutput {
    clock: Mutex<f64>,
    scheduled: Mutex<Vec<ScheduledChunk>>,
    pending: Mutex<Vec<(f64, PlaybackEndedCallback)>>,
    closed: AtomicBool,
}

impl ManualOutput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_time(&self, now: f64) {
        *self.clock.lock() = now;
    }

    /// Move the clock forward, firing callbacks of buffers that have ended.
    pub fn advance_to(&self, now: f64) {
        self.set_time(now);
        let finished: Vec<(f64, PlaybackEndedCallback)> = {
            let mut pending = self.pending.lock();
            let (done, rest) = pending.drain(..).partition(|(end, _)| *end <= now + 1e-9);
            *pending = rest;
            done
        };
        for (_, on_ended) in finished {
            on_ended(now);
        }
    }

    pub fn scheduled(&self) -> Vec<ScheduledChunk> {
        self.scheduled.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl AudioOutput for ManualOutput {
    fn current_time(&self) -> f64 {
        *self.clock.lock()
    }

    fn schedule(
        &self,
        buffer: PlaybackBuffer,
        start_time: f64,
        on_ended: PlaybackEndedCallback,
    ) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::PlaybackFailed("output closed".into()));
        }
        let duration = buffer.duration_secs();
        self.scheduled.lock().push(ScheduledChunk {
            start: start_time,
            duration,
        });
        self.pending.lock().push((start_time + duration, on_ended));
        Ok(())
    }

    fn close(&self) -> Result<(), SessionError> {
        self.closed.store(true, Ordering::SeqCst);
        self.pending.lock().clear();
        Ok(())
    }
}

/// Test-side handle to a `FakeCapture` after it moved into the session.
#[derive(Clone, Default)]
pub struct CaptureHandle {
    callback: Arc<Mutex<Option<AudioBufferCallback>>>,
    stopped: Arc<AtomicBool>,
}

impl CaptureHandle {
    /// Deliver a mono buffer as the device would.
    pub fn push(&self, samples: &[f32], sample_rate: f64) {
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback(samples, sample_rate, 1);
        }
    }

    pub fn is_started(&self) -> bool {
        self.callback.lock().is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

pub struct FakeCapture {
    available: bool,
    start_error: Option<SessionError>,
    handle: CaptureHandle,
}

impl FakeCapture {
    pub fn new() -> (Box<Self>, CaptureHandle) {
        Self::build(true, None)
    }

    pub fn unavailable() -> (Box<Self>, CaptureHandle) {
        Self::build(false, None)
    }

    pub fn failing(error: SessionError) -> (Box<Self>, CaptureHandle) {
        Self::build(true, Some(error))
    }

    fn build(available: bool, start_error: Option<SessionError>) -> (Box<Self>, CaptureHandle) {
        let handle = CaptureHandle::default();
        let capture = Box::new(Self {
            available,
            start_error,
            handle: handle.clone(),
        });
        (capture, handle)
    }
}

impl CaptureProvider for FakeCapture {
    fn is_available(&self) -> bool {
        self.available
    }

    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), SessionError> {
        if let Some(error) = self.start_error.clone() {
            return Err(error);
        }
        *self.handle.callback.lock() = Some(callback);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        self.handle.callback.lock().take();
        self.handle.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn device_info(&self) -> AudioDevice {
        AudioDevice {
            id: "fake".into(),
            name: "Fake Microphone".into(),
            is_default: true,
        }
    }
}

/// Image service returning a fixed answer, optionally held until released.
pub struct ScriptedImages {
    answer: Result<Option<String>, SessionError>,
    prompts: Mutex<Vec<String>>,
    gate: Option<Notify>,
}

impl ScriptedImages {
    pub fn returning(reference: Option<&str>) -> Self {
        Self {
            answer: Ok(reference.map(str::to_string)),
            prompts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn failing(error: SessionError) -> Self {
        Self {
            answer: Err(error),
            prompts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn release(&self) {
        if let Some(ref gate) = self.gate {
            gate.notify_one();
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedImages {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, SessionError> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        self.answer.clone()
    }
}

/// Solid grey RGBA frame of a fixed size.
pub struct StillVideo {
    width: u32,
    height: u32,
}

impl StillVideo {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl VideoSource for StillVideo {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(VideoFrame {
            width: self.width,
            height: self.height,
            rgba: vec![128; (self.width * self.height * 4) as usize],
        })
    }
}
