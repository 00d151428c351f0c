use std::sync::Arc;

use crate::models::config::SessionConfig;
use crate::models::diagnostics::SessionDiagnostics;
use crate::models::error::SessionError;
use crate::models::setup::SessionSetup;
use crate::models::state::SessionState;
use crate::processing::frame::FrameEncoder;
use crate::session::encoder::AudioEncoder;
use crate::session::outbound::{spawn_send_pump, MediaKind, OutboundQueue};
use crate::session::playback::PlaybackScheduler;
use crate::session::router::MessageRouter;
use crate::session::shared::{SessionResources, SessionShared};
use crate::session::tools::{InFlightCalls, ToolExecutor};
use crate::session::video_sampler::VideoSampler;
use crate::traits::audio_output::AudioOutput;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::image_generator::ImageGenerator;
use crate::traits::session_delegate::SessionDelegate;
use crate::traits::transport::{Transport, TransportConnection, TransportSink};
use crate::traits::video_source::VideoSource;

/// Devices a session runs on. Owned by the session until it closes.
pub struct SessionMedia {
    pub capture: Box<dyn CaptureProvider>,
    pub output: Arc<dyn AudioOutput>,
    /// Optional camera; without it only audio is streamed.
    pub video: Option<Arc<dyn VideoSource>>,
}

/// A real-time voice (and optionally video) session with a remote agent.
///
/// One session at a time: `connect` while connecting or active is a no-op.
/// After `disconnect` (or a remote close) the same instance can connect again.
///
/// # Example
/// ```ignore
/// let mut session = LiveSession::new(transport, images, SessionConfig::default());
/// session.set_delegate(delegate);
/// session.connect(SessionMedia { capture, output, video: None }).await?;
/// // ... talk ...
/// session.disconnect();
/// ```
pub struct LiveSession {
    transport: Arc<dyn Transport>,
    images: Arc<dyn ImageGenerator>,
    config: SessionConfig,
    shared: Arc<SessionShared>,
    tool_calls: InFlightCalls,
}

impl LiveSession {
    pub fn new(
        transport: Arc<dyn Transport>,
        images: Arc<dyn ImageGenerator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            transport,
            images,
            config,
            shared: SessionShared::new(),
            tool_calls: InFlightCalls::default(),
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.shared.set_delegate(delegate);
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.shared.diagnostics()
    }

    /// Number of tool calls received but not yet acknowledged.
    pub fn pending_tool_calls(&self) -> usize {
        self.tool_calls.lock().len()
    }

    /// Open the transport and start streaming.
    ///
    /// Resolves once the session is `Active`. On failure every resource
    /// acquired so far is released and the session ends up `Closed`.
    pub async fn connect(&self, media: SessionMedia) -> Result<(), SessionError> {
        self.config
            .validate()
            .map_err(SessionError::ConfigurationFailed)?;

        let Some(generation) = self.shared.begin_connect() else {
            log::debug!("connect() ignored, session is {}", self.shared.state());
            return Ok(());
        };

        let SessionMedia {
            mut capture,
            output,
            video,
        } = media;

        if !capture.is_available() {
            let device = capture.device_info();
            log::error!("Microphone '{}' is not available", device.name);
            SessionResources {
                output: Some(output),
                ..Default::default()
            }
            .release();
            self.shared.teardown_generation(generation, None);
            return Err(SessionError::CaptureDenied(format!(
                "microphone '{}' is not available",
                device.name
            )));
        }

        // Installed first so a disconnect during open releases the speaker
        if let Err(unclaimed) = self.shared.install(
            generation,
            SessionResources {
                output: Some(Arc::clone(&output)),
                ..Default::default()
            },
        ) {
            unclaimed.release();
            return Err(SessionError::Disconnected);
        }

        log::info!("Opening live session (voice {})", self.config.voice_name);
        let setup = SessionSetup::from_config(&self.config);
        let TransportConnection { sink, events } = match self.transport.open(&setup).await {
            Ok(connection) => connection,
            Err(e) => {
                let error = match e {
                    SessionError::TransportError(_) => e,
                    other => SessionError::TransportError(other.to_string()),
                };
                log::error!("Failed to open transport: {}", error);
                self.shared.teardown_generation(generation, None);
                return Err(error);
            }
        };
        let sink: Arc<dyn TransportSink> = Arc::from(sink);

        if !self.shared.is_live(generation) {
            log::info!("Session was disconnected while opening, closing late connection");
            sink.close();
            return Err(SessionError::Disconnected);
        }

        let mut resources = SessionResources {
            sink: Some(Arc::clone(&sink)),
            ..Default::default()
        };

        let (audio_queue, audio_rx) = OutboundQueue::new(MediaKind::Audio, Arc::clone(&self.shared));
        resources.tasks.push(spawn_send_pump(
            audio_rx,
            MediaKind::Audio,
            Arc::clone(&sink),
            Arc::clone(&self.shared),
        ));

        let playback = PlaybackScheduler::new(
            Arc::clone(&output),
            self.config.output_sample_rate,
            self.config.speaking_tolerance_secs,
            self.shared.delegate_handle(),
        );
        let tools = ToolExecutor::new(
            Arc::clone(&self.images),
            Arc::clone(&sink),
            Arc::clone(&self.shared),
            generation,
            self.config.tools.clone(),
            Arc::clone(&self.tool_calls),
        );
        let router = MessageRouter::new(playback, tools, Arc::clone(&self.shared), generation);
        resources.tasks.push(tokio::spawn(router.run(events)));

        let encoder = AudioEncoder::new(
            Arc::clone(&self.shared),
            audio_queue,
            self.config.capture_chunk_frames,
        );
        if let Err(e) = capture.start(encoder.callback()) {
            let error = match e {
                SessionError::CaptureDenied(_) | SessionError::DeviceNotAvailable => e,
                other => SessionError::CaptureDenied(other.to_string()),
            };
            log::error!("Failed to start microphone: {}", error);
            encoder.detach();
            resources.release();
            self.shared.teardown_generation(generation, None);
            return Err(error);
        }
        log::info!("Microphone started: {}", capture.device_info().name);
        resources.encoder = Some(encoder);
        resources.capture = Some(capture);

        if let Some(source) = video {
            let (video_queue, video_rx) =
                OutboundQueue::new(MediaKind::Video, Arc::clone(&self.shared));
            resources.tasks.push(spawn_send_pump(
                video_rx,
                MediaKind::Video,
                Arc::clone(&sink),
                Arc::clone(&self.shared),
            ));
            resources.video_sampler = Some(VideoSampler::start(
                source,
                FrameEncoder::new(
                    self.config.video.downscale_factor,
                    self.config.video.jpeg_quality,
                ),
                self.config.video.frame_interval(),
                video_queue,
                Arc::clone(&self.shared),
            ));
        }

        if let Err(unclaimed) = self.shared.install(generation, resources) {
            unclaimed.release();
            return Err(SessionError::Disconnected);
        }

        if !self.shared.activate(generation) {
            return Err(SessionError::Disconnected);
        }
        log::info!("Live session active");
        Ok(())
    }

    /// Stop everything and move to `Closed`. Safe to call in any state.
    pub fn disconnect(&self) {
        log::info!("Disconnecting live session");
        self.shared.teardown(None);
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        let state = self.shared.state();
        if !state.is_idle() && !state.is_closed() {
            self.shared.teardown(None);
        }
    }
}
