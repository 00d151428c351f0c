use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::models::diagnostics::SessionDiagnostics;
use crate::models::error::SessionError;
use crate::models::state::SessionState;
use crate::session::encoder::AudioEncoder;
use crate::session::video_sampler::VideoSampler;
use crate::traits::audio_output::AudioOutput;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::session_delegate::{DelegateHandle, SessionDelegate};
use crate::traits::transport::TransportSink;

/// Internal mutable session state, protected by `parking_lot::Mutex`.
struct SessionStatus {
    state: SessionState,
    /// Bumped on every accepted `connect`; stale tasks compare against it.
    generation: u64,
    diagnostics: SessionDiagnostics,
}

/// Everything teardown has to release, in release order.
#[derive(Default)]
pub(crate) struct SessionResources {
    pub video_sampler: Option<VideoSampler>,
    pub encoder: Option<Arc<AudioEncoder>>,
    pub capture: Option<Box<dyn CaptureProvider>>,
    pub output: Option<Arc<dyn AudioOutput>>,
    pub sink: Option<Arc<dyn TransportSink>>,
    pub tasks: Vec<JoinHandle<()>>,
}

impl SessionResources {
    /// Release in order. Every step runs even if an earlier one failed.
    pub fn release(self) {
        if let Some(sampler) = self.video_sampler {
            sampler.stop();
        }

        if let Some(encoder) = self.encoder {
            encoder.detach();
        }

        if let Some(mut capture) = self.capture {
            if let Err(e) = capture.stop() {
                log::warn!("Failed to stop audio capture: {}", e);
            }
        }

        if let Some(output) = self.output {
            if let Err(e) = output.close() {
                log::warn!("Failed to close audio output: {}", e);
            }
        }

        if let Some(sink) = self.sink {
            sink.close();
        }

        for task in self.tasks {
            task.abort();
        }
    }

    fn absorb(&mut self, other: SessionResources) {
        if other.video_sampler.is_some() {
            self.video_sampler = other.video_sampler;
        }
        if other.encoder.is_some() {
            self.encoder = other.encoder;
        }
        if other.capture.is_some() {
            self.capture = other.capture;
        }
        if other.output.is_some() {
            self.output = other.output;
        }
        if other.sink.is_some() {
            self.sink = other.sink;
        }
        self.tasks.extend(other.tasks);
    }
}

/// State shared between the lifecycle manager and every pipeline.
///
/// The `active` flag is the logical transport connection: written only here,
/// read by the encoder, the send pumps and the video sampler.
pub(crate) struct SessionShared {
    status: Mutex<SessionStatus>,
    active: AtomicBool,
    resources: Mutex<SessionResources>,
    delegate: DelegateHandle,
}

impl SessionShared {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(SessionStatus {
                state: SessionState::Idle,
                generation: 0,
                diagnostics: SessionDiagnostics::default(),
            }),
            active: AtomicBool::new(false),
            resources: Mutex::new(SessionResources::default()),
            delegate: DelegateHandle::default(),
        })
    }

    pub fn set_delegate(&self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate.set(delegate);
    }

    pub fn delegate(&self) -> Option<Arc<dyn SessionDelegate>> {
        self.delegate.get()
    }

    pub fn delegate_handle(&self) -> DelegateHandle {
        self.delegate.clone()
    }

    pub fn state(&self) -> SessionState {
        self.status.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Whether `generation` is the current session and it is not shutting down.
    pub fn is_live(&self, generation: u64) -> bool {
        let status = self.status.lock();
        status.generation == generation
            && matches!(status.state, SessionState::Connecting | SessionState::Active)
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.status.lock().diagnostics.clone()
    }

    pub fn record(&self, update: impl FnOnce(&mut SessionDiagnostics)) {
        update(&mut self.status.lock().diagnostics);
    }

    /// Idle/Closed → Connecting. Returns the new generation, or `None` if a
    /// session is already connecting or active.
    pub fn begin_connect(&self) -> Option<u64> {
        let generation = {
            let mut status = self.status.lock();
            if !status.state.accepts_connect() {
                return None;
            }
            status.state = SessionState::Connecting;
            status.generation += 1;
            status.diagnostics = SessionDiagnostics {
                session_id: Some(uuid::Uuid::new_v4().to_string()),
                connected_at: Some(chrono::Utc::now()),
                ..Default::default()
            };
            status.generation
        };
        self.notify_state(SessionState::Connecting);
        Some(generation)
    }

    /// Connecting → Active for the given generation.
    pub fn activate(&self, generation: u64) -> bool {
        {
            let mut status = self.status.lock();
            if status.generation != generation || status.state != SessionState::Connecting {
                return false;
            }
            status.state = SessionState::Active;
            self.active.store(true, Ordering::SeqCst);
        }
        self.notify_state(SessionState::Active);
        true
    }

    /// Hand resources to the session so teardown will release them.
    ///
    /// If the session was torn down in the meantime the resources are given
    /// back to the caller untouched.
    pub fn install(
        &self,
        generation: u64,
        resources: SessionResources,
    ) -> Result<(), SessionResources> {
        let status = self.status.lock();
        let live = status.generation == generation
            && matches!(status.state, SessionState::Connecting | SessionState::Active);
        if !live {
            return Err(resources);
        }
        self.resources.lock().absorb(resources);
        Ok(())
    }

    /// Tear the session down. Idempotent, callable from any state.
    pub fn teardown(&self, error: Option<SessionError>) {
        self.teardown_inner(None, error);
    }

    /// Tear down only if `generation` is still the current session.
    pub fn teardown_generation(&self, generation: u64, error: Option<SessionError>) {
        self.teardown_inner(Some(generation), error);
    }

    fn teardown_inner(&self, expected_generation: Option<u64>, error: Option<SessionError>) {
        let owner = {
            let mut status = self.status.lock();
            if let Some(generation) = expected_generation {
                if status.generation != generation {
                    return;
                }
            }
            let owner = !status.state.is_terminating();
            if owner {
                status.state = SessionState::Closing;
            }
            owner
        };
        self.active.store(false, Ordering::SeqCst);

        if owner {
            self.notify_state(SessionState::Closing);
        }

        let resources = std::mem::take(&mut *self.resources.lock());
        resources.release();

        if !owner {
            return;
        }

        if let Some(ref e) = error {
            log::error!("Live session ended with error: {}", e);
        } else {
            log::info!("Live session closed");
        }

        self.status.lock().state = SessionState::Closed;

        if let Some(delegate) = self.delegate() {
            if let Some(ref e) = error {
                delegate.on_error(e);
            }
            delegate.on_speaking_changed(false);
            delegate.on_state_changed(SessionState::Closed);
        }
    }

    fn notify_state(&self, state: SessionState) {
        if let Some(delegate) = self.delegate() {
            delegate.on_state_changed(state);
        }
    }
}
