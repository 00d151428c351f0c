use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::models::error::SessionError;
use crate::models::events::{ImageEvent, SessionEvent};
use crate::models::state::SessionState;

/// Event delegate for live session notifications.
///
/// Methods are called from whichever context produced the event: the audio
/// capture thread (loudness), the audio output thread (speaking stopped) or a
/// runtime task. Implementations should marshal to a UI thread if needed and
/// must return quickly.
pub trait SessionDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: SessionState);

    /// Called when the agent starts or stops speaking.
    fn on_speaking_changed(&self, speaking: bool);

    /// Called with the raw RMS of every captured chunk.
    fn on_loudness(&self, level: f32);

    /// Called when a tool call produced an image.
    fn on_image_generated(&self, image: &ImageEvent);

    /// Called when the session ends because of an error.
    fn on_error(&self, error: &SessionError);
}

/// Replaceable delegate reference, shared by everything that emits events.
///
/// Emitters read it at emit time, so a delegate installed later is seen by
/// components built earlier.
#[derive(Clone, Default)]
pub struct DelegateHandle {
    inner: Arc<RwLock<Option<Arc<dyn SessionDelegate>>>>,
}

impl DelegateHandle {
    pub fn new(delegate: Option<Arc<dyn SessionDelegate>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(delegate)),
        }
    }

    pub fn set(&self, delegate: Arc<dyn SessionDelegate>) {
        *self.inner.write() = Some(delegate);
    }

    pub fn get(&self) -> Option<Arc<dyn SessionDelegate>> {
        self.inner.read().clone()
    }
}

/// Delegate that turns callbacks into a stream of `SessionEvent`s.
pub struct ChannelDelegate {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelDelegate {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn emit(&self, event: SessionEvent) {
        // Receiver gone means nobody is listening anymore
        let _ = self.tx.send(event);
    }
}

impl SessionDelegate for ChannelDelegate {
    fn on_state_changed(&self, state: SessionState) {
        self.emit(SessionEvent::StateChanged(state));
    }

    fn on_speaking_changed(&self, speaking: bool) {
        self.emit(SessionEvent::SpeakingChanged(speaking));
    }

    fn on_loudness(&self, level: f32) {
        self.emit(SessionEvent::Loudness(level));
    }

    fn on_image_generated(&self, image: &ImageEvent) {
        self.emit(SessionEvent::ImageGenerated(image.clone()));
    }

    fn on_error(&self, error: &SessionError) {
        self.emit(SessionEvent::Error(error.clone()));
    }
}
