use std::sync::Arc;

use tokio::sync::mpsc;

use crate::models::error::SessionError;
use crate::models::message::InboundMessage;
use crate::session::playback::PlaybackScheduler;
use crate::session::shared::SessionShared;
use crate::session::tools::ToolExecutor;
use crate::traits::transport::TransportEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Continue,
    /// The session is over; stop reading.
    Terminated,
}

/// Dispatches inbound agent messages to playback, tools or teardown.
pub struct MessageRouter {
    playback: PlaybackScheduler,
    tools: ToolExecutor,
    shared: Arc<SessionShared>,
    generation: u64,
}

impl MessageRouter {
    pub(crate) fn new(
        playback: PlaybackScheduler,
        tools: ToolExecutor,
        shared: Arc<SessionShared>,
        generation: u64,
    ) -> Self {
        Self {
            playback,
            tools,
            shared,
            generation,
        }
    }

    /// Handle one message. Never blocks on tool execution.
    pub fn route(&self, message: InboundMessage) -> RouteOutcome {
        if !self.shared.is_live(self.generation) {
            log::debug!("Ignoring inbound message, session is {}", self.shared.state());
            return RouteOutcome::Terminated;
        }
        self.shared.record(|d| d.inbound_messages += 1);

        match message {
            InboundMessage::Audio(payload) => {
                match self.playback.enqueue(&payload) {
                    Ok(Some(_)) => self.shared.record(|d| d.playback_chunks_scheduled += 1),
                    Ok(None) => {}
                    Err(e) => log::warn!("Dropping audio chunk: {}", e),
                }
                RouteOutcome::Continue
            }
            InboundMessage::ToolCalls(calls) => {
                for call in calls {
                    self.tools.dispatch(call);
                }
                RouteOutcome::Continue
            }
            InboundMessage::SessionClosed => {
                log::info!("Remote side closed the session");
                self.shared.teardown_generation(self.generation, None);
                RouteOutcome::Terminated
            }
            InboundMessage::SessionError(reason) => {
                self.shared.teardown_generation(
                    self.generation,
                    Some(SessionError::TransportError(reason)),
                );
                RouteOutcome::Terminated
            }
        }
    }

    /// Consume transport events until the session ends.
    pub async fn run(self, mut events: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            let message = match event {
                TransportEvent::Message(message) => message,
                TransportEvent::Closed => InboundMessage::SessionClosed,
                TransportEvent::Error(reason) => InboundMessage::SessionError(reason),
            };
            if self.route(message) == RouteOutcome::Terminated {
                return;
            }
        }

        // Event stream ended without an explicit close
        self.shared.teardown_generation(self.generation, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::{ToolConfig, ROAST_IMAGE_TOOL};
    use crate::models::events::SessionEvent;
    use crate::models::message::{AudioPayload, ToolCallRequest};
    use crate::models::state::SessionState;
    use crate::session::test_support::{
        pcm_payload, wait_until, ManualOutput, RecordingDelegate, RecordingSink, ScriptedImages,
    };
    use crate::session::tools::InFlightCalls;
    use crate::traits::audio_output::AudioOutput;
    use crate::traits::image_generator::ImageGenerator;
    use crate::traits::session_delegate::SessionDelegate;
    use crate::traits::transport::TransportSink;

    struct Fixture {
        router: MessageRouter,
        output: Arc<ManualOutput>,
        sink: Arc<RecordingSink>,
        images: Arc<ScriptedImages>,
        delegate: Arc<RecordingDelegate>,
        shared: Arc<SessionShared>,
    }

    fn fixture(images: ScriptedImages) -> Fixture {
        let shared = SessionShared::new();
        let delegate = RecordingDelegate::new();
        shared.set_delegate(Arc::clone(&delegate) as Arc<dyn SessionDelegate>);
        let generation = shared.begin_connect().unwrap();
        shared.activate(generation);

        let output = ManualOutput::new();
        let sink = RecordingSink::new();
        let images = Arc::new(images);
        let playback = PlaybackScheduler::new(
            Arc::clone(&output) as Arc<dyn AudioOutput>,
            24000,
            0.2,
            shared.delegate_handle(),
        );
        let tools = ToolExecutor::new(
            Arc::clone(&images) as Arc<dyn ImageGenerator>,
            Arc::clone(&sink) as Arc<dyn TransportSink>,
            Arc::clone(&shared),
            generation,
            ToolConfig::default(),
            InFlightCalls::default(),
        );
        Fixture {
            router: MessageRouter::new(playback, tools, Arc::clone(&shared), generation),
            output,
            sink,
            images,
            delegate,
            shared,
        }
    }

    fn roast(id: &str) -> ToolCallRequest {
        let mut args = serde_json::Map::new();
        args.insert("description".into(), serde_json::json!("glasses"));
        ToolCallRequest {
            id: id.into(),
            name: ROAST_IMAGE_TOOL.into(),
            args,
        }
    }

    #[tokio::test]
    async fn audio_is_scheduled() {
        let f = fixture(ScriptedImages::returning(None));

        let outcome = f.router.route(InboundMessage::Audio(pcm_payload(2400)));

        assert_eq!(outcome, RouteOutcome::Continue);
        assert_eq!(f.output.scheduled().len(), 1);
        assert_eq!(f.shared.diagnostics().playback_chunks_scheduled, 1);
    }

    #[tokio::test]
    async fn undecodable_audio_is_dropped() {
        let f = fixture(ScriptedImages::returning(None));

        let outcome = f.router.route(InboundMessage::Audio(AudioPayload {
            data: "***".into(),
            sample_rate_hz: None,
        }));

        assert_eq!(outcome, RouteOutcome::Continue);
        assert!(f.output.scheduled().is_empty());
        assert_eq!(f.shared.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn audio_keeps_flowing_while_tool_runs() {
        let f = fixture(ScriptedImages::returning(Some("data:image/png;base64,AAAA")).gated());

        f.router.route(InboundMessage::ToolCalls(vec![roast("slow")]));
        f.router.route(InboundMessage::Audio(pcm_payload(2400)));
        f.router.route(InboundMessage::Audio(pcm_payload(2400)));

        assert_eq!(f.output.scheduled().len(), 2);
        assert!(f.sink.tool_results().is_empty());

        f.images.release();
        let sink = Arc::clone(&f.sink);
        wait_until(move || sink.tool_results().len() == 1).await;
    }

    #[tokio::test]
    async fn every_call_in_a_message_is_handled() {
        let f = fixture(ScriptedImages::returning(None));

        f.router
            .route(InboundMessage::ToolCalls(vec![roast("one"), roast("two")]));

        let sink = Arc::clone(&f.sink);
        wait_until(move || sink.tool_results().len() == 2).await;
        assert_eq!(f.shared.diagnostics().tool_calls_started, 2);
    }

    #[tokio::test]
    async fn remote_close_tears_down_once() {
        let f = fixture(ScriptedImages::returning(None));

        assert_eq!(f.router.route(InboundMessage::SessionClosed), RouteOutcome::Terminated);
        assert_eq!(
            f.router.route(InboundMessage::SessionError("late".into())),
            RouteOutcome::Terminated
        );

        assert_eq!(f.shared.state(), SessionState::Closed);
        let closed = f
            .delegate
            .events()
            .into_iter()
            .filter(|e| *e == SessionEvent::StateChanged(SessionState::Closed))
            .count();
        assert_eq!(closed, 1);
        assert!(!f
            .delegate
            .events()
            .iter()
            .any(|e| matches!(e, SessionEvent::Error(_))));
    }

    #[tokio::test]
    async fn transport_error_is_reported() {
        let f = fixture(ScriptedImages::returning(None));

        f.router.route(InboundMessage::SessionError("socket reset".into()));

        assert_eq!(f.shared.state(), SessionState::Closed);
        assert!(f.delegate.events().contains(&SessionEvent::Error(
            SessionError::TransportError("socket reset".into())
        )));
    }

    #[tokio::test]
    async fn messages_after_close_are_ignored() {
        let f = fixture(ScriptedImages::returning(None));
        f.shared.teardown(None);

        let outcome = f.router.route(InboundMessage::Audio(pcm_payload(2400)));

        assert_eq!(outcome, RouteOutcome::Terminated);
        assert!(f.output.scheduled().is_empty());
    }

    #[tokio::test]
    async fn ended_stream_closes_session() {
        let f = fixture(ScriptedImages::returning(None));
        let (tx, rx) = mpsc::channel(4);
        tx.send(TransportEvent::Message(InboundMessage::Audio(pcm_payload(2400))))
            .await
            .unwrap();
        drop(tx);

        let Fixture {
            router,
            output,
            shared,
            ..
        } = f;
        router.run(rx).await;

        assert_eq!(output.scheduled().len(), 1);
        assert_eq!(shared.state(), SessionState::Closed);
    }
}
