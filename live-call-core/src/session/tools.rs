use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::models::config::{ToolConfig, ROAST_IMAGE_TOOL};
use crate::models::events::ImageEvent;
use crate::models::message::{ToolCallRecord, ToolCallRequest, ToolResult};
use crate::session::shared::SessionShared;
use crate::traits::image_generator::ImageGenerator;
use crate::traits::transport::TransportSink;

/// Tool calls received but not yet acknowledged, keyed by call id.
pub type InFlightCalls = Arc<Mutex<HashMap<String, ToolCallRecord>>>;

/// Runs tool calls off the message path and acknowledges each one exactly once.
#[derive(Clone)]
pub struct ToolExecutor {
    images: Arc<dyn ImageGenerator>,
    sink: Arc<dyn TransportSink>,
    shared: Arc<SessionShared>,
    generation: u64,
    config: ToolConfig,
    in_flight: InFlightCalls,
}

impl ToolExecutor {
    pub(crate) fn new(
        images: Arc<dyn ImageGenerator>,
        sink: Arc<dyn TransportSink>,
        shared: Arc<SessionShared>,
        generation: u64,
        config: ToolConfig,
        in_flight: InFlightCalls,
    ) -> Self {
        Self {
            images,
            sink,
            shared,
            generation,
            config,
            in_flight,
        }
    }

    /// Start handling one call. Returns immediately.
    ///
    /// Unknown tools are logged and get no result.
    pub fn dispatch(&self, request: ToolCallRequest) -> Option<JoinHandle<()>> {
        if request.name != ROAST_IMAGE_TOOL {
            log::warn!("Ignoring call to unknown tool '{}' ({})", request.name, request.id);
            return None;
        }

        log::info!("Tool call {} started: {}", request.id, request.name);
        self.in_flight
            .lock()
            .insert(request.id.clone(), ToolCallRecord::new(request.clone()));
        self.shared.record(|d| d.tool_calls_started += 1);

        let executor = self.clone();
        Some(tokio::spawn(async move { executor.run(request).await }))
    }

    async fn run(self, request: ToolCallRequest) {
        let image = self.generate_image(&request).await;

        if !self.shared.is_live(self.generation) {
            log::debug!("Session closed, discarding result of tool call {}", request.id);
            self.in_flight.lock().remove(&request.id);
            return;
        }

        if let Some(reference) = image {
            let event = ImageEvent::new(reference, self.config.image_display_duration());
            if let Some(delegate) = self.shared.delegate() {
                delegate.on_image_generated(&event);
            }
        }

        let result = ToolResult::completed(&request, &self.config.acknowledgement);
        if let Some(record) = self.in_flight.lock().get_mut(&request.id) {
            record.result = Some(result.clone());
        }

        match self.sink.send_tool_result(result).await {
            Ok(()) => {
                self.shared.record(|d| d.tool_results_sent += 1);
                log::info!("Tool call {} acknowledged", request.id);
            }
            Err(e) => log::warn!("Failed to send result for tool call {}: {}", request.id, e),
        }
        self.in_flight.lock().remove(&request.id);
    }

    /// Best effort. Every failure ends up as `None`.
    async fn generate_image(&self, request: &ToolCallRequest) -> Option<String> {
        let Some(description) = request.string_arg("description") else {
            log::warn!("Tool call {} has no description, skipping image", request.id);
            return None;
        };

        let prompt = format!("{}{}", description, self.config.image_prompt_suffix);
        match self.images.generate(&prompt).await {
            Ok(Some(reference)) => Some(reference),
            Ok(None) => {
                log::warn!("Image service returned no image for tool call {}", request.id);
                None
            }
            Err(e) => {
                log::warn!("Image generation failed for tool call {}: {}", request.id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::error::SessionError;
    use crate::models::events::SessionEvent;
    use crate::session::test_support::{wait_until, RecordingDelegate, RecordingSink, ScriptedImages};
    use crate::traits::session_delegate::SessionDelegate;
    use serde_json::json;

    struct Fixture {
        executor: ToolExecutor,
        sink: Arc<RecordingSink>,
        images: Arc<ScriptedImages>,
        delegate: Arc<RecordingDelegate>,
        shared: Arc<SessionShared>,
        in_flight: InFlightCalls,
    }

    fn fixture(images: ScriptedImages) -> Fixture {
        let shared = SessionShared::new();
        let delegate = RecordingDelegate::new();
        shared.set_delegate(Arc::clone(&delegate) as Arc<dyn SessionDelegate>);
        let generation = shared.begin_connect().unwrap();
        shared.activate(generation);

        let sink = RecordingSink::new();
        let images = Arc::new(images);
        let in_flight = InFlightCalls::default();
        let executor = ToolExecutor::new(
            Arc::clone(&images) as Arc<dyn ImageGenerator>,
            Arc::clone(&sink) as Arc<dyn TransportSink>,
            Arc::clone(&shared),
            generation,
            ToolConfig::default(),
            Arc::clone(&in_flight),
        );
        Fixture {
            executor,
            sink,
            images,
            delegate,
            shared,
            in_flight,
        }
    }

    fn roast_call(id: &str, description: Option<&str>) -> ToolCallRequest {
        let mut args = serde_json::Map::new();
        if let Some(description) = description {
            args.insert("description".into(), json!(description));
        }
        ToolCallRequest {
            id: id.into(),
            name: ROAST_IMAGE_TOOL.into(),
            args,
        }
    }

    fn image_events(delegate: &RecordingDelegate) -> Vec<String> {
        delegate
            .events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::ImageGenerated(image) => Some(image.reference),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn success_emits_image_then_acknowledges() {
        let f = fixture(ScriptedImages::returning(Some("data:image/png;base64,AAAA")));

        f.executor
            .dispatch(roast_call("c1", Some("big ears")))
            .unwrap()
            .await
            .unwrap();

        assert_eq!(
            f.images.prompts(),
            vec!["big ears, funny caricature style, distorted, roast".to_string()]
        );
        assert_eq!(image_events(&f.delegate), vec!["data:image/png;base64,AAAA".to_string()]);
        let results = f.sink.tool_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "c1");
        assert_eq!(results[0].name, ROAST_IMAGE_TOOL);
        assert_eq!(results[0].response, json!({ "result": "Image generated successfully." }));
        assert!(f.in_flight.lock().is_empty());
        assert_eq!(f.shared.diagnostics().tool_results_sent, 1);
    }

    #[tokio::test]
    async fn failed_generation_still_acknowledges() {
        let f = fixture(ScriptedImages::failing(SessionError::ToolExecutionFailed(
            "quota".into(),
        )));

        f.executor
            .dispatch(roast_call("c2", Some("hat")))
            .unwrap()
            .await
            .unwrap();

        assert!(image_events(&f.delegate).is_empty());
        assert_eq!(f.sink.tool_results().len(), 1);
        assert_eq!(f.sink.tool_results()[0].id, "c2");
    }

    #[tokio::test]
    async fn empty_generation_still_acknowledges() {
        let f = fixture(ScriptedImages::returning(None));

        f.executor
            .dispatch(roast_call("c3", Some("hair")))
            .unwrap()
            .await
            .unwrap();

        assert!(image_events(&f.delegate).is_empty());
        assert_eq!(f.sink.tool_results().len(), 1);
    }

    #[tokio::test]
    async fn missing_description_skips_generation() {
        let f = fixture(ScriptedImages::returning(Some("data:image/png;base64,AAAA")));

        f.executor.dispatch(roast_call("c4", None)).unwrap().await.unwrap();

        assert!(f.images.prompts().is_empty());
        assert_eq!(f.sink.tool_results().len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_gets_no_result() {
        let f = fixture(ScriptedImages::returning(None));
        let call = ToolCallRequest {
            id: "x".into(),
            name: "order_pizza".into(),
            args: Default::default(),
        };

        assert!(f.executor.dispatch(call).is_none());
        assert!(f.sink.tool_results().is_empty());
        assert!(f.in_flight.lock().is_empty());
    }

    #[tokio::test]
    async fn result_after_close_is_discarded() {
        let images = ScriptedImages::returning(Some("data:image/png;base64,AAAA")).gated();
        let f = fixture(images);

        let handle = f.executor.dispatch(roast_call("c5", Some("nose"))).unwrap();
        assert_eq!(f.in_flight.lock().len(), 1);

        f.shared.teardown(None);
        f.images.release();
        handle.await.unwrap();

        assert!(image_events(&f.delegate).is_empty());
        assert!(f.sink.tool_results().is_empty());
        assert!(f.in_flight.lock().is_empty());
    }

    #[tokio::test]
    async fn concurrent_calls_resolve_independently() {
        let f = fixture(ScriptedImages::returning(Some("data:image/png;base64,AAAA")));

        f.executor.dispatch(roast_call("a", Some("one")));
        f.executor.dispatch(roast_call("b", Some("two")));

        let sink = Arc::clone(&f.sink);
        wait_until(move || sink.tool_results().len() == 2).await;

        let mut ids: Vec<String> = f.sink.tool_results().into_iter().map(|r| r.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
