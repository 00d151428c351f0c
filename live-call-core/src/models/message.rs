use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A message pushed by the remote agent, already decoded from the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Synthesized speech, base64 16-bit PCM.
    Audio(AudioPayload),
    /// One or more tool invocations carried by a single server message.
    ToolCalls(Vec<ToolCallRequest>),
    SessionClosed,
    SessionError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub data: String,
    /// Rate declared by the message, if any.
    pub sample_rate_hz: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn string_arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

/// Result of a tool call, keyed by the id and name of the originating call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub id: String,
    pub name: String,
    pub response: Value,
}

impl ToolResult {
    pub fn completed(request: &ToolCallRequest, text: &str) -> Self {
        Self {
            id: request.id.clone(),
            name: request.name.clone(),
            response: serde_json::json!({ "result": text }),
        }
    }
}

/// Book-keeping for a tool call between receipt and acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub request: ToolCallRequest,
    pub result: Option<ToolResult>,
}

impl ToolCallRecord {
    pub fn new(request: ToolCallRequest) -> Self {
        Self {
            request,
            result: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }
}
