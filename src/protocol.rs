//! Command types shared between the translator and the orchestrator, plus
//! the constants of the tool-server wire protocol.
//!
//! The tool server speaks a minimal JSON-RPC dialect over HTTP POST:
//! `call_tool` executes one browser operation, `list_tools` enumerates the
//! available operations and doubles as the liveness handshake.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC version tag sent with every request
pub const JSONRPC_VERSION: &str = "2.0";

/// Method name for executing a single tool
pub const METHOD_CALL_TOOL: &str = "call_tool";

/// Method name for the capability/liveness handshake
pub const METHOD_LIST_TOOLS: &str = "list_tools";

/// Step identifier carried by the synthetic trailing stop command
pub const SYNTHETIC_STOP_STEP_ID: &str = "stop";

/// Operation kinds understood by the tool server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolName {
    /// Launch the browser session (no arguments)
    Start,
    /// Navigate to a URL (requires `url`)
    Open,
    /// Fill a form field (requires `selector` and `value`)
    Fill,
    /// Click an element (requires `selector`)
    Click,
    /// Wait until a text is visible (requires `text`)
    AssertText,
    /// Capture the current page (`path` optional, server picks a default)
    Screenshot,
    /// Tear down the browser session (no arguments)
    Stop,
}

impl ToolName {
    /// Wire name of the operation as the tool server expects it
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Start => "start",
            ToolName::Open => "open",
            ToolName::Fill => "fill",
            ToolName::Click => "click",
            ToolName::AssertText => "assertText",
            ToolName::Screenshot => "screenshot",
            ToolName::Stop => "stop",
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single automation instruction.
///
/// Produced once by the translator (or synthesized by the orchestrator for
/// the mandatory trailing stop), immutable afterwards, executed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Operation to execute
    pub name: ToolName,

    /// Named string-valued parameters (URL, selector, text, file path)
    #[serde(default)]
    pub arguments: Map<String, Value>,

    /// Identifier correlating the command back to a line of the source
    /// document (e.g. "A.1"); absent when the model omitted it
    #[serde(default, rename = "stepId", skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

impl ToolCall {
    /// Create a command with no arguments
    pub fn new(name: ToolName) -> Self {
        Self {
            name,
            arguments: Map::new(),
            step_id: None,
        }
    }

    /// Attach a step identifier
    pub fn step_id(mut self, id: impl Into<String>) -> Self {
        self.step_id = Some(id.into());
        self
    }

    /// Add a string argument
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments
            .insert(key.into(), Value::String(value.into()));
        self
    }

    /// The synthetic stop command appended when a scenario does not end the
    /// browser session itself
    pub fn synthetic_stop() -> Self {
        Self::new(ToolName::Stop).step_id(SYNTHETIC_STOP_STEP_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tool_name_wire_format() {
        assert_eq!(
            serde_json::to_string(&ToolName::AssertText).unwrap(),
            "\"assertText\""
        );
        assert_eq!(ToolName::AssertText.to_string(), "assertText");
        assert_eq!(
            serde_json::from_str::<ToolName>("\"screenshot\"").unwrap(),
            ToolName::Screenshot
        );
    }

    #[test]
    fn test_tool_call_deserializes_translator_output() {
        let call: ToolCall = serde_json::from_str(
            r#"{"name": "open", "arguments": {"url": "http://localhost:3000"}, "stepId": "A.1"}"#,
        )
        .unwrap();
        assert_eq!(call.name, ToolName::Open);
        assert_eq!(call.step_id.as_deref(), Some("A.1"));
        assert_eq!(call.arguments["url"], "http://localhost:3000");
    }

    #[test]
    fn test_tool_call_missing_fields_default() {
        let call: ToolCall = serde_json::from_str(r#"{"name": "start"}"#).unwrap();
        assert_eq!(call.name, ToolName::Start);
        assert!(call.arguments.is_empty());
        assert!(call.step_id.is_none());
    }

    #[test]
    fn test_synthetic_stop() {
        let call = ToolCall::synthetic_stop();
        assert_eq!(call.name, ToolName::Stop);
        assert_eq!(call.step_id.as_deref(), Some(SYNTHETIC_STOP_STEP_ID));
        assert!(call.arguments.is_empty());
    }
}
