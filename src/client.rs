//! Tool server client.
//!
//! Sends one synchronous JSON-RPC request per tool invocation and interprets
//! the response. No retries happen at this layer; the orchestrator owns the
//! retry policy.
//!
//! The server is the final arbiter of argument validity: a missing selector
//! surfaces as a remote invocation error, not a local validation failure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{Map, Value, json};

use crate::config;
use crate::protocol::{JSONRPC_VERSION, METHOD_CALL_TOOL, METHOD_LIST_TOOLS, ToolName};

/// Result type for tool server operations
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur while invoking a tool
#[derive(Debug)]
pub enum ToolError {
    /// Failed to reach the tool server
    ConnectionFailed(String),
    /// Non-success HTTP status without a readable error payload
    Http(u16),
    /// Server reported the invocation failed
    Invocation(String),
    /// Body could not be parsed as a JSON-RPC response
    InvalidResponse(String),
    /// IO error
    Io(std::io::Error),
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            ToolError::Http(status) => write!(f, "HTTP error: {}", status),
            ToolError::Invocation(msg) => write!(f, "Tool error: {}", msg),
            ToolError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ToolError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<std::io::Error> for ToolError {
    fn from(e: std::io::Error) -> Self {
        ToolError::Io(e)
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        ToolError::ConnectionFailed(e.to_string())
    }
}

/// Configuration for the tool client
#[derive(Debug, Clone)]
pub struct ToolClientConfig {
    /// JSON-RPC endpoint URL
    pub endpoint: String,
    /// Timeout for establishing the connection (seconds)
    pub connect_timeout: u64,
}

impl Default for ToolClientConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            endpoint: cfg.tool.endpoint.clone(),
            connect_timeout: cfg.tool.connect_timeout,
        }
    }
}

impl ToolClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout = seconds;
        self
    }
}

/// Client for the browser-automation tool server
#[derive(Debug)]
pub struct ToolClient {
    config: ToolClientConfig,
    http: reqwest::blocking::Client,
    next_id: AtomicU64,
}

impl ToolClient {
    /// Create a client for the given endpoint configuration
    pub fn new(config: ToolClientConfig) -> ToolResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            // Individual tool calls may legitimately take a while (navigation
            // waits for the network to settle), so no total request timeout.
            .timeout(None::<Duration>)
            .build()?;

        Ok(Self {
            config,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint this client talks to
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Invoke a single tool on the server. Exactly one network round trip.
    pub fn call_tool(&self, name: ToolName, args: &Map<String, Value>) -> ToolResult<Value> {
        self.post(json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": METHOD_CALL_TOOL,
            "params": { "name": name.as_str(), "arguments": args },
        }))
    }

    /// Ask the server for its tool list (capability/liveness handshake)
    pub fn list_tools(&self) -> ToolResult<Value> {
        self.post(json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": METHOD_LIST_TOOLS,
            "params": {},
        }))
    }

    /// Check whether the tool server is reachable and answers the handshake
    pub fn check_health(&self) -> bool {
        self.list_tools().is_ok()
    }

    fn post(&self, body: Value) -> ToolResult<Value> {
        let response = self.http.post(&self.config.endpoint).json(&body).send()?;
        let status = response.status();
        let text = response.text()?;

        let payload: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(_) if !status.is_success() => return Err(ToolError::Http(status.as_u16())),
            Err(e) => return Err(ToolError::InvalidResponse(e.to_string())),
        };

        // An error field in the payload wins over the HTTP status: some
        // servers report tool failures with a 200, others with a 500.
        if let Some(err) = payload.get("error") {
            if is_truthy(err) {
                let msg = match err.as_str() {
                    Some(s) => s.to_string(),
                    None => err.to_string(),
                };
                return Err(ToolError::Invocation(msg));
            }
        }

        if !status.is_success() {
            return Err(ToolError::Http(status.as_u16()));
        }

        Ok(payload.get("result").cloned().unwrap_or(Value::Null))
    }
}

/// Truthiness of an error payload: null, false, 0 and "" do not count
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> ToolClient {
        ToolClient::new(ToolClientConfig::new(server.url("/")).connect_timeout(2)).unwrap()
    }

    #[test]
    fn test_call_tool_returns_result_payload() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .json_body_partial(r#"{"method": "call_tool", "params": {"name": "start"}}"#);
            then.status(200)
                .json_body(serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": true}}));
        });

        let client = client_for(&server);
        let result = client.call_tool(ToolName::Start, &Map::new()).unwrap();
        assert_eq!(result["ok"], true);
        mock.assert();
    }

    #[test]
    fn test_call_tool_error_field_beats_http_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(serde_json::json!({"error": "no element matches selector"}));
        });

        let client = client_for(&server);
        let err = client.call_tool(ToolName::Click, &Map::new()).unwrap_err();
        match err {
            ToolError::Invocation(msg) => assert!(msg.contains("selector")),
            other => panic!("expected Invocation, got {:?}", other),
        }
    }

    #[test]
    fn test_call_tool_structured_error_is_stringified() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(500)
                .json_body(serde_json::json!({"error": {"code": -32000, "message": "boom"}}));
        });

        let client = client_for(&server);
        let err = client.call_tool(ToolName::Open, &Map::new()).unwrap_err();
        match err {
            ToolError::Invocation(msg) => assert!(msg.contains("boom")),
            other => panic!("expected Invocation, got {:?}", other),
        }
    }

    #[test]
    fn test_call_tool_non_json_error_body_maps_to_http() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(502).body("bad gateway");
        });

        let client = client_for(&server);
        let err = client.call_tool(ToolName::Fill, &Map::new()).unwrap_err();
        match err {
            ToolError::Http(status) => assert_eq!(status, 502),
            other => panic!("expected Http, got {:?}", other),
        }
    }

    #[test]
    fn test_check_health_unreachable() {
        // Nothing listens on this port
        let client =
            ToolClient::new(ToolClientConfig::new("http://127.0.0.1:9").connect_timeout(1))
                .unwrap();
        assert!(!client.check_health());
    }

    #[test]
    fn test_check_health_ok() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .json_body_partial(r#"{"method": "list_tools"}"#);
            then.status(200)
                .json_body(serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": {"tools": []}}));
        });

        let client = client_for(&server);
        assert!(client.check_health());
    }
}
