//! Document translation.
//!
//! Turns a free-text test scenario into an ordered list of tool commands.
//! The live implementation delegates to an Ollama-compatible model API; the
//! orchestrator only depends on the [`Translate`] trait, so tests drive it
//! with a deterministic stub instead of a model.
//!
//! The model reply is treated with suspicion: it may wrap the JSON array in
//! prose or markdown fences, and anything that does not parse into a
//! well-formed command list is a translation failure.

use std::env;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::json;

use crate::config;
use crate::protocol::ToolCall;

/// Result type for translation operations
pub type TranslateResult<T> = Result<T, TranslateError>;

/// Errors that can occur during document translation
#[derive(Debug)]
pub enum TranslateError {
    /// Failed to reach the model API
    ConnectionFailed(String),
    /// Model API answered with a non-success status
    Api(u16),
    /// Model reply could not be parsed into a command list
    Parse(String),
}

impl std::fmt::Display for TranslateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslateError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            TranslateError::Api(status) => write!(f, "Model API error: {}", status),
            TranslateError::Parse(msg) => write!(f, "Unparsable model reply: {}", msg),
        }
    }
}

impl std::error::Error for TranslateError {}

impl From<reqwest::Error> for TranslateError {
    fn from(e: reqwest::Error) -> Self {
        TranslateError::ConnectionFailed(e.to_string())
    }
}

/// Translates a scenario document into an ordered command list
pub trait Translate {
    fn translate(&self, document: &str) -> TranslateResult<Vec<ToolCall>>;
}

/// `${VAR}` placeholders in scenario documents
static ENV_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z0-9_]+)\}").expect("valid placeholder regex"));

/// Replace `${VAR}` placeholders with environment values.
///
/// Unset variables are left as-is so the failure shows up verbatim in the
/// executed command instead of silently becoming an empty string.
pub fn substitute_env(document: &str) -> String {
    ENV_PLACEHOLDER
        .replace_all(document, |caps: &Captures| {
            env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Extract the JSON array from a model reply.
///
/// Models routinely surround the array with explanation text or ```json
/// fences; take the slice from the first `[` to the last `]`.
pub fn extract_json_array(reply: &str) -> Option<&str> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&reply[start..=end])
}

/// Parse a raw model reply into a command list
pub fn parse_reply(reply: &str) -> TranslateResult<Vec<ToolCall>> {
    let json_str = extract_json_array(reply)
        .ok_or_else(|| TranslateError::Parse("no JSON array in model reply".to_string()))?;
    serde_json::from_str(json_str).map_err(|e| TranslateError::Parse(e.to_string()))
}

const SYSTEM_PROMPT: &str = "You are a UI test automation agent. You translate a plain-text test \
document into a list of tool calls for a browser automation server.\n\
\n\
Available tools:\n\
- start: launch the browser (no arguments)\n\
- open: navigate to a URL (argument: url)\n\
- fill: fill a form field (arguments: selector, value)\n\
- click: click an element (argument: selector)\n\
- assertText: wait for a text to be visible (argument: text)\n\
- screenshot: capture the page (argument: path)\n\
- stop: close the browser (no arguments)\n\
\n\
Strict rules:\n\
1. Generate ONLY the actions explicitly written in the document.\n\
2. One document line = one tool call, plus start first and stop last.\n\
3. Every line starts with an identifier (e.g. \"A.1:\"); extract it into the \
\"stepId\" field.\n\
4. Keep selectors exactly as written (text=..., #id, .class).\n\
5. Do not invent fills, waits or navigation, and do not add screenshots \
(they are captured automatically).\n\
\n\
Reply with a JSON array only, for example:\n\
[\n\
  {\"name\": \"start\", \"arguments\": {}, \"stepId\": \"start\"},\n\
  {\"name\": \"open\", \"arguments\": {\"url\": \"...\"}, \"stepId\": \"A.1\"},\n\
  {\"name\": \"stop\", \"arguments\": {}, \"stepId\": \"stop\"}\n\
]";

/// Translator backed by an Ollama-compatible model API
#[derive(Debug)]
pub struct OllamaTranslator {
    endpoint: String,
    model: String,
    http: reqwest::blocking::Client,
}

impl OllamaTranslator {
    /// Create a translator for the given model API base URL and model name
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> TranslateResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(config::get().tool.connect_timeout))
            // Model generation can take minutes; only bound the connect phase.
            .timeout(None::<Duration>)
            .build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            http,
        })
    }

    /// List the models the API has available (used by the setup check)
    pub fn list_models(&self) -> TranslateResult<Vec<String>> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.endpoint))
            .send()?;
        if !response.status().is_success() {
            return Err(TranslateError::Api(response.status().as_u16()));
        }

        let payload: serde_json::Value = response
            .json()
            .map_err(|e| TranslateError::Parse(e.to_string()))?;
        let models = payload["models"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["name"].as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(models)
    }

    fn generate(&self, prompt: &str) -> TranslateResult<String> {
        let response = self
            .http
            .post(format!("{}/api/generate", self.endpoint))
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "system": SYSTEM_PROMPT,
                "stream": false,
            }))
            .send()?;

        if !response.status().is_success() {
            return Err(TranslateError::Api(response.status().as_u16()));
        }

        let payload: serde_json::Value = response
            .json()
            .map_err(|e| TranslateError::Parse(e.to_string()))?;
        Ok(payload["response"].as_str().unwrap_or_default().to_string())
    }
}

impl Translate for OllamaTranslator {
    fn translate(&self, document: &str) -> TranslateResult<Vec<ToolCall>> {
        let prompt = format!(
            "Translate this test document into the tool call list.\n\
             Extract each line's identifier into \"stepId\" and generate exactly \
             one call per line, plus start and stop.\n\n\
             Test document:\n{}\n\n\
             Reply with the JSON array only, no extra text.",
            document
        );

        let reply = self.generate(&prompt)?;
        parse_reply(&reply)
    }
}
