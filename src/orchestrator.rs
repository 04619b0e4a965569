//! Run orchestration.
//!
//! Drives a full test run as a sequential state machine:
//! prepare output -> check server -> translate -> execute -> report.
//!
//! Failure semantics are two-tiered. Setup, connectivity and translation
//! problems are fatal and abort the run before any command executes. A step
//! whose retry budget runs out is recorded, screenshotted and skipped past;
//! execution always continues to the next command so one broken step cannot
//! hide the state of the rest of the scenario.

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::{ToolClient, ToolError, ToolResult};
use crate::output::OutputLayout;
use crate::protocol::{ToolCall, ToolName};
use crate::runlog::RunLog;
use crate::translator::{Translate, TranslateError};

/// Aggregate outcome of one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    /// True if any command exhausted its retry budget
    pub test_failed: bool,

    /// Step identifiers that failed, in execution order
    pub failed_steps: Vec<String>,
}

/// Errors that abort the run before or outside the execution loop
#[derive(Debug)]
pub enum FatalError {
    /// Output directory could not be prepared
    OutputDir(std::io::Error),
    /// Tool server did not answer the handshake
    ServerUnavailable(String),
    /// Document translation failed
    Translation(TranslateError),
}

impl std::fmt::Display for FatalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FatalError::OutputDir(e) => write!(f, "Could not prepare output directory: {}", e),
            FatalError::ServerUnavailable(endpoint) => {
                write!(f, "Tool server unreachable at {}", endpoint)
            }
            FatalError::Translation(e) => write!(f, "Translation failed: {}", e),
        }
    }
}

impl std::error::Error for FatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FatalError::OutputDir(e) => Some(e),
            FatalError::ServerUnavailable(_) => None,
            FatalError::Translation(e) => Some(e),
        }
    }
}

/// A step whose retry budget ran out
#[derive(Debug)]
pub struct StepTimeout {
    /// Identifier of the failed step
    pub step_id: String,
    /// Budget that was exhausted
    pub budget: Duration,
    /// Error from the last attempt, if any attempt produced one
    pub last_error: Option<ToolError>,
}

impl std::fmt::Display for StepTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Step \"{}\" failed after {}ms",
            self.step_id,
            self.budget.as_millis()
        )?;
        if let Some(e) = &self.last_error {
            write!(f, ": {}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for StepTimeout {}

/// Invoke one tool repeatedly until it succeeds or the wall-clock budget is
/// spent.
///
/// Makes at least one attempt even with a zero budget; between failed
/// attempts it sleeps for `retry_interval` (fixed polling, no backoff: UI
/// elements appear on page-load timescales and a plain poll is enough).
/// Never retries past `timeout` plus one in-flight attempt and one interval.
pub fn execute_with_retry(
    client: &ToolClient,
    name: ToolName,
    args: &Map<String, Value>,
    step_id: &str,
    timeout: Duration,
    retry_interval: Duration,
) -> Result<(), StepTimeout> {
    let start = Instant::now();
    let mut last_error = None;

    loop {
        match client.call_tool(name, args) {
            Ok(_) => return Ok(()),
            Err(e) => last_error = Some(e),
        }

        if start.elapsed() >= timeout {
            break;
        }
        thread::sleep(retry_interval);
        if start.elapsed() >= timeout {
            break;
        }
    }

    Err(StepTimeout {
        step_id: step_id.to_string(),
        budget: timeout,
        last_error,
    })
}

/// Append a stop command when the scenario does not end with one, so the
/// remote browser session is always torn down. Returns whether a command was
/// appended. Never touches an existing trailing stop.
pub fn ensure_trailing_stop(calls: &mut Vec<ToolCall>) -> bool {
    match calls.last() {
        Some(last) if last.name == ToolName::Stop => false,
        _ => {
            calls.push(ToolCall::synthetic_stop());
            true
        }
    }
}

/// Drives one full test run against a tool server
pub struct Orchestrator {
    client: ToolClient,
    output: OutputLayout,
    log: RunLog,
    step_timeout: Duration,
    retry_interval: Duration,
}

impl Orchestrator {
    pub fn new(
        client: ToolClient,
        output: OutputLayout,
        log: RunLog,
        step_timeout: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            client,
            output,
            log,
            step_timeout,
            retry_interval,
        }
    }

    /// The run log accumulated so far
    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Execute a full run: prepare, handshake, translate, execute, report.
    ///
    /// The log is persisted on every path out of this function, including
    /// fatal aborts.
    pub fn run(
        &mut self,
        translator: &dyn Translate,
        document: &str,
    ) -> Result<RunOutcome, FatalError> {
        // Preparing: wipe and recreate the output tree before any remote call
        self.output.reset().map_err(FatalError::OutputDir)?;

        self.log.append("Automated UI test run");
        self.log.append("=".repeat(50));
        self.log.append(format!(
            "Output directory {} reset",
            self.output.root.display()
        ));
        self.log
            .append("Screenshots -> screenshots/success and screenshots/failed");
        self.log
            .append(format!("Log -> {}", self.output.log_path().display()));

        // CheckingServer: no point attempting automation without a live target
        self.log.append("Checking tool server...");
        if !self.client.check_health() {
            let endpoint = self.client.endpoint().to_string();
            self.log
                .append(format!("Tool server unreachable at {}", endpoint));
            self.persist_log();
            return Err(FatalError::ServerUnavailable(endpoint));
        }
        self.log.append("Tool server available");

        // Translating
        self.log.append("Translating test document...");
        let calls = match translator.translate(document) {
            Ok(calls) => calls,
            Err(e) => {
                self.log.append(format!("Translation failed: {}", e));
                self.persist_log();
                return Err(FatalError::Translation(e));
            }
        };

        self.log.append("Execution plan:");
        for call in &calls {
            self.log.append(format!(
                "  [{}] {} {}",
                call.step_id.as_deref().unwrap_or("?"),
                call.name,
                Value::Object(call.arguments.clone())
            ));
        }

        // Executing
        let outcome = self.execute_calls(calls);

        // Reporting
        self.log.append("=".repeat(50));
        if outcome.test_failed {
            self.log.append("Run finished with failing steps.");
            if !outcome.failed_steps.is_empty() {
                self.log
                    .append(format!("Failed steps: {}", outcome.failed_steps.join(", ")));
            }
        } else {
            self.log.append("All steps executed successfully.");
        }
        self.log
            .append(format!("Results in: {}", self.output.root.display()));
        self.persist_log();

        Ok(outcome)
    }

    /// Execute every command exactly once, in order, continuing past step
    /// failures
    fn execute_calls(&mut self, mut calls: Vec<ToolCall>) -> RunOutcome {
        if ensure_trailing_stop(&mut calls) {
            self.log
                .append("Appended browser close at end of scenario.");
        }

        self.log
            .append(format!("Executing {} commands...", calls.len()));

        let mut outcome = RunOutcome::default();

        for (i, call) in calls.iter().enumerate() {
            let step_id = call
                .step_id
                .clone()
                .unwrap_or_else(|| format!("step-{}", i + 1));

            let mut args = call.arguments.clone();
            // Explicit screenshots land next to the automatic ones, named
            // after the step instead of whatever the document said
            if call.name == ToolName::Screenshot {
                let path = self.output.success_screenshot(&step_id);
                args.insert(
                    "path".to_string(),
                    Value::String(path.to_string_lossy().into_owned()),
                );
            }

            self.log.append(format!(
                "[{}] {} {}",
                step_id,
                call.name,
                Value::Object(args.clone())
            ));

            let started = Instant::now();
            let result = execute_with_retry(
                &self.client,
                call.name,
                &args,
                &step_id,
                self.step_timeout,
                self.retry_interval,
            );

            match result {
                Ok(()) => {
                    self.log
                        .append(format!("  ok ({}ms)", started.elapsed().as_millis()));

                    // Automatic capture after each real test step; its own
                    // failure is swallowed and never affects the outcome
                    if !matches!(
                        call.name,
                        ToolName::Start | ToolName::Stop | ToolName::Screenshot
                    ) {
                        let auto_path = self.output.success_screenshot(&step_id);
                        if self.take_screenshot(&auto_path).is_ok() {
                            self.log
                                .append(format!("  captured {}", auto_path.display()));
                        }
                    }
                }
                Err(err) => {
                    outcome.test_failed = true;
                    outcome.failed_steps.push(step_id.clone());
                    self.log.append(format!("  failed after retries: {}", err));

                    let failed_path = self.output.failed_screenshot(&step_id);
                    match self.take_screenshot(&failed_path) {
                        Ok(()) => self
                            .log
                            .append(format!("  captured {}", failed_path.display())),
                        Err(_) => self
                            .log
                            .append("  warning: could not capture failure screenshot"),
                    }
                    // Keep going: one failed step never halts the run
                }
            }
        }

        outcome
    }

    /// Single-attempt screenshot into the given path (best effort)
    fn take_screenshot(&self, path: &std::path::Path) -> ToolResult<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let mut args = Map::new();
        args.insert(
            "path".to_string(),
            Value::String(path.to_string_lossy().into_owned()),
        );
        self.client.call_tool(ToolName::Screenshot, &args)?;
        Ok(())
    }

    fn persist_log(&self) {
        if let Err(e) = self.log.persist(&self.output.log_path()) {
            eprintln!(
                "Warning: could not persist run log to {}: {}",
                self.output.log_path().display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ToolClientConfig;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ensure_trailing_stop_appends_when_missing() {
        let mut calls = vec![
            ToolCall::new(ToolName::Open).step_id("A.1"),
            ToolCall::new(ToolName::Click).step_id("A.2"),
        ];
        assert!(ensure_trailing_stop(&mut calls));
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].name, ToolName::Stop);
    }

    #[test]
    fn test_ensure_trailing_stop_no_duplicate() {
        let mut calls = vec![
            ToolCall::new(ToolName::Open).step_id("A.1"),
            ToolCall::new(ToolName::Stop).step_id("stop"),
        ];
        assert!(!ensure_trailing_stop(&mut calls));
        assert_eq!(calls.len(), 2);
    }

    #[test]
    fn test_ensure_trailing_stop_empty_list() {
        let mut calls = Vec::new();
        assert!(ensure_trailing_stop(&mut calls));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, ToolName::Stop);
    }

    #[test]
    fn test_step_timeout_display() {
        let err = StepTimeout {
            step_id: "A.2".to_string(),
            budget: Duration::from_millis(10_000),
            last_error: Some(ToolError::Invocation("no such element".to_string())),
        };
        let msg = err.to_string();
        assert!(msg.contains("A.2"));
        assert!(msg.contains("10000ms"));
        assert!(msg.contains("no such element"));
    }

    #[test]
    fn test_retry_returns_on_first_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(serde_json::json!({"result": {"ok": true}}));
        });

        let client = ToolClient::new(ToolClientConfig::new(server.url("/"))).unwrap();
        let result = execute_with_retry(
            &client,
            ToolName::Click,
            &Map::new(),
            "A.1",
            Duration::from_millis(500),
            Duration::from_millis(100),
        );
        assert!(result.is_ok());
        assert_eq!(mock.hits(), 1);
    }

    #[test]
    fn test_retry_bounded_for_always_failing_step() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(serde_json::json!({"error": "still loading"}));
        });

        let client = ToolClient::new(ToolClientConfig::new(server.url("/"))).unwrap();
        let started = Instant::now();
        let err = execute_with_retry(
            &client,
            ToolName::AssertText,
            &Map::new(),
            "B.1",
            Duration::from_millis(300),
            Duration::from_millis(100),
        )
        .unwrap_err();

        assert!(mock.hits() >= 1);
        // budget + one attempt + one interval, with generous slack
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(err.step_id, "B.1");
        assert!(err.to_string().contains("still loading"));
    }
}
