//! ui-pilot - AI-assisted browser UI testing.
//!
//! This crate provides:
//! - A translator boundary that turns free-text test documents into tool
//!   commands (backed by an Ollama-compatible model API)
//! - A JSON-RPC client for the browser-automation tool server
//! - A sequential run orchestrator with per-step retry, screenshot capture
//!   and an append-only run log
//! - Environment-driven configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ui_pilot::{Orchestrator, OutputLayout, RunLog, ToolClient, ToolClientConfig, OllamaTranslator};
//!
//! let client = ToolClient::new(ToolClientConfig::new("http://localhost:3031")).unwrap();
//! let translator = OllamaTranslator::new("http://localhost:11434", "mistral:latest").unwrap();
//! let mut orchestrator = Orchestrator::new(
//!     client,
//!     OutputLayout::new("test-output"),
//!     RunLog::new(true),
//!     Duration::from_millis(10_000),
//!     Duration::from_millis(500),
//! );
//! let outcome = orchestrator.run(&translator, "A.1: Open http://localhost:3000").unwrap();
//! assert!(!outcome.test_failed);
//! ```

pub mod client;
pub mod config;
pub mod orchestrator;
pub mod output;
pub mod protocol;
pub mod runlog;
pub mod translator;

// Re-export client types
pub use client::{ToolClient, ToolClientConfig, ToolError, ToolResult};

// Re-export orchestration types
pub use orchestrator::{
    FatalError, Orchestrator, RunOutcome, StepTimeout, ensure_trailing_stop, execute_with_retry,
};

// Re-export protocol types
pub use protocol::{SYNTHETIC_STOP_STEP_ID, ToolCall, ToolName};

// Re-export run artifacts
pub use output::OutputLayout;
pub use runlog::RunLog;

// Re-export the translator boundary
pub use translator::{
    OllamaTranslator, Translate, TranslateError, TranslateResult, substitute_env,
};
