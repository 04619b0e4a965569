//! Configuration management with environment variable support.
//!
//! Centralized configuration for ui-pilot:
//! - Environment variables for all configurable values
//! - Sensible defaults matching the stated protocol defaults
//! - Per-group `from_env` / `defaults` constructors
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `UI_PILOT_TOOL_ENDPOINT` | Tool server URL | `http://localhost:3031` |
//! | `UI_PILOT_CONNECT_TIMEOUT` | HTTP connect timeout (seconds) | `10` |
//! | `UI_PILOT_MODEL_ENDPOINT` | Model API base URL | `http://localhost:11434` |
//! | `UI_PILOT_MODEL` | Model name for translation | `mistral:latest` |
//! | `UI_PILOT_OUTPUT_DIR` | Run artifact directory | `test-output` |
//! | `UI_PILOT_STEP_TIMEOUT_MS` | Per-step retry budget (ms) | `10000` |
//! | `UI_PILOT_RETRY_INTERVAL_MS` | Wait between retries (ms) | `500` |

use std::env;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// Default tool server endpoint
pub const DEFAULT_TOOL_ENDPOINT: &str = "http://localhost:3031";

/// Default HTTP connect timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Default model API base URL
pub const DEFAULT_MODEL_ENDPOINT: &str = "http://localhost:11434";

/// Default model name used for document translation
pub const DEFAULT_MODEL: &str = "mistral:latest";

/// Default output directory for run artifacts
pub const DEFAULT_OUTPUT_DIR: &str = "test-output";

/// Default per-step retry budget (milliseconds)
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 10_000;

/// Default wait between retry attempts (milliseconds)
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 500;

/// Default scenario document, used when no positional path is given
pub const DEFAULT_SCENARIO: &str = "scenarios/sample.txt";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the tool server endpoint
pub const ENV_TOOL_ENDPOINT: &str = "UI_PILOT_TOOL_ENDPOINT";

/// Environment variable for the HTTP connect timeout
pub const ENV_CONNECT_TIMEOUT: &str = "UI_PILOT_CONNECT_TIMEOUT";

/// Environment variable for the model API base URL
pub const ENV_MODEL_ENDPOINT: &str = "UI_PILOT_MODEL_ENDPOINT";

/// Environment variable for the model name
pub const ENV_MODEL: &str = "UI_PILOT_MODEL";

/// Environment variable for the output directory
pub const ENV_OUTPUT_DIR: &str = "UI_PILOT_OUTPUT_DIR";

/// Environment variable for the per-step retry budget
pub const ENV_STEP_TIMEOUT_MS: &str = "UI_PILOT_STEP_TIMEOUT_MS";

/// Environment variable for the retry interval
pub const ENV_RETRY_INTERVAL_MS: &str = "UI_PILOT_RETRY_INTERVAL_MS";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for ui-pilot
#[derive(Debug, Clone)]
pub struct Config {
    /// Tool server settings
    pub tool: ToolSettings,
    /// Translation model settings
    pub model: ModelSettings,
    /// Run execution settings
    pub run: RunSettings,
}

/// Tool-server-related settings
#[derive(Debug, Clone)]
pub struct ToolSettings {
    /// JSON-RPC endpoint URL
    pub endpoint: String,
    /// Connect timeout (seconds)
    pub connect_timeout: u64,
}

/// Translation-model-related settings
#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Model API base URL
    pub endpoint: String,
    /// Model name
    pub model: String,
}

/// Run execution settings
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Directory receiving logs and screenshots
    pub output_dir: String,
    /// Per-step retry budget (milliseconds)
    pub step_timeout_ms: u64,
    /// Wait between retry attempts (milliseconds)
    pub retry_interval_ms: u64,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            tool: ToolSettings::from_env(),
            model: ModelSettings::from_env(),
            run: RunSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            tool: ToolSettings::defaults(),
            model: ModelSettings::defaults(),
            run: RunSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ToolSettings {
    /// Create tool settings from environment variables
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var(ENV_TOOL_ENDPOINT)
                .unwrap_or_else(|_| DEFAULT_TOOL_ENDPOINT.to_string()),
            connect_timeout: env::var(ENV_CONNECT_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Create tool settings with defaults
    pub fn defaults() -> Self {
        Self {
            endpoint: DEFAULT_TOOL_ENDPOINT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ModelSettings {
    /// Create model settings from environment variables
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var(ENV_MODEL_ENDPOINT)
                .unwrap_or_else(|_| DEFAULT_MODEL_ENDPOINT.to_string()),
            model: env::var(ENV_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }

    /// Create model settings with defaults
    pub fn defaults() -> Self {
        Self {
            endpoint: DEFAULT_MODEL_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl RunSettings {
    /// Create run settings from environment variables
    pub fn from_env() -> Self {
        Self {
            output_dir: env::var(ENV_OUTPUT_DIR)
                .unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.to_string()),
            step_timeout_ms: env::var(ENV_STEP_TIMEOUT_MS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_STEP_TIMEOUT_MS),
            retry_interval_ms: env::var(ENV_RETRY_INTERVAL_MS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_INTERVAL_MS),
        }
    }

    /// Create run settings with defaults
    pub fn defaults() -> Self {
        Self {
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            step_timeout_ms: DEFAULT_STEP_TIMEOUT_MS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
        }
    }
}
