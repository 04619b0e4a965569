//! Output directory management for test runs.
//!
//! Each run owns one output tree, wiped and recreated before anything else
//! happens:
//!
//! ```text
//! test-output/
//!   screenshots/
//!     success/   <- steps that passed (auto + explicit captures)
//!     failed/    <- steps whose retry budget ran out
//!   test.log     <- persisted run log
//! ```

use std::fs;
use std::path::PathBuf;

use crate::config;

/// Subdirectory holding all screenshots
const SCREENSHOTS_DIR: &str = "screenshots";

/// Screenshots of steps that succeeded
const SUCCESS_DIR: &str = "success";

/// Screenshots of steps that failed after retries
const FAILED_DIR: &str = "failed";

/// Persisted run log file name
const LOG_FILE: &str = "test.log";

/// Filesystem layout of one run's artifacts
#[derive(Debug, Clone)]
pub struct OutputLayout {
    /// Root directory of the run output
    pub root: PathBuf,
}

impl OutputLayout {
    /// Create a layout rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at the configured output directory
    pub fn from_config() -> Self {
        Self::new(&config::get().run.output_dir)
    }

    /// Directory for screenshots of successful steps
    pub fn success_dir(&self) -> PathBuf {
        self.root.join(SCREENSHOTS_DIR).join(SUCCESS_DIR)
    }

    /// Directory for screenshots of failed steps
    pub fn failed_dir(&self) -> PathBuf {
        self.root.join(SCREENSHOTS_DIR).join(FAILED_DIR)
    }

    /// Path of the persisted run log
    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    /// Screenshot path for a successful step
    pub fn success_screenshot(&self, step_id: &str) -> PathBuf {
        self.success_dir()
            .join(format!("{}.png", sanitize_name(step_id)))
    }

    /// Screenshot path for a failed step
    pub fn failed_screenshot(&self, step_id: &str) -> PathBuf {
        self.failed_dir()
            .join(format!("{}.png", sanitize_name(step_id)))
    }

    /// Delete and recreate the whole output tree.
    ///
    /// Leaves the same empty-with-subfolders state whether or not a previous
    /// run left artifacts behind.
    pub fn reset(&self) -> std::io::Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(self.success_dir())?;
        fs::create_dir_all(self.failed_dir())?;
        Ok(())
    }
}

/// Sanitize a step identifier for use in filenames.
///
/// Step ids like "A.1" stay readable; path separators and whitespace become
/// underscores.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}
