//! Cara destination adapter (browser-session automation)
//!
//! Cara has no public API. Posting drives a real browser through an external
//! automation driver command that reuses a persistent profile directory, so
//! a human logs in once and later runs are headless. The adapter's only
//! protocol is the driver's stdout: a single JSON object
//! `{"success": bool, "url": ..., "error": ...}`.
//!
//! The driver is expected to drop step-by-step screenshots into the
//! screenshots directory; the post logger references them on failure.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::{expand_path, CaraConfig};
use crate::error::{PlatformError, Result};
use crate::platforms::Platform;

/// Marker file written into the profile dir by a successful manual login.
const LOGIN_MARKER: &str = ".logged_in";

#[derive(Debug, Deserialize)]
struct DriverResult {
    success: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct CaraPlatform {
    profile_dir: PathBuf,
    driver: String,
    timeout: Duration,
    screenshots_dir: PathBuf,
    /// Checked once at construction so `is_configured` stays pure.
    session_ready: bool,
}

impl CaraPlatform {
    pub fn from_config(config: Option<&CaraConfig>, screenshots_dir: &Path) -> Self {
        let (profile_dir, driver, timeout) = match config.filter(|c| c.enabled) {
            Some(cfg) => (
                expand_path(&cfg.profile_dir),
                cfg.driver.clone(),
                Duration::from_secs(cfg.timeout_secs),
            ),
            None => (PathBuf::new(), String::new(), Duration::from_secs(180)),
        };

        let session_ready = !profile_dir.as_os_str().is_empty()
            && profile_dir.join(LOGIN_MARKER).exists();

        Self {
            profile_dir,
            driver,
            timeout,
            screenshots_dir: screenshots_dir.to_path_buf(),
            session_ready,
        }
    }

    async fn run_driver(&self, image: &Path, text: &str) -> Result<DriverResult> {
        let mut command = tokio::process::Command::new(&self.driver);
        command
            .arg("post")
            .arg("--profile")
            .arg(&self.profile_dir)
            .arg("--image")
            .arg(image)
            .arg("--text")
            .arg(text)
            .arg("--screenshots")
            .arg(&self.screenshots_dir)
            .kill_on_drop(true);

        debug!(driver = %self.driver, image = %image.display(), "launching Cara automation driver");

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                PlatformError::Network(format!(
                    "Cara automation driver timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                PlatformError::Posting(format!(
                    "Failed to launch automation driver '{}': {}",
                    self.driver, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlatformError::Posting(format!(
                "Cara automation driver exited with {}: {}",
                output.status,
                stderr.trim()
            ))
            .into());
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            PlatformError::Posting(format!("Unreadable driver output: {}", e)).into()
        })
    }
}

#[async_trait]
impl Platform for CaraPlatform {
    fn name(&self) -> &str {
        "cara"
    }

    fn display_name(&self) -> &str {
        "Cara"
    }

    fn max_text_length(&self) -> usize {
        2000
    }

    /// Ready once the persistent browser profile has been set up by a
    /// manual login.
    fn is_configured(&self) -> bool {
        self.session_ready
    }

    /// Trusts the login marker; an expired session surfaces on the first
    /// post attempt instead, via the driver's error output.
    async fn verify_credentials(&self) -> Result<bool> {
        Ok(self.session_ready)
    }

    async fn post_image(&self, image: &Path, text: &str, _alt_text: &str) -> Result<Option<String>> {
        if !self.is_configured() {
            return Err(PlatformError::Unconfigured(format!(
                "Cara session not set up. Run: {} login --profile {}",
                if self.driver.is_empty() {
                    "easel-cara-driver"
                } else {
                    &self.driver
                },
                self.profile_dir.display()
            ))
            .into());
        }

        let result = self.run_driver(image, text).await?;
        if result.success {
            Ok(result.url)
        } else {
            Err(PlatformError::Posting(
                result
                    .error
                    .unwrap_or_else(|| "Cara driver reported failure without detail".to_string()),
            )
            .into())
        }
    }
}
