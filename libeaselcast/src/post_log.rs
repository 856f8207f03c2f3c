//! Persistent audit log for publish attempts
//!
//! Append-only structured entries in `social.log`, one block per attempt,
//! so failures are captured even when runs happen headlessly under cron.
//!
//! Entry shapes:
//!
//! ```text
//! [2026-02-16 20:15:23] SUCCESS  destination=mastodon  item="Zuiderwolde"
//!   asset=/path/to/image.jpg  url=https://mastodon.social/@a/1
//!
//! [2026-02-16 20:15:23] FAILURE  destination=cara  item="The Beach"
//!   asset: /path/to/image.jpg
//!   error: Timeout 30000ms exceeded waiting for the submit button
//!   screenshots: cara_03_after_upload.png, cara_error.png
//! ```
//!
//! Purely diagnostic; no retry logic lives here, and a failed write never
//! aborts a posting batch.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

use crate::config::{expand_path, Config};

/// Screenshots listed per failure entry; covers the numbered step shots
/// plus the final error shot.
const MAX_SCREENSHOTS: usize = 4;

pub struct PostLogger {
    log_path: PathBuf,
    screenshots_dir: PathBuf,
    /// Destinations driven by browser automation; failures for these point
    /// at the most recent screenshots.
    browser_destinations: Vec<String>,
}

impl PostLogger {
    pub fn new(
        logs_dir: impl Into<PathBuf>,
        screenshots_dir: impl Into<PathBuf>,
        browser_destinations: Vec<String>,
    ) -> Self {
        Self {
            log_path: logs_dir.into().join("social.log"),
            screenshots_dir: screenshots_dir.into(),
            browser_destinations,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            expand_path(&config.logs.dir),
            expand_path(&config.logs.screenshots_dir),
            config.sessions.browser_destinations.clone(),
        )
    }

    /// Record a successful publish attempt.
    pub fn success(&self, destination: &str, title: &str, asset: Option<&Path>, url: Option<&str>) {
        let mut entry = format!(
            "[{}] SUCCESS  destination={}  item={:?}",
            timestamp(),
            destination,
            title
        );
        if let Some(asset) = asset {
            entry.push_str(&format!("  asset={}", asset.display()));
        }
        if let Some(url) = url {
            entry.push_str(&format!("  url={}", url));
        }
        self.append(&entry);
    }

    /// Record a failed publish attempt with as much diagnostic context as
    /// possible. For browser-automation destinations this lists the most
    /// recent screenshots so the operator can see where the run broke.
    pub fn failure(&self, destination: &str, title: &str, asset: Option<&Path>, error: &str) {
        let mut lines = vec![format!(
            "[{}] FAILURE  destination={}  item={:?}",
            timestamp(),
            destination,
            title
        )];
        if let Some(asset) = asset {
            lines.push(format!("  asset: {}", asset.display()));
        }
        lines.push(format!("  error: {}", error));

        if self.browser_destinations.iter().any(|d| d == destination) {
            let shots = self.recent_screenshots(destination);
            if !shots.is_empty() {
                lines.push(format!("  screenshots: {}", shots.join(", ")));
                lines.push(format!("  screenshot dir: {}", self.screenshots_dir.display()));
            }
        }

        self.append(&lines.join("\n"));
    }

    /// Record a credential check that failed at post time.
    pub fn credential_failure(&self, destination: &str) {
        self.append(&format!(
            "[{}] CREDENTIAL FAILURE  destination={}  credentials invalid or missing",
            timestamp(),
            destination
        ));
    }

    fn recent_screenshots(&self, destination: &str) -> Vec<String> {
        let prefix = format!("{}_", destination);
        let mut names: Vec<String> = match std::fs::read_dir(&self.screenshots_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|name| name.starts_with(&prefix) && name.ends_with(".png"))
                .collect(),
            Err(_) => return Vec::new(),
        };
        names.sort();

        if names.len() > MAX_SCREENSHOTS {
            names.split_off(names.len() - MAX_SCREENSHOTS)
        } else {
            names
        }
    }

    fn append(&self, entry: &str) {
        if let Err(e) = self.try_append(entry) {
            warn!("Failed to write post audit log: {}", e);
        }
    }

    fn try_append(&self, entry: &str) -> std::io::Result<()> {
        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.log_path)?;
        writeln!(file, "{}\n", entry)
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
