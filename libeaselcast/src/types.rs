//! Core types for Easelcast

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One artwork in the content library, together with its per-destination
/// publish tracking.
///
/// Content items are created by the content-management side (or imported
/// with `easel-queue import`); the orchestration core only reads them and
/// writes back [`PublishRecord`] updates after publish attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub subject: String,
    /// Locator for the publishable image, resolved by the asset resolver.
    pub asset_ref: String,
    /// destination name -> tracking record
    #[serde(default)]
    pub publish_records: HashMap<String, PublishRecord>,
}

impl ContentItem {
    /// Publish count for a destination; destinations never posted to count as 0.
    pub fn publish_count(&self, destination: &str) -> i64 {
        self.publish_records
            .get(destination)
            .map(|r| r.publish_count)
            .unwrap_or(0)
    }
}

/// Per-destination tracking state attached to a content item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishRecord {
    pub publish_count: i64,
    pub last_published_at: Option<i64>,
    pub published_url: Option<String>,
}

/// A time-anchored entry in the schedule queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: String,
    pub content_id: String,
    pub content_ref: String,
    pub destination: String,
    /// Unix timestamp (seconds). May be in the past; the engine does not
    /// validate against "now" at creation time.
    pub scheduled_time: i64,
    pub status: ScheduleStatus,
    pub result_url: Option<String>,
    pub error: Option<String>,
    pub created_at: i64,
}

impl ScheduledPost {
    pub fn new(content_id: &str, content_ref: &str, destination: &str, scheduled_time: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content_id: content_id.to_string(),
            content_ref: content_ref.to_string(),
            destination: destination.to_string(),
            scheduled_time,
            status: ScheduleStatus::Pending,
            result_url: None,
            error: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Schedule entry lifecycle. Transitions are one-way: `Pending` moves to
/// exactly one of the terminal states and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Pending,
    Posted,
    Failed,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Posted => "posted",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "posted" => Self::Posted,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one publish attempt against one destination.
///
/// Exactly one of `url` / `error` carries meaning, depending on `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    pub destination: String,
    pub success: bool,
    pub url: Option<String>,
    pub error: Option<String>,
}

impl PublishResult {
    pub fn posted(destination: impl Into<String>, url: Option<String>) -> Self {
        Self {
            destination: destination.into(),
            success: true,
            url,
            error: None,
        }
    }

    pub fn failed(destination: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            success: false,
            url: None,
            error: Some(error.into()),
        }
    }
}

/// Manual-login recency for a browser-session destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub destination: String,
    pub last_login: Option<i64>,
    pub days_since: Option<i64>,
    pub max_days: i64,
    pub days_remaining: Option<i64>,
    pub state: SessionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No login has ever been recorded.
    Never,
    Ok,
    /// Expiry is close; the operator should re-login soon.
    Warn,
    Expired,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::Ok => write!(f, "ok"),
            Self::Warn => write!(f, "warn"),
            Self::Expired => write!(f, "expired"),
        }
    }
}
