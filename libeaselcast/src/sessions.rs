//! Manual-login session tracking
//!
//! Browser-session destinations (Cara) depend on a human logging in every
//! so often; there is no token to refresh. This tracker records when that
//! last happened and derives an expiry status the admin surface can warn
//! about before posting silently starts failing.

use chrono::Utc;

use crate::config::SessionsConfig;
use crate::db::Database;
use crate::error::Result;
use crate::types::{SessionState, SessionStatus};

const SECONDS_PER_DAY: i64 = 24 * 3600;

pub struct SessionTracker {
    db: Database,
    destinations: Vec<String>,
    max_days: i64,
    warn_days: i64,
}

impl SessionTracker {
    pub fn new(db: Database, config: &SessionsConfig) -> Self {
        Self {
            db,
            destinations: config.browser_destinations.clone(),
            max_days: config.max_days,
            warn_days: config.warn_days,
        }
    }

    /// Stamp a successful manual login at the current time.
    pub async fn record_login(&self, destination: &str) -> Result<()> {
        self.db
            .record_login_at(destination, Utc::now().timestamp(), None)
            .await
    }

    /// Stamp a login at an explicit time, optionally overriding the
    /// destination's expiry window. Used for imports and backfills.
    pub async fn record_login_at(
        &self,
        destination: &str,
        timestamp: i64,
        max_days: Option<i64>,
    ) -> Result<()> {
        self.db.record_login_at(destination, timestamp, max_days).await
    }

    pub async fn status(&self, destination: &str) -> Result<SessionStatus> {
        let row = self.db.get_login(destination).await?;
        Ok(self.status_from(destination, row))
    }

    /// Statuses for every tracked destination needing attention (anything
    /// not `ok`, including destinations never logged into).
    pub async fn alerts(&self) -> Result<Vec<SessionStatus>> {
        let mut alerts = Vec::new();
        for destination in &self.destinations {
            let status = self.status(destination).await?;
            if status.state != SessionState::Ok {
                alerts.push(status);
            }
        }
        Ok(alerts)
    }

    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    fn status_from(&self, destination: &str, row: Option<(i64, Option<i64>)>) -> SessionStatus {
        let Some((last_login, max_days_override)) = row else {
            return SessionStatus {
                destination: destination.to_string(),
                last_login: None,
                days_since: None,
                max_days: self.max_days,
                days_remaining: None,
                state: SessionState::Never,
            };
        };

        let max_days = max_days_override.unwrap_or(self.max_days);
        let days_since = (Utc::now().timestamp() - last_login) / SECONDS_PER_DAY;
        let days_remaining = max_days - days_since;

        let state = if days_remaining <= 0 {
            SessionState::Expired
        } else if days_remaining <= self.warn_days {
            SessionState::Warn
        } else {
            SessionState::Ok
        };

        SessionStatus {
            destination: destination.to_string(),
            last_login: Some(last_login),
            days_since: Some(days_since),
            max_days,
            days_remaining: Some(days_remaining),
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn tracker() -> (TempDir, SessionTracker) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("easelcast.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        let tracker = SessionTracker::new(db, &SessionsConfig::default());
        (dir, tracker)
    }

    fn days_ago(days: i64) -> i64 {
        Utc::now().timestamp() - days * SECONDS_PER_DAY
    }

    #[tokio::test]
    async fn test_status_never_without_record() {
        let (_dir, tracker) = tracker().await;

        let status = tracker.status("cara").await.unwrap();
        assert_eq!(status.state, SessionState::Never);
        assert_eq!(status.last_login, None);
        assert_eq!(status.days_remaining, None);
        assert_eq!(status.max_days, 30);
    }

    #[tokio::test]
    async fn test_status_ok_after_fresh_login() {
        let (_dir, tracker) = tracker().await;

        tracker.record_login("cara").await.unwrap();

        let status = tracker.status("cara").await.unwrap();
        assert_eq!(status.state, SessionState::Ok);
        assert_eq!(status.days_since, Some(0));
        assert_eq!(status.days_remaining, Some(30));
    }

    #[tokio::test]
    async fn test_status_warn_close_to_expiry() {
        // 25 days ago with a 30-day window and 7-day warn threshold:
        // 5 days remaining -> warn
        let (_dir, tracker) = tracker().await;

        tracker
            .record_login_at("cara", days_ago(25), None)
            .await
            .unwrap();

        let status = tracker.status("cara").await.unwrap();
        assert_eq!(status.days_since, Some(25));
        assert_eq!(status.days_remaining, Some(5));
        assert_eq!(status.state, SessionState::Warn);
    }

    #[tokio::test]
    async fn test_status_expired() {
        let (_dir, tracker) = tracker().await;

        tracker
            .record_login_at("cara", days_ago(31), None)
            .await
            .unwrap();

        let status = tracker.status("cara").await.unwrap();
        assert_eq!(status.state, SessionState::Expired);
        assert!(status.days_remaining.unwrap() <= 0);
    }

    #[tokio::test]
    async fn test_status_boundary_exactly_at_max_days() {
        let (_dir, tracker) = tracker().await;

        tracker
            .record_login_at("cara", days_ago(30), None)
            .await
            .unwrap();

        let status = tracker.status("cara").await.unwrap();
        assert_eq!(status.days_remaining, Some(0));
        assert_eq!(status.state, SessionState::Expired);
    }

    #[tokio::test]
    async fn test_status_respects_max_days_override() {
        let (_dir, tracker) = tracker().await;

        tracker
            .record_login_at("cara", days_ago(40), Some(60))
            .await
            .unwrap();

        let status = tracker.status("cara").await.unwrap();
        assert_eq!(status.max_days, 60);
        assert_eq!(status.days_remaining, Some(20));
        assert_eq!(status.state, SessionState::Ok);
    }

    #[tokio::test]
    async fn test_alerts_include_never_and_warn() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("easelcast.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        let config = SessionsConfig {
            browser_destinations: vec!["cara".to_string(), "faso".to_string()],
            max_days: 30,
            warn_days: 7,
        };
        let tracker = SessionTracker::new(db, &config);

        // cara close to expiry, faso never logged in
        tracker
            .record_login_at("cara", days_ago(26), None)
            .await
            .unwrap();

        let alerts = tracker.alerts().await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].destination, "cara");
        assert_eq!(alerts[0].state, SessionState::Warn);
        assert_eq!(alerts[1].destination, "faso");
        assert_eq!(alerts[1].state, SessionState::Never);
    }

    #[tokio::test]
    async fn test_alerts_exclude_ok_sessions() {
        let (_dir, tracker) = tracker().await;

        tracker.record_login("cara").await.unwrap();

        let alerts = tracker.alerts().await.unwrap();
        assert!(alerts.is_empty());
    }
}
