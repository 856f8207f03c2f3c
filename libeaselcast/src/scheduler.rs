//! Scheduled-post queue and due-post execution
//!
//! The queue is a persisted state machine: entries are created `pending`
//! and move exactly once to `posted`, `failed`, or `cancelled`. Terminal
//! entries are never re-queued automatically and never deleted, so the
//! queue doubles as an audit trail.
//!
//! `execute_due` is the cron-facing entry point. It runs due posts in
//! insertion order; one post's failure is recorded and never aborts the
//! rest of the batch.

use chrono::Utc;
use tracing::{info, warn};

use crate::assets::AssetResolver;
use crate::config::FormatterConfig;
use crate::db::{Database, QueueStats};
use crate::error::Result;
use crate::formatter::format_post;
use crate::post_log::PostLogger;
use crate::registry::PlatformRegistry;
use crate::types::ScheduledPost;

/// Outcome counts for one `execute_due` batch.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct ExecuteSummary {
    pub posted: usize,
    pub failed: usize,
}

pub struct Scheduler {
    db: Database,
    registry: PlatformRegistry,
    assets: Box<dyn AssetResolver>,
    logger: PostLogger,
    formatter: FormatterConfig,
}

impl Scheduler {
    pub fn new(
        db: Database,
        registry: PlatformRegistry,
        assets: Box<dyn AssetResolver>,
        logger: PostLogger,
        formatter: FormatterConfig,
    ) -> Self {
        Self {
            db,
            registry,
            assets,
            logger,
            formatter,
        }
    }

    /// Standard production wiring: default registry, filesystem asset
    /// resolver, audit logger per the config.
    pub fn from_config(config: &crate::Config, db: Database) -> Self {
        Self::new(
            db,
            PlatformRegistry::with_defaults(config.clone()),
            Box::new(crate::assets::FileAssetResolver::new(
                crate::config::expand_path(&config.library.assets_root),
            )),
            PostLogger::from_config(config),
            config.formatter.clone(),
        )
    }

    /// Schedule a post. The time is taken as given, past or future;
    /// validating against "now" is the caller's concern (the interactive
    /// CLI rejects past times, the engine does not).
    pub async fn add_post(
        &self,
        content_id: &str,
        content_ref: &str,
        destination: &str,
        scheduled_time: i64,
    ) -> Result<String> {
        let post = ScheduledPost::new(content_id, content_ref, destination, scheduled_time);
        self.db.insert_scheduled_post(&post).await?;
        info!(post_id = %post.id, destination, "scheduled post created");
        Ok(post.id)
    }

    pub async fn get(&self, id: &str) -> Result<Option<ScheduledPost>> {
        self.db.get_scheduled_post(id).await
    }

    /// Pending posts that are due now.
    pub async fn pending(&self) -> Result<Vec<ScheduledPost>> {
        self.db.due_posts(Utc::now().timestamp()).await
    }

    /// Pending posts not yet due.
    pub async fn upcoming(&self) -> Result<Vec<ScheduledPost>> {
        self.db.upcoming_posts(Utc::now().timestamp()).await
    }

    /// Cancel a pending post. Returns false (not an error) when the post
    /// is unknown or already terminal.
    pub async fn cancel(&self, id: &str) -> Result<bool> {
        self.db.cancel_scheduled_post(id).await
    }

    /// Idempotent terminal write; safe to repeat, last write wins.
    pub async fn mark_posted(&self, id: &str, url: Option<&str>) -> Result<()> {
        self.db.mark_posted(id, url).await
    }

    /// Idempotent terminal write; safe to repeat, last write wins.
    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        self.db.mark_failed(id, error).await
    }

    /// Completed and failed posts, most recent first.
    pub async fn history(&self, limit: usize) -> Result<Vec<ScheduledPost>> {
        self.db.history(limit).await
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        self.db.queue_stats().await
    }

    /// Execute every due post, in insertion order. Failures are local to
    /// their post: they are marked, logged, counted, and the batch moves on.
    /// Calling with nothing due is a silent no-op.
    pub async fn execute_due(&self) -> Result<ExecuteSummary> {
        let due = self.pending().await?;
        let mut summary = ExecuteSummary::default();

        for post in due {
            if self.execute_one(&post).await? {
                summary.posted += 1;
            } else {
                summary.failed += 1;
            }
        }

        Ok(summary)
    }

    async fn execute_one(&self, post: &ScheduledPost) -> Result<bool> {
        let item = match self.db.get_content_item(&post.content_id).await? {
            Some(item) => item,
            None => {
                let error = format!("Content not found: {}", post.content_id);
                return self.fail(post, &post.content_id, None, &error).await;
            }
        };

        let adapter = match self.registry.resolve(&post.destination) {
            Ok(adapter) => adapter,
            Err(e) => return self.fail(post, &item.title, None, &e.to_string()).await,
        };

        if !adapter.is_configured() {
            let error = format!("{} not configured", adapter.display_name());
            return self.fail(post, &item.title, None, &error).await;
        }

        let asset = match self.assets.resolve(&post.content_ref) {
            Some(path) => path,
            None => {
                let error = format!("Asset not found: {}", post.content_ref);
                return self.fail(post, &item.title, None, &error).await;
            }
        };

        let text = format_post(&item, &self.formatter);

        match adapter.post_image(&asset, &text, &item.description).await {
            Ok(url) => {
                // Schedule status and publish record move together; a crash
                // leaves both or neither.
                self.db
                    .record_publish_success(
                        &post.id,
                        &post.content_id,
                        &post.destination,
                        url.as_deref(),
                        Utc::now().timestamp(),
                    )
                    .await?;
                self.logger
                    .success(&post.destination, &item.title, Some(&asset), url.as_deref());
                info!(
                    post_id = %post.id,
                    destination = %post.destination,
                    "scheduled post published"
                );
                Ok(true)
            }
            Err(e) => self.fail(post, &item.title, Some(asset.as_path()), &e.to_string()).await,
        }
    }

    async fn fail(
        &self,
        post: &ScheduledPost,
        title: &str,
        asset: Option<&std::path::Path>,
        error: &str,
    ) -> Result<bool> {
        self.db.mark_failed(&post.id, error).await?;
        self.logger.failure(&post.destination, title, asset, error);
        warn!(
            post_id = %post.id,
            destination = %post.destination,
            "scheduled post failed: {}",
            error
        );
        Ok(false)
    }
}

