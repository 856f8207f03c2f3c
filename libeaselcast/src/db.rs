//! Database operations for Easelcast
//!
//! All persisted orchestration state lives in one SQLite database: the
//! schedule queue, content publish records, the rotation round counter, and
//! manual-login stamps. Putting them behind a transactional store (instead
//! of loose JSON files) lets a post attempt update the schedule entry and
//! the publish record in a single transaction.

use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::types::{ContentItem, PublishRecord, ScheduleStatus, ScheduledPost};

/// Queue-wide status counts for the stats surface.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct QueueStats {
    pub pending: i64,
    pub posted: i64,
    pub failed: i64,
    pub cancelled: i64,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if necessary) the database at the given path and run
    /// pending migrations.
    pub async fn new(db_path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(crate::error::StoreError::IoError)?;
        }

        // Forward slashes keep the SQLite URL portable; mode=rwc creates the
        // file on first open.
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(crate::error::StoreError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(crate::error::StoreError::MigrationError)?;

        Ok(Self { pool })
    }

    // ========================================================================
    // Schedule queue
    // ========================================================================

    pub async fn insert_scheduled_post(&self, post: &ScheduledPost) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_posts
                (id, content_id, content_ref, destination, scheduled_time, status, result_url, error, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.content_id)
        .bind(&post.content_ref)
        .bind(&post.destination)
        .bind(post.scheduled_time)
        .bind(post.status.as_str())
        .bind(&post.result_url)
        .bind(&post.error)
        .bind(post.created_at)
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(())
    }

    pub async fn get_scheduled_post(&self, id: &str) -> Result<Option<ScheduledPost>> {
        let row = sqlx::query(
            r#"
            SELECT id, content_id, content_ref, destination, scheduled_time, status, result_url, error, created_at
            FROM scheduled_posts WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(row.map(|r| scheduled_post_from_row(&r)))
    }

    /// Pending entries already due, in original insertion order.
    pub async fn due_posts(&self, now: i64) -> Result<Vec<ScheduledPost>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content_id, content_ref, destination, scheduled_time, status, result_url, error, created_at
            FROM scheduled_posts
            WHERE status = 'pending' AND scheduled_time <= ?
            ORDER BY rowid
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(rows.iter().map(scheduled_post_from_row).collect())
    }

    /// Pending entries not yet due, soonest first.
    pub async fn upcoming_posts(&self, now: i64) -> Result<Vec<ScheduledPost>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content_id, content_ref, destination, scheduled_time, status, result_url, error, created_at
            FROM scheduled_posts
            WHERE status = 'pending' AND scheduled_time > ?
            ORDER BY scheduled_time
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(rows.iter().map(scheduled_post_from_row).collect())
    }

    /// Cancel a pending entry. Returns false when the entry is missing or
    /// already terminal; terminal states never transition.
    pub async fn cancel_scheduled_post(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_posts SET status = 'cancelled'
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Terminal write; last write wins if invoked twice.
    pub async fn mark_posted(&self, id: &str, url: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE scheduled_posts SET status = 'posted', result_url = ? WHERE id = ?
            "#,
        )
        .bind(url)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(())
    }

    /// Terminal write; last write wins if invoked twice.
    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE scheduled_posts SET status = 'failed', error = ? WHERE id = ?
            "#,
        )
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(())
    }

    /// Completed and failed entries, most recent scheduled time first.
    pub async fn history(&self, limit: usize) -> Result<Vec<ScheduledPost>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content_id, content_ref, destination, scheduled_time, status, result_url, error, created_at
            FROM scheduled_posts
            WHERE status IN ('posted', 'failed')
            ORDER BY scheduled_time DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(rows.iter().map(scheduled_post_from_row).collect())
    }

    pub async fn queue_stats(&self) -> Result<QueueStats> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS n FROM scheduled_posts GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        let mut stats = QueueStats::default();
        for row in rows {
            let n: i64 = row.get("n");
            match row.get::<String, _>("status").as_str() {
                "pending" => stats.pending = n,
                "posted" => stats.posted = n,
                "failed" => stats.failed = n,
                "cancelled" => stats.cancelled = n,
                _ => {}
            }
        }
        Ok(stats)
    }

    /// Mark a scheduled post as posted and bump the content item's publish
    /// record for that destination, in one transaction. A crash leaves
    /// either both writes or neither.
    pub async fn record_publish_success(
        &self,
        post_id: &str,
        content_id: &str,
        destination: &str,
        url: Option<&str>,
        now: i64,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(crate::error::StoreError::SqlxError)?;

        sqlx::query(
            r#"
            UPDATE scheduled_posts SET status = 'posted', result_url = ? WHERE id = ?
            "#,
        )
        .bind(url)
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        sqlx::query(
            r#"
            INSERT INTO publish_records (content_id, destination, publish_count, last_published_at, published_url)
            VALUES (?, ?, 1, ?, ?)
            ON CONFLICT (content_id, destination) DO UPDATE SET
                publish_count = publish_records.publish_count + 1,
                last_published_at = excluded.last_published_at,
                published_url = COALESCE(excluded.published_url, publish_records.published_url)
            "#,
        )
        .bind(content_id)
        .bind(destination)
        .bind(now)
        .bind(url)
        .execute(&mut *tx)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        tx.commit()
            .await
            .map_err(crate::error::StoreError::SqlxError)?;

        Ok(())
    }

    // ========================================================================
    // Content library
    // ========================================================================

    /// Insert or update a content item's descriptive fields. Publish
    /// records are never touched here; only publish attempts move them.
    pub async fn upsert_content_item(&self, item: &ContentItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO content_items (id, title, description, subject, asset_ref)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                subject = excluded.subject,
                asset_ref = excluded.asset_ref
            "#,
        )
        .bind(&item.id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.subject)
        .bind(&item.asset_ref)
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(())
    }

    pub async fn get_content_item(&self, id: &str) -> Result<Option<ContentItem>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, subject, asset_ref FROM content_items WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut item = content_item_from_row(&row);
        item.publish_records = self.publish_records_for(id).await?;
        Ok(Some(item))
    }

    pub async fn list_content_items(&self) -> Result<Vec<ContentItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, subject, asset_ref FROM content_items ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        let mut items: Vec<ContentItem> = rows.iter().map(content_item_from_row).collect();
        for item in &mut items {
            item.publish_records = self.publish_records_for(&item.id).await?;
        }
        Ok(items)
    }

    async fn publish_records_for(&self, content_id: &str) -> Result<HashMap<String, PublishRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT destination, publish_count, last_published_at, published_url
            FROM publish_records WHERE content_id = ?
            "#,
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(rows
            .iter()
            .map(|r| {
                (
                    r.get::<String, _>("destination"),
                    PublishRecord {
                        publish_count: r.get("publish_count"),
                        last_published_at: r.get("last_published_at"),
                        published_url: r.get("published_url"),
                    },
                )
            })
            .collect())
    }

    /// Rotation-mode publish record update: the count advances to the
    /// current round regardless of the attempt's outcome, so a broken
    /// destination is retried next round instead of every run. Counts never
    /// move backwards (a scheduler-mode count already past the round stays
    /// put), and the stored URL is only replaced when the attempt produced
    /// one.
    pub async fn set_publish_round(
        &self,
        content_id: &str,
        destination: &str,
        round: i64,
        now: i64,
        url: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO publish_records (content_id, destination, publish_count, last_published_at, published_url)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (content_id, destination) DO UPDATE SET
                publish_count = MAX(publish_records.publish_count, excluded.publish_count),
                last_published_at = excluded.last_published_at,
                published_url = COALESCE(excluded.published_url, publish_records.published_url)
            "#,
        )
        .bind(content_id)
        .bind(destination)
        .bind(round)
        .bind(now)
        .bind(url)
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(())
    }

    // ========================================================================
    // Round counter
    // ========================================================================

    /// The current rotation round, creating the counter at 1 on first use.
    pub async fn current_round(&self) -> Result<i64> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO rounds (id, current_round) VALUES (1, 1)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        let row = sqlx::query(
            r#"
            SELECT current_round FROM rounds WHERE id = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(row.get("current_round"))
    }

    /// Advance the round counter and return the new round.
    pub async fn increment_round(&self) -> Result<i64> {
        let current = self.current_round().await?;

        sqlx::query(
            r#"
            UPDATE rounds SET current_round = ? WHERE id = 1
            "#,
        )
        .bind(current + 1)
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(current + 1)
    }

    // ========================================================================
    // Manual-login stamps
    // ========================================================================

    pub async fn record_login_at(
        &self,
        destination: &str,
        timestamp: i64,
        max_days: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO manual_logins (destination, last_login, max_days)
            VALUES (?, ?, ?)
            ON CONFLICT (destination) DO UPDATE SET
                last_login = excluded.last_login,
                max_days = COALESCE(excluded.max_days, manual_logins.max_days)
            "#,
        )
        .bind(destination)
        .bind(timestamp)
        .bind(max_days)
        .execute(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(())
    }

    /// Returns `(last_login, max_days_override)` when a login has been
    /// recorded for the destination.
    pub async fn get_login(&self, destination: &str) -> Result<Option<(i64, Option<i64>)>> {
        let row = sqlx::query(
            r#"
            SELECT last_login, max_days FROM manual_logins WHERE destination = ?
            "#,
        )
        .bind(destination)
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::error::StoreError::SqlxError)?;

        Ok(row.map(|r| (r.get("last_login"), r.get("max_days"))))
    }
}

fn scheduled_post_from_row(row: &sqlx::sqlite::SqliteRow) -> ScheduledPost {
    ScheduledPost {
        id: row.get("id"),
        content_id: row.get("content_id"),
        content_ref: row.get("content_ref"),
        destination: row.get("destination"),
        scheduled_time: row.get("scheduled_time"),
        status: ScheduleStatus::parse(&row.get::<String, _>("status")),
        result_url: row.get("result_url"),
        error: row.get("error"),
        created_at: row.get("created_at"),
    }
}

fn content_item_from_row(row: &sqlx::sqlite::SqliteRow) -> ContentItem {
    ContentItem {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        subject: row.get("subject"),
        asset_ref: row.get("asset_ref"),
        publish_records: HashMap::new(),
    }
}
