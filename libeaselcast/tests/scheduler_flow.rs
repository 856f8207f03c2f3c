//! Integration tests for the schedule queue state machine and due-post
//! execution, driving the real engine against a temp-file store and mock
//! destinations.

use std::collections::HashMap;
use std::path::PathBuf;

use tempfile::TempDir;

use libeaselcast::assets::FileAssetResolver;
use libeaselcast::config::{Config, FormatterConfig};
use libeaselcast::platforms::mock::{MockConfig, MockPlatform};
use libeaselcast::post_log::PostLogger;
use libeaselcast::{
    ContentItem, Database, PlatformRegistry, ScheduleStatus, Scheduler,
};

struct Env {
    dir: TempDir,
    db: Database,
}

async fn setup() -> Env {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("easelcast.db");
    let db = Database::new(db_path.to_str().unwrap()).await.unwrap();
    std::fs::create_dir_all(dir.path().join("assets")).unwrap();
    Env { dir, db }
}

impl Env {
    fn scheduler(&self, mocks: Vec<MockConfig>) -> Scheduler {
        let mut registry = PlatformRegistry::new(Config::default());
        for mock in mocks {
            let name = mock.name.clone();
            registry.register(&name, move |_| Box::new(MockPlatform::new(mock.clone())));
        }

        let assets = Box::new(FileAssetResolver::new(self.dir.path().join("assets")));
        let logger = PostLogger::new(
            self.dir.path().join("logs"),
            self.dir.path().join("screenshots"),
            Vec::new(),
        );

        Scheduler::new(
            self.db.clone(),
            registry,
            assets,
            logger,
            FormatterConfig::default(),
        )
    }

    async fn seed_item(&self, id: &str, title: &str) -> PathBuf {
        let asset = self.dir.path().join("assets").join(format!("{}.jpg", id));
        std::fs::write(&asset, b"jpeg bytes").unwrap();

        let item = ContentItem {
            id: id.to_string(),
            title: title.to_string(),
            description: "A small painting.".to_string(),
            subject: "Harbors".to_string(),
            asset_ref: format!("{}.jpg", id),
            publish_records: HashMap::new(),
        };
        self.db.upsert_content_item(&item).await.unwrap();
        asset
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[tokio::test]
async fn test_add_post_round_trip_upcoming() {
    let env = setup().await;
    let scheduler = env.scheduler(vec![MockConfig::named("mastodon")]);
    env.seed_item("harbor", "Harbor at Dawn").await;

    let when = now() + 3600;
    let id = scheduler
        .add_post("harbor", "harbor.jpg", "mastodon", when)
        .await
        .unwrap();

    let upcoming = scheduler.upcoming().await.unwrap();
    assert_eq!(upcoming.len(), 1);
    let post = &upcoming[0];
    assert_eq!(post.id, id);
    assert_eq!(post.content_id, "harbor");
    assert_eq!(post.content_ref, "harbor.jpg");
    assert_eq!(post.destination, "mastodon");
    assert_eq!(post.scheduled_time, when);
    assert_eq!(post.status, ScheduleStatus::Pending);

    assert!(scheduler.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_post_in_past_lands_in_pending() {
    // The engine performs no "is this in the future" validation
    let env = setup().await;
    let scheduler = env.scheduler(vec![MockConfig::named("mastodon")]);

    scheduler
        .add_post("harbor", "harbor.jpg", "mastodon", now() - 3600)
        .await
        .unwrap();

    assert_eq!(scheduler.pending().await.unwrap().len(), 1);
    assert!(scheduler.upcoming().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scenario_past_post_lifecycle() {
    // Schedule an hour in the past; it is due, and after being marked
    // posted it leaves the pending set and shows up in history.
    let env = setup().await;
    let scheduler = env.scheduler(vec![MockConfig::named("mastodon")]);

    let id = scheduler
        .add_post("harbor", "harbor.jpg", "mastodon", now() - 3600)
        .await
        .unwrap();

    let pending = scheduler.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);

    scheduler
        .mark_posted(&id, Some("https://example/1"))
        .await
        .unwrap();

    assert!(scheduler.pending().await.unwrap().is_empty());

    let history = scheduler.history(50).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, id);
    assert_eq!(history[0].status, ScheduleStatus::Posted);
    assert_eq!(history[0].result_url.as_deref(), Some("https://example/1"));
}

#[tokio::test]
async fn test_cancel_returns_true_then_false() {
    let env = setup().await;
    let scheduler = env.scheduler(vec![MockConfig::named("mastodon")]);

    let id = scheduler
        .add_post("harbor", "harbor.jpg", "mastodon", now() + 3600)
        .await
        .unwrap();

    assert!(scheduler.cancel(&id).await.unwrap());
    assert!(!scheduler.cancel(&id).await.unwrap());

    let post = scheduler.get(&id).await.unwrap().unwrap();
    assert_eq!(post.status, ScheduleStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_posted_entry_returns_false() {
    let env = setup().await;
    let scheduler = env.scheduler(vec![MockConfig::named("mastodon")]);

    let id = scheduler
        .add_post("harbor", "harbor.jpg", "mastodon", now() - 60)
        .await
        .unwrap();
    scheduler.mark_posted(&id, None).await.unwrap();

    assert!(!scheduler.cancel(&id).await.unwrap());
    let post = scheduler.get(&id).await.unwrap().unwrap();
    assert_eq!(post.status, ScheduleStatus::Posted);
}

#[tokio::test]
async fn test_execute_due_success_updates_everything() {
    let env = setup().await;
    let mock = MockConfig::named("mastodon");
    let handle = MockPlatform::new(mock.clone());
    let scheduler = env.scheduler(vec![mock]);
    env.seed_item("harbor", "Harbor at Dawn").await;

    let id = scheduler
        .add_post("harbor", "harbor.jpg", "mastodon", now() - 60)
        .await
        .unwrap();

    let summary = scheduler.execute_due().await.unwrap();
    assert_eq!(summary.posted, 1);
    assert_eq!(summary.failed, 0);

    // Schedule entry reached its terminal state with the result URL
    let post = scheduler.get(&id).await.unwrap().unwrap();
    assert_eq!(post.status, ScheduleStatus::Posted);
    assert!(post.result_url.is_some());

    // Publish record moved with it
    let item = env.db.get_content_item("harbor").await.unwrap().unwrap();
    let record = &item.publish_records["mastodon"];
    assert_eq!(record.publish_count, 1);
    assert!(record.last_published_at.is_some());
    assert_eq!(record.published_url, post.result_url);

    // And the adapter received the canonical text
    let texts = handle.posted_texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Harbor at Dawn\n\n"));
    assert!(texts[0].contains("#art #artforsale #harbors"));
}

#[tokio::test]
async fn test_execute_due_failure_is_isolated() {
    let env = setup().await;
    let failing = MockConfig {
        post_succeeds: false,
        post_error: Some("Connection reset by peer".to_string()),
        ..MockConfig::named("flickr")
    };
    let scheduler = env.scheduler(vec![failing, MockConfig::named("mastodon")]);
    env.seed_item("harbor", "Harbor at Dawn").await;

    let failing_id = scheduler
        .add_post("harbor", "harbor.jpg", "flickr", now() - 120)
        .await
        .unwrap();
    let ok_id = scheduler
        .add_post("harbor", "harbor.jpg", "mastodon", now() - 60)
        .await
        .unwrap();

    let summary = scheduler.execute_due().await.unwrap();
    assert_eq!(summary.posted, 1);
    assert_eq!(summary.failed, 1);

    let failed = scheduler.get(&failing_id).await.unwrap().unwrap();
    assert_eq!(failed.status, ScheduleStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("Connection reset"));

    let posted = scheduler.get(&ok_id).await.unwrap().unwrap();
    assert_eq!(posted.status, ScheduleStatus::Posted);
}

#[tokio::test]
async fn test_execute_due_unknown_destination_fails_post() {
    let env = setup().await;
    let scheduler = env.scheduler(vec![MockConfig::named("mastodon")]);
    env.seed_item("harbor", "Harbor at Dawn").await;

    let id = scheduler
        .add_post("harbor", "harbor.jpg", "friendica", now() - 60)
        .await
        .unwrap();

    let summary = scheduler.execute_due().await.unwrap();
    assert_eq!(summary.failed, 1);

    let post = scheduler.get(&id).await.unwrap().unwrap();
    assert_eq!(post.status, ScheduleStatus::Failed);
    assert!(post.error.as_deref().unwrap().contains("Unknown destination"));
}

#[tokio::test]
async fn test_execute_due_unconfigured_destination_fails_post() {
    let env = setup().await;
    let scheduler = env.scheduler(vec![MockConfig {
        configured: false,
        ..MockConfig::named("cara")
    }]);
    env.seed_item("harbor", "Harbor at Dawn").await;

    let id = scheduler
        .add_post("harbor", "harbor.jpg", "cara", now() - 60)
        .await
        .unwrap();

    scheduler.execute_due().await.unwrap();

    let post = scheduler.get(&id).await.unwrap().unwrap();
    assert_eq!(post.status, ScheduleStatus::Failed);
    assert!(post.error.as_deref().unwrap().contains("not configured"));
}

#[tokio::test]
async fn test_execute_due_missing_content_fails_post() {
    let env = setup().await;
    let scheduler = env.scheduler(vec![MockConfig::named("mastodon")]);

    let id = scheduler
        .add_post("ghost", "ghost.jpg", "mastodon", now() - 60)
        .await
        .unwrap();

    let summary = scheduler.execute_due().await.unwrap();
    assert_eq!(summary.failed, 1);

    let post = scheduler.get(&id).await.unwrap().unwrap();
    assert!(post.error.as_deref().unwrap().contains("Content not found"));
}

#[tokio::test]
async fn test_execute_due_missing_asset_fails_post() {
    let env = setup().await;
    let mock = MockConfig::named("mastodon");
    let handle = MockPlatform::new(mock.clone());
    let scheduler = env.scheduler(vec![mock]);
    env.seed_item("harbor", "Harbor at Dawn").await;

    let id = scheduler
        .add_post("harbor", "missing.jpg", "mastodon", now() - 60)
        .await
        .unwrap();

    scheduler.execute_due().await.unwrap();

    let post = scheduler.get(&id).await.unwrap().unwrap();
    assert_eq!(post.status, ScheduleStatus::Failed);
    assert!(post.error.as_deref().unwrap().contains("Asset not found"));
    // The adapter was never reached
    assert_eq!(handle.post_calls(), 0);
}

#[tokio::test]
async fn test_execute_due_runs_in_insertion_order() {
    let env = setup().await;
    let mock = MockConfig::named("mastodon");
    let handle = MockPlatform::new(mock.clone());
    let scheduler = env.scheduler(vec![mock]);
    env.seed_item("first", "First Painting").await;
    env.seed_item("second", "Second Painting").await;

    // The later-scheduled entry is inserted first and must run first
    scheduler
        .add_post("first", "first.jpg", "mastodon", now() - 10)
        .await
        .unwrap();
    scheduler
        .add_post("second", "second.jpg", "mastodon", now() - 5000)
        .await
        .unwrap();

    scheduler.execute_due().await.unwrap();

    let texts = handle.posted_texts();
    assert_eq!(texts.len(), 2);
    assert!(texts[0].starts_with("First Painting"));
    assert!(texts[1].starts_with("Second Painting"));
}

#[tokio::test]
async fn test_execute_due_with_nothing_due_is_noop() {
    let env = setup().await;
    let scheduler = env.scheduler(vec![MockConfig::named("mastodon")]);

    let summary = scheduler.execute_due().await.unwrap();
    assert_eq!(summary.posted, 0);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_terminal_posts_are_not_re_executed() {
    let env = setup().await;
    let mock = MockConfig::named("mastodon");
    let handle = MockPlatform::new(mock.clone());
    let scheduler = env.scheduler(vec![mock]);
    env.seed_item("harbor", "Harbor at Dawn").await;

    scheduler
        .add_post("harbor", "harbor.jpg", "mastodon", now() - 60)
        .await
        .unwrap();

    scheduler.execute_due().await.unwrap();
    let summary = scheduler.execute_due().await.unwrap();

    assert_eq!(summary.posted, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(handle.post_calls(), 1);
}

#[tokio::test]
async fn test_stats_reflect_queue() {
    let env = setup().await;
    let failing = MockConfig {
        post_succeeds: false,
        post_error: Some("boom".to_string()),
        ..MockConfig::named("flickr")
    };
    let scheduler = env.scheduler(vec![MockConfig::named("mastodon"), failing]);
    env.seed_item("harbor", "Harbor at Dawn").await;

    scheduler
        .add_post("harbor", "harbor.jpg", "mastodon", now() - 60)
        .await
        .unwrap();
    scheduler
        .add_post("harbor", "harbor.jpg", "flickr", now() - 60)
        .await
        .unwrap();
    let cancelled = scheduler
        .add_post("harbor", "harbor.jpg", "mastodon", now() + 3600)
        .await
        .unwrap();
    scheduler
        .add_post("harbor", "harbor.jpg", "mastodon", now() + 7200)
        .await
        .unwrap();
    scheduler.cancel(&cancelled).await.unwrap();

    scheduler.execute_due().await.unwrap();

    let stats = scheduler.stats().await.unwrap();
    assert_eq!(stats.posted, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.pending, 1);
}
