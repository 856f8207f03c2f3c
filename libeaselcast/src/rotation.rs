//! Daily fairness rotation
//!
//! Publishes one randomly chosen item to every configured destination per
//! run, using a persisted round counter to guarantee whole-library coverage:
//! an item is eligible for round R while any destination's publish count is
//! behind R, and the round only advances once no item is behind. Random
//! selection keeps the posting order unpredictable; the round discipline
//! still guarantees every item is visited before any repeats.

use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};

use crate::assets::AssetResolver;
use crate::config::FormatterConfig;
use crate::db::Database;
use crate::error::{EaselError, Result};
use crate::formatter::format_post;
use crate::post_log::PostLogger;
use crate::registry::PlatformRegistry;
use crate::types::{ContentItem, PublishResult};

/// What one rotation run did.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RotationSummary {
    pub round: i64,
    pub content_id: String,
    pub title: String,
    /// One entry per destination, in destination-set order.
    pub results: Vec<PublishResult>,
}

impl RotationSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

pub struct RotationEngine {
    db: Database,
    registry: PlatformRegistry,
    assets: Box<dyn AssetResolver>,
    logger: PostLogger,
    formatter: FormatterConfig,
    destinations: Vec<String>,
}

impl RotationEngine {
    pub fn new(
        db: Database,
        registry: PlatformRegistry,
        assets: Box<dyn AssetResolver>,
        logger: PostLogger,
        formatter: FormatterConfig,
        destinations: Vec<String>,
    ) -> Self {
        Self {
            db,
            registry,
            assets,
            logger,
            formatter,
            destinations,
        }
    }

    /// Standard production wiring: default registry, filesystem asset
    /// resolver, audit logger and destination set per the config.
    pub fn from_config(config: &crate::Config, db: Database) -> Self {
        Self::new(
            db,
            PlatformRegistry::with_defaults(config.clone()),
            Box::new(crate::assets::FileAssetResolver::new(
                crate::config::expand_path(&config.library.assets_root),
            )),
            PostLogger::from_config(config),
            config.formatter.clone(),
            config.rotation.destinations.clone(),
        )
    }

    /// Run one rotation cycle: pick an eligible item and publish it to
    /// every configured destination, sequentially.
    ///
    /// Per-destination failures are isolated; whatever happens, the item's
    /// publish count for that destination advances to the current round, so
    /// a broken destination is retried next round rather than every run.
    ///
    /// # Errors
    ///
    /// `NoEligibleContent` when nothing is eligible even after rolling the
    /// round over — the library is empty or the destination set is broken.
    pub async fn run_once(&self) -> Result<RotationSummary> {
        let items = self.db.list_content_items().await?;
        if items.is_empty() {
            return Err(EaselError::NoEligibleContent);
        }

        let mut round = self.db.current_round().await?;
        let mut eligible = eligible_items(&items, round, &self.destinations);

        if eligible.is_empty() {
            round = self.db.increment_round().await?;
            info!("library fully covered; advancing to round {}", round);
            eligible = eligible_items(&items, round, &self.destinations);
        }

        if eligible.is_empty() {
            return Err(EaselError::NoEligibleContent);
        }

        let item = eligible[rand::thread_rng().gen_range(0..eligible.len())];
        info!(
            round,
            content_id = %item.id,
            title = %item.title,
            eligible = eligible.len(),
            "selected item for rotation"
        );

        let asset = self.assets.resolve(&item.asset_ref);
        let text = format_post(item, &self.formatter);
        let now = Utc::now().timestamp();

        let mut results = Vec::with_capacity(self.destinations.len());
        for destination in &self.destinations {
            let result = self
                .publish_to(destination, item, asset.as_deref(), &text)
                .await;

            // Round advances regardless of outcome; see module docs.
            self.db
                .set_publish_round(&item.id, destination, round, now, result.url.as_deref())
                .await?;

            results.push(result);
        }

        Ok(RotationSummary {
            round,
            content_id: item.id.clone(),
            title: item.title.clone(),
            results,
        })
    }

    async fn publish_to(
        &self,
        destination: &str,
        item: &ContentItem,
        asset: Option<&std::path::Path>,
        text: &str,
    ) -> PublishResult {
        let adapter = match self.registry.resolve(destination) {
            Ok(adapter) => adapter,
            Err(e) => {
                let error = e.to_string();
                self.logger.failure(destination, &item.title, asset, &error);
                return PublishResult::failed(destination, error);
            }
        };

        if !adapter.is_configured() {
            let error = format!("{} not configured", adapter.display_name());
            self.logger.failure(destination, &item.title, asset, &error);
            warn!(destination, "skipping unconfigured destination");
            return PublishResult::failed(destination, error);
        }

        match adapter.verify_credentials().await {
            Ok(true) => {}
            Ok(false) => {
                self.logger.credential_failure(destination);
                return PublishResult::failed(
                    destination,
                    format!("{} credentials invalid", adapter.display_name()),
                );
            }
            Err(e) => {
                self.logger.credential_failure(destination);
                return PublishResult::failed(destination, e.to_string());
            }
        }

        let Some(asset) = asset else {
            let error = format!("Asset not found: {}", item.asset_ref);
            self.logger.failure(destination, &item.title, None, &error);
            return PublishResult::failed(destination, error);
        };

        match adapter.post_image(asset, text, &item.description).await {
            Ok(url) => {
                info!(destination, title = %item.title, "rotation publish succeeded");
                self.logger
                    .success(destination, &item.title, Some(asset), url.as_deref());
                PublishResult::posted(destination, url)
            }
            Err(e) => {
                let error = e.to_string();
                warn!(destination, "rotation publish failed: {}", error);
                self.logger.failure(destination, &item.title, Some(asset), &error);
                PublishResult::failed(destination, error)
            }
        }
    }
}

/// An item is eligible for a round while any destination in the set is
/// behind that round.
fn eligible_items<'a>(
    items: &'a [ContentItem],
    round: i64,
    destinations: &[String],
) -> Vec<&'a ContentItem> {
    items
        .iter()
        .filter(|item| destinations.iter().any(|d| item.publish_count(d) < round))
        .collect()
}
