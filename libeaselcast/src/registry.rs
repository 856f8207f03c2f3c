//! Destination registry
//!
//! Maps destination names to adapter factories. Construction is lazy and
//! per-resolution: every `resolve` call builds a fresh adapter from the
//! current config, so adapters never share mutable state across calls and
//! destinations that are never resolved never read their credentials.

use crate::config::{expand_path, Config};
use crate::error::{PlatformError, Result};
use crate::platforms::cara::CaraPlatform;
use crate::platforms::flickr::FlickrPlatform;
use crate::platforms::mastodon::MastodonPlatform;
use crate::platforms::Platform;

pub type AdapterFactory = Box<dyn Fn(&Config) -> Box<dyn Platform> + Send + Sync>;

pub struct PlatformRegistry {
    config: Config,
    entries: Vec<(String, AdapterFactory)>,
}

impl PlatformRegistry {
    /// An empty registry. Useful for tests; production callers usually want
    /// [`PlatformRegistry::with_defaults`].
    pub fn new(config: Config) -> Self {
        Self {
            config,
            entries: Vec::new(),
        }
    }

    /// The standard destination set: Mastodon and Pixelfed (bearer REST),
    /// Flickr (OAuth 1.0a), and Cara (browser automation).
    pub fn with_defaults(config: Config) -> Self {
        let mut registry = Self::new(config);

        registry.register("mastodon", |config| {
            Box::new(MastodonPlatform::from_config(
                "mastodon",
                "Mastodon",
                config.mastodon.as_ref(),
            ))
        });
        registry.register("pixelfed", |config| {
            Box::new(MastodonPlatform::from_config(
                "pixelfed",
                "Pixelfed",
                config.pixelfed.as_ref(),
            ))
        });
        registry.register("flickr", |config| {
            Box::new(FlickrPlatform::from_config(config.flickr.as_ref()))
        });
        registry.register("cara", |config| {
            Box::new(CaraPlatform::from_config(
                config.cara.as_ref(),
                &expand_path(&config.logs.screenshots_dir),
            ))
        });

        registry
    }

    /// Register a factory under a name. Re-registering a name replaces the
    /// factory in place, keeping its position in the order.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Config) -> Box<dyn Platform> + Send + Sync + 'static,
    {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = Box::new(factory);
        } else {
            self.entries.push((name.to_string(), Box::new(factory)));
        }
    }

    /// Construct a fresh adapter for the named destination.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn Platform>> {
        let (_, factory) = self
            .entries
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| PlatformError::UnknownDestination(name.to_string()))?;

        Ok(factory(&self.config))
    }

    /// Registered destination names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }
}
