//! Configuration management for Easelcast

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub formatter: FormatterConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub logs: LogsConfig,
    pub mastodon: Option<MastodonConfig>,
    /// Pixelfed speaks the Mastodon client API, so it shares the config shape.
    pub pixelfed: Option<MastodonConfig>,
    pub flickr: Option<FlickrConfig>,
    pub cara: Option<CaraConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/easelcast/easelcast.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Root directory that relative `content_ref`/`asset_ref` locators are
    /// resolved against.
    pub assets_root: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            assets_root: "~/.local/share/easelcast/assets".to_string(),
        }
    }
}

/// Settings for the canonical post-text format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterConfig {
    #[serde(default = "default_base_tags")]
    pub base_tags: Vec<String>,
    /// Promotional footer appended to every post.
    #[serde(default = "default_website")]
    pub website: String,
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            base_tags: default_base_tags(),
            website: default_website(),
            max_words: default_max_words(),
        }
    }
}

fn default_base_tags() -> Vec<String> {
    vec!["#art".to_string(), "#artforsale".to_string()]
}

fn default_website() -> String {
    "easelcast.art".to_string()
}

fn default_max_words() -> usize {
    75
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Destination set the daily fairness poster publishes to, in order.
    pub destinations: Vec<String>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            destinations: vec![
                "mastodon".to_string(),
                "pixelfed".to_string(),
                "flickr".to_string(),
                "cara".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Destinations whose automation rides on a manually established
    /// browser session rather than an API token.
    #[serde(default = "default_browser_destinations")]
    pub browser_destinations: Vec<String>,
    #[serde(default = "default_max_days")]
    pub max_days: i64,
    #[serde(default = "default_warn_days")]
    pub warn_days: i64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            browser_destinations: default_browser_destinations(),
            max_days: default_max_days(),
            warn_days: default_warn_days(),
        }
    }
}

fn default_browser_destinations() -> Vec<String> {
    vec!["cara".to_string()]
}

fn default_max_days() -> i64 {
    30
}

fn default_warn_days() -> i64 {
    7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    /// Directory for the publish audit log (`social.log`).
    pub dir: String,
    /// Where browser-automation drivers drop diagnostic screenshots.
    pub screenshots_dir: String,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            dir: "~/.local/share/easelcast/logs".to_string(),
            screenshots_dir: "~/.local/share/easelcast/logs/screenshots".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MastodonConfig {
    pub enabled: bool,
    /// Instance hostname or URL, e.g. "mastodon.social".
    pub instance: String,
    /// File holding the OAuth access token.
    pub token_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlickrConfig {
    pub enabled: bool,
    pub api_key: String,
    pub api_secret: String,
    /// File holding the OAuth 1.0a token on the first line and the token
    /// secret on the second.
    pub token_file: String,
    /// Account NSID used to build photo URLs. Optional; without it posts
    /// succeed but report no URL.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaraConfig {
    pub enabled: bool,
    /// Persistent browser profile directory set up by the manual login flow.
    pub profile_dir: String,
    /// External automation driver command.
    #[serde(default = "default_cara_driver")]
    pub driver: String,
    #[serde(default = "default_cara_timeout")]
    pub timeout_secs: u64,
}

fn default_cara_driver() -> String {
    "easel-cara-driver".to_string()
}

fn default_cara_timeout() -> u64 {
    180
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("EASELCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("easelcast").join("config.toml"))
}

/// Expand a configured path (`~` included) to a concrete filesystem path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.path, "~/.local/share/easelcast/easelcast.db");
        assert_eq!(config.formatter.base_tags, vec!["#art", "#artforsale"]);
        assert_eq!(config.formatter.max_words, 75);
        assert_eq!(
            config.rotation.destinations,
            vec!["mastodon", "pixelfed", "flickr", "cara"]
        );
        assert_eq!(config.sessions.browser_destinations, vec!["cara"]);
        assert_eq!(config.sessions.max_days, 30);
        assert_eq!(config.sessions.warn_days, 7);
        assert!(config.mastodon.is_none());
        assert!(config.cara.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str(
            r#"
            [store]
            path = "/tmp/easelcast-test.db"

            [mastodon]
            enabled = true
            instance = "mastodon.social"
            token_file = "/tmp/mastodon.token"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.path, "/tmp/easelcast-test.db");
        let mastodon = config.mastodon.unwrap();
        assert!(mastodon.enabled);
        assert_eq!(mastodon.instance, "mastodon.social");
        // Unspecified sections fall back to defaults
        assert_eq!(config.formatter.max_words, 75);
    }

    #[test]
    fn test_parse_cara_defaults() {
        let config: Config = toml::from_str(
            r#"
            [cara]
            enabled = true
            profile_dir = "/tmp/cara_profile"
            "#,
        )
        .unwrap();

        let cara = config.cara.unwrap();
        assert_eq!(cara.driver, "easel-cara-driver");
        assert_eq!(cara.timeout_secs, 180);
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_env_override() {
        std::env::set_var("EASELCAST_CONFIG", "/tmp/custom-easelcast.toml");
        let path = resolve_config_path().unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom-easelcast.toml"));
        std::env::remove_var("EASELCAST_CONFIG");
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_default() {
        std::env::remove_var("EASELCAST_CONFIG");
        let path = resolve_config_path().unwrap();
        assert!(path.ends_with("easelcast/config.toml"));
    }

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("/var/lib/easelcast"), PathBuf::from("/var/lib/easelcast"));
    }
}
