//! Mock destination for testing
//!
//! A configurable in-memory destination used by the integration tests to
//! exercise the scheduler and rotation engine without credentials or
//! network access. Shared `Arc` counters survive the registry's
//! fresh-adapter-per-resolve behavior, so tests can assert on what was
//! posted across resolutions.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{PlatformError, Result};
use crate::platforms::Platform;

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,
    pub display_name: String,

    /// Whether `is_configured` reports readiness
    pub configured: bool,

    /// Whether `verify_credentials` answers true
    pub credentials_valid: bool,

    /// Whether posting succeeds
    pub post_succeeds: bool,

    /// Error returned on posting failure
    pub post_error: Option<String>,

    /// URL reported on posting success (None simulates destinations that
    /// return no URL)
    pub post_url: Option<String>,

    /// Number of times verify_credentials has been called
    pub verify_calls: Arc<Mutex<usize>>,

    /// Number of times post_image has been called
    pub post_calls: Arc<Mutex<usize>>,

    /// Texts that have been posted (for verification)
    pub posted_texts: Arc<Mutex<Vec<String>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            display_name: "Mock".to_string(),
            configured: true,
            credentials_valid: true,
            post_succeeds: true,
            post_error: None,
            post_url: None,
            verify_calls: Arc::new(Mutex::new(0)),
            post_calls: Arc::new(Mutex::new(0)),
            posted_texts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            ..Default::default()
        }
    }
}

pub struct MockPlatform {
    config: MockConfig,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// A destination that accepts everything
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig::named(name))
    }

    /// A destination whose posts fail with the given error
    pub fn post_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            post_succeeds: false,
            post_error: Some(error.to_string()),
            ..MockConfig::named(name)
        })
    }

    /// A destination with no credentials present
    pub fn not_configured(name: &str) -> Self {
        Self::new(MockConfig {
            configured: false,
            ..MockConfig::named(name)
        })
    }

    /// A destination whose live credential check fails
    pub fn invalid_credentials(name: &str) -> Self {
        Self::new(MockConfig {
            credentials_valid: false,
            ..MockConfig::named(name)
        })
    }

    pub fn verify_calls(&self) -> usize {
        *self.config.verify_calls.lock().unwrap()
    }

    pub fn post_calls(&self) -> usize {
        *self.config.post_calls.lock().unwrap()
    }

    pub fn posted_texts(&self) -> Vec<String> {
        self.config.posted_texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn display_name(&self) -> &str {
        &self.config.display_name
    }

    fn is_configured(&self) -> bool {
        self.config.configured
    }

    async fn verify_credentials(&self) -> Result<bool> {
        *self.config.verify_calls.lock().unwrap() += 1;
        Ok(self.config.configured && self.config.credentials_valid)
    }

    async fn post_image(&self, _image: &Path, text: &str, _alt_text: &str) -> Result<Option<String>> {
        let mut calls = self.config.post_calls.lock().unwrap();
        *calls += 1;
        let n = *calls;
        drop(calls);

        if !self.config.configured {
            return Err(PlatformError::Unconfigured(format!(
                "{} not configured",
                self.config.display_name
            ))
            .into());
        }

        if self.config.post_succeeds {
            self.config
                .posted_texts
                .lock()
                .unwrap()
                .push(text.to_string());

            Ok(self
                .config
                .post_url
                .clone()
                .or_else(|| Some(format!("https://posts.example/{}/{}", self.config.name, n))))
        } else {
            let error = self
                .config
                .post_error
                .clone()
                .unwrap_or_else(|| "Mock posting failed".to_string());
            Err(PlatformError::Posting(error).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let platform = MockPlatform::success("test");

        assert!(platform.is_configured());
        assert!(platform.verify_credentials().await.unwrap());
        assert_eq!(platform.verify_calls(), 1);

        let url = platform
            .post_image(Path::new("x.jpg"), "Hello", "")
            .await
            .unwrap();
        assert_eq!(url.as_deref(), Some("https://posts.example/test/1"));
        assert_eq!(platform.post_calls(), 1);
        assert_eq!(platform.posted_texts(), vec!["Hello"]);
    }

    #[tokio::test]
    async fn test_mock_post_failure() {
        let platform = MockPlatform::post_failure("test", "Rate limited");

        let result = platform.post_image(Path::new("x.jpg"), "Hello", "").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Rate limited"));
        assert_eq!(platform.post_calls(), 1);
        assert!(platform.posted_texts().is_empty());
    }

    #[tokio::test]
    async fn test_mock_not_configured() {
        let platform = MockPlatform::not_configured("test");

        assert!(!platform.is_configured());
        assert!(!platform.verify_credentials().await.unwrap());

        let result = platform.post_image(Path::new("x.jpg"), "Hello", "").await;
        assert!(matches!(
            result,
            Err(crate::EaselError::Platform(PlatformError::Unconfigured(_)))
        ));
    }

    #[tokio::test]
    async fn test_mock_invalid_credentials() {
        let platform = MockPlatform::invalid_credentials("test");

        assert!(platform.is_configured());
        assert!(!platform.verify_credentials().await.unwrap());
    }

    #[tokio::test]
    async fn test_mock_shared_state_across_instances() {
        let config = MockConfig::named("shared");
        let first = MockPlatform::new(config.clone());
        let second = MockPlatform::new(config);

        first.post_image(Path::new("x.jpg"), "one", "").await.unwrap();
        second.post_image(Path::new("x.jpg"), "two", "").await.unwrap();

        assert_eq!(first.post_calls(), 2);
        assert_eq!(first.posted_texts(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_mock_fixed_url() {
        let platform = MockPlatform::new(MockConfig {
            post_url: Some("https://example/1".to_string()),
            ..MockConfig::named("fixed")
        });

        let url = platform.post_image(Path::new("x.jpg"), "t", "").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://example/1"));
    }
}
