//! Mastodon-API destination adapter (bearer-token REST)
//!
//! Two-step publish: upload the media file, then create a status that
//! references it. Pixelfed exposes the same client API, so the registry
//! instantiates this adapter for both destinations with their own config
//! sections.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::{expand_path, MastodonConfig};
use crate::error::{PlatformError, Result};
use crate::platforms::Platform;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MastodonPlatform {
    name: String,
    display_name: String,
    instance_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl MastodonPlatform {
    /// Build an adapter from an optional config section. A missing or
    /// disabled section yields an unconfigured adapter, never an error;
    /// the token file is read here so `is_configured` stays pure.
    pub fn from_config(name: &str, display_name: &str, config: Option<&MastodonConfig>) -> Self {
        let (instance_url, token) = match config {
            Some(cfg) if cfg.enabled => {
                let token = std::fs::read_to_string(expand_path(&cfg.token_file))
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
                (normalize_instance_url(&cfg.instance), token)
            }
            _ => (String::new(), None),
        };

        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            instance_url,
            token,
            client: reqwest::Client::new(),
        }
    }

    fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            PlatformError::Unconfigured(format!("{} not configured", self.display_name)).into()
        })
    }

    /// A rejected token means the credentials are the problem, not the post.
    fn http_error(&self, operation: &str, status: reqwest::StatusCode, body: &str) -> PlatformError {
        let detail = format!(
            "{} {} failed: HTTP {}: {}",
            self.display_name, operation, status, body
        );
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            PlatformError::Authentication(detail)
        } else {
            PlatformError::Posting(detail)
        }
    }

    async fn upload_media(&self, path: &Path, description: &str) -> Result<String> {
        let token = self.token()?;

        let bytes = std::fs::read(path).map_err(|e| {
            PlatformError::Validation(format!("Failed to read asset {}: {}", path.display(), e))
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.essence_str())
            .map_err(|e| PlatformError::Posting(format!("Invalid media type: {}", e)))?;

        let mut form = reqwest::multipart::Form::new().part("file", part);
        if !description.is_empty() {
            form = form.text("description", description.to_string());
        }

        let response = self
            .client
            .post(format!("{}/api/v1/media", self.instance_url))
            .bearer_auth(token)
            .multipart(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("{}: {}", self.display_name, e)))?;

        let status = response.status();
        let body: serde_json::Value = if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| PlatformError::Posting(format!("Invalid media response: {}", e)))?
        } else {
            let text = response.text().await.unwrap_or_default();
            return Err(self.http_error("media upload", status, &text).into());
        };

        body["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                PlatformError::Posting(format!(
                    "{} media upload returned no media id",
                    self.display_name
                ))
                .into()
            })
    }

    async fn create_status(&self, text: &str, media_id: &str) -> Result<Option<String>> {
        let token = self.token()?;

        let response = self
            .client
            .post(format!("{}/api/v1/statuses", self.instance_url))
            .bearer_auth(token)
            .form(&[("status", text), ("media_ids[]", media_id)])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("{}: {}", self.display_name, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.http_error("status creation", status, &text).into());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Posting(format!("Invalid status response: {}", e)))?;

        Ok(body["url"]
            .as_str()
            .or_else(|| body["uri"].as_str())
            .map(|s| s.to_string()))
    }
}

#[async_trait]
impl Platform for MastodonPlatform {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn supports_video(&self) -> bool {
        true
    }

    fn max_text_length(&self) -> usize {
        500
    }

    fn is_configured(&self) -> bool {
        !self.instance_url.is_empty() && self.token.is_some()
    }

    async fn verify_credentials(&self) -> Result<bool> {
        if !self.is_configured() {
            return Ok(false);
        }
        let token = self.token()?;

        let response = self
            .client
            .get(format!(
                "{}/api/v1/accounts/verify_credentials",
                self.instance_url
            ))
            .bearer_auth(token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("{}: {}", self.display_name, e)))?;

        debug!(destination = %self.name, status = %response.status(), "credential check");
        Ok(response.status().is_success())
    }

    async fn post_image(&self, image: &Path, text: &str, alt_text: &str) -> Result<Option<String>> {
        let media_id = self.upload_media(image, alt_text).await?;
        self.create_status(text, &media_id).await
    }

    async fn post_video(&self, video: &Path, text: &str) -> Result<Option<String>> {
        let media_id = self.upload_media(video, "").await?;
        self.create_status(text, &media_id).await
    }
}

fn normalize_instance_url(instance: &str) -> String {
    let trimmed = instance.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.is_empty() {
        String::new()
    } else {
        format!("https://{}", trimmed)
    }
}
