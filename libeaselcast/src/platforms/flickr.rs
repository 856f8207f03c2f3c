//! Flickr destination adapter (OAuth 1.0a signed REST)
//!
//! Flickr's API predates bearer tokens: every request carries an HMAC-SHA1
//! signature over the sorted request parameters. Uploads go to a dedicated
//! endpoint that answers in XML.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use regex::Regex;
use sha1::Sha1;

use crate::config::{expand_path, FlickrConfig};
use crate::error::{PlatformError, Result};
use crate::platforms::Platform;

const UPLOAD_URL: &str = "https://up.flickr.com/services/upload/";
const REST_URL: &str = "https://www.flickr.com/services/rest/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

type HmacSha1 = Hmac<Sha1>;

static PHOTOID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<photoid[^>]*>([0-9]+)</photoid>").unwrap());
static ERR_MSG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"msg="([^"]+)""#).unwrap());

pub struct FlickrPlatform {
    api_key: Option<String>,
    api_secret: Option<String>,
    oauth_token: Option<String>,
    oauth_token_secret: Option<String>,
    user_id: Option<String>,
    client: reqwest::Client,
}

impl FlickrPlatform {
    /// Build an adapter from an optional config section. The token file
    /// (OAuth token on line one, token secret on line two) is read here so
    /// `is_configured` stays pure.
    pub fn from_config(config: Option<&FlickrConfig>) -> Self {
        let mut platform = Self {
            api_key: None,
            api_secret: None,
            oauth_token: None,
            oauth_token_secret: None,
            user_id: None,
            client: reqwest::Client::new(),
        };

        let Some(cfg) = config.filter(|c| c.enabled) else {
            return platform;
        };

        platform.api_key = non_empty(&cfg.api_key);
        platform.api_secret = non_empty(&cfg.api_secret);
        platform.user_id = cfg.user_id.clone();

        if let Ok(content) = std::fs::read_to_string(expand_path(&cfg.token_file)) {
            let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
            platform.oauth_token = lines.next().map(str::to_string);
            platform.oauth_token_secret = lines.next().map(str::to_string);
        }

        platform
    }

    fn oauth_params(&self, api_key: &str, oauth_token: &str) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("oauth_consumer_key".to_string(), api_key.to_string());
        params.insert(
            "oauth_nonce".to_string(),
            uuid::Uuid::new_v4().simple().to_string(),
        );
        params.insert(
            "oauth_signature_method".to_string(),
            "HMAC-SHA1".to_string(),
        );
        params.insert(
            "oauth_timestamp".to_string(),
            chrono::Utc::now().timestamp().to_string(),
        );
        params.insert("oauth_token".to_string(), oauth_token.to_string());
        params.insert("oauth_version".to_string(), "1.0".to_string());
        params
    }

    /// HMAC-SHA1 signature over the canonical OAuth 1.0a base string.
    fn sign(&self, method: &str, url: &str, params: &BTreeMap<String, String>) -> Result<String> {
        let api_secret = self.api_secret.as_deref().unwrap_or("");
        let token_secret = self.oauth_token_secret.as_deref().unwrap_or("");

        let param_string = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let base = format!(
            "{}&{}&{}",
            method,
            urlencoding::encode(url),
            urlencoding::encode(&param_string)
        );
        let key = format!(
            "{}&{}",
            urlencoding::encode(api_secret),
            urlencoding::encode(token_secret)
        );

        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| PlatformError::Posting(format!("Failed to build signature: {}", e)))?;
        mac.update(base.as_bytes());

        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.api_key.as_deref(), self.oauth_token.as_deref()) {
            (Some(key), Some(token)) if self.is_configured() => Ok((key, token)),
            _ => Err(PlatformError::Unconfigured("Flickr not configured".to_string()).into()),
        }
    }

    /// Signed GET against the JSON REST endpoint.
    async fn call_api(&self, method: &str) -> Result<serde_json::Value> {
        let (api_key, oauth_token) = self.credentials()?;

        let mut params = self.oauth_params(api_key, oauth_token);
        params.insert("method".to_string(), method.to_string());
        params.insert("format".to_string(), "json".to_string());
        params.insert("nojsoncallback".to_string(), "1".to_string());

        let signature = self.sign("GET", REST_URL, &params)?;
        params.insert("oauth_signature".to_string(), signature);

        let query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let response = self
            .client
            .get(REST_URL)
            .query(&query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("Flickr: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection_error("Flickr API call failed", status, &body).into());
        }

        response
            .json()
            .await
            .map_err(|e| PlatformError::Posting(format!("Invalid Flickr response: {}", e)).into())
    }

    /// Signed multipart upload. Returns the new photo id.
    async fn upload_photo(&self, photo: &Path, title: &str, description: &str) -> Result<String> {
        let (api_key, oauth_token) = self.credentials()?;

        let mut params = self.oauth_params(api_key, oauth_token);
        params.insert("title".to_string(), title.to_string());
        params.insert("description".to_string(), description.to_string());

        let signature = self.sign("POST", UPLOAD_URL, &params)?;
        params.insert("oauth_signature".to_string(), signature);

        let bytes = std::fs::read(photo).map_err(|e| {
            PlatformError::Validation(format!("Failed to read asset {}: {}", photo.display(), e))
        })?;
        let file_name = photo
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "photo.jpg".to_string());
        let mime = mime_guess::from_path(photo).first_or_octet_stream();

        let mut form = reqwest::multipart::Form::new();
        for (key, value) in params {
            form = form.text(key, value);
        }
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.essence_str())
            .map_err(|e| PlatformError::Posting(format!("Invalid media type: {}", e)))?;
        form = form.part("photo", part);

        let response = self
            .client
            .post(UPLOAD_URL)
            .multipart(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("Flickr: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(rejection_error("Flickr upload failed", status, &body).into());
        }

        parse_upload_response(&body)
    }

    fn photo_url(&self, photo_id: &str) -> Option<String> {
        self.user_id
            .as_ref()
            .map(|nsid| format!("https://www.flickr.com/photos/{}/{}", nsid, photo_id))
    }
}

#[async_trait]
impl Platform for FlickrPlatform {
    fn name(&self) -> &str {
        "flickr"
    }

    fn display_name(&self) -> &str {
        "Flickr"
    }

    fn max_text_length(&self) -> usize {
        // Flickr description limit
        63_206
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
            && self.api_secret.is_some()
            && self.oauth_token.is_some()
            && self.oauth_token_secret.is_some()
    }

    async fn verify_credentials(&self) -> Result<bool> {
        if !self.is_configured() {
            return Ok(false);
        }

        let data = self.call_api("flickr.test.login").await?;
        Ok(data["stat"].as_str() == Some("ok"))
    }

    /// Uploads the image as a Flickr photo: alt text becomes the photo
    /// title, the formatted post text becomes the description.
    async fn post_image(&self, image: &Path, text: &str, alt_text: &str) -> Result<Option<String>> {
        let title = if alt_text.is_empty() {
            image
                .file_stem()
                .map(|s| s.to_string_lossy().replace('_', " "))
                .unwrap_or_else(|| "Untitled".to_string())
        } else {
            alt_text.to_string()
        };

        let photo_id = self.upload_photo(image, &title, text).await?;
        Ok(self.photo_url(&photo_id))
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// 401/403 means the signature or token was rejected; anything else is a
/// plain request failure.
fn rejection_error(context: &str, status: reqwest::StatusCode, body: &str) -> PlatformError {
    let detail = format!("{}: HTTP {}: {}", context, status, body);
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        PlatformError::Authentication(detail)
    } else {
        PlatformError::Posting(detail)
    }
}

fn parse_upload_response(body: &str) -> Result<String> {
    if let Some(captures) = PHOTOID_RE.captures(body) {
        return Ok(captures[1].to_string());
    }

    let message = ERR_MSG_RE
        .captures(body)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "upload succeeded but no photo id returned".to_string());

    Err(PlatformError::Posting(format!("Flickr upload failed: {}", message)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir, token_lines: &str) -> FlickrConfig {
        let token_path = dir.path().join("flickr.token");
        std::fs::write(&token_path, token_lines).unwrap();
        FlickrConfig {
            enabled: true,
            api_key: "key123".to_string(),
            api_secret: "secret456".to_string(),
            token_file: token_path.to_string_lossy().to_string(),
            user_id: Some("12345678@N00".to_string()),
        }
    }

    #[test]
    fn test_from_config_reads_token_pair() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "tok-abc\ntok-secret\n");
        let platform = FlickrPlatform::from_config(Some(&cfg));

        assert!(platform.is_configured());
        assert_eq!(platform.oauth_token.as_deref(), Some("tok-abc"));
        assert_eq!(platform.oauth_token_secret.as_deref(), Some("tok-secret"));
    }

    #[test]
    fn test_from_config_incomplete_token_file() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "only-one-line\n");
        let platform = FlickrPlatform::from_config(Some(&cfg));
        assert!(!platform.is_configured());
    }

    #[test]
    fn test_from_config_absent_section() {
        let platform = FlickrPlatform::from_config(None);
        assert!(!platform.is_configured());
        assert_eq!(platform.name(), "flickr");
        assert!(!platform.supports_video());
    }

    #[test]
    fn test_signature_is_deterministic_for_fixed_params() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "tok\nsec\n");
        let platform = FlickrPlatform::from_config(Some(&cfg));

        let mut params = BTreeMap::new();
        params.insert("oauth_consumer_key".to_string(), "key123".to_string());
        params.insert("oauth_token".to_string(), "tok".to_string());
        params.insert("method".to_string(), "flickr.test.login".to_string());

        let first = platform.sign("GET", REST_URL, &params).unwrap();
        let second = platform.sign("GET", REST_URL, &params).unwrap();
        assert_eq!(first, second);
        // base64 of a SHA-1 HMAC is always 28 characters
        assert_eq!(first.len(), 28);
    }

    #[test]
    fn test_signature_changes_with_params() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "tok\nsec\n");
        let platform = FlickrPlatform::from_config(Some(&cfg));

        let mut params = BTreeMap::new();
        params.insert("a".to_string(), "1".to_string());
        let first = platform.sign("GET", REST_URL, &params).unwrap();

        params.insert("a".to_string(), "2".to_string());
        let second = platform.sign("GET", REST_URL, &params).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_parse_upload_response_ok() {
        let body = r#"<?xml version="1.0" encoding="utf-8" ?>
<rsp stat="ok"><photoid>54321098765</photoid></rsp>"#;
        assert_eq!(parse_upload_response(body).unwrap(), "54321098765");
    }

    #[test]
    fn test_parse_upload_response_error() {
        let body = r#"<?xml version="1.0" encoding="utf-8" ?>
<rsp stat="fail"><err code="5" msg="Filetype was not recognised" /></rsp>"#;
        let err = parse_upload_response(body).unwrap_err();
        assert!(err.to_string().contains("Filetype was not recognised"));
    }

    #[test]
    fn test_photo_url_requires_user_id() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir, "tok\nsec\n");
        cfg.user_id = None;
        let platform = FlickrPlatform::from_config(Some(&cfg));
        assert_eq!(platform.photo_url("1"), None);

        cfg.user_id = Some("12345678@N00".to_string());
        let platform = FlickrPlatform::from_config(Some(&cfg));
        assert_eq!(
            platform.photo_url("1").as_deref(),
            Some("https://www.flickr.com/photos/12345678@N00/1")
        );
    }

    #[test]
    fn test_rejection_error_maps_rejected_signature() {
        let unauthorized = rejection_error(
            "Flickr API call failed",
            reqwest::StatusCode::UNAUTHORIZED,
            "oauth_problem=token_rejected",
        );
        assert!(matches!(unauthorized, PlatformError::Authentication(_)));
        assert!(unauthorized.to_string().contains("token_rejected"));

        let server_error = rejection_error(
            "Flickr upload failed",
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "oops",
        );
        assert!(matches!(server_error, PlatformError::Posting(_)));
    }

    #[tokio::test]
    async fn test_verify_credentials_unconfigured_is_false() {
        let platform = FlickrPlatform::from_config(None);
        assert!(!platform.verify_credentials().await.unwrap());
    }
}
