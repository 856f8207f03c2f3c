//! Destination abstraction and adapter implementations
//!
//! One trait fronts every publishing destination, whatever it speaks under
//! the hood: bearer-token REST (Mastodon, Pixelfed), OAuth 1.0a signed REST
//! (Flickr), or a browser session driven by an external automation command
//! (Cara). The orchestration core never branches on the protocol family.
//!
//! # Examples
//!
//! ```no_run
//! use libeaselcast::platforms::Platform;
//! use std::path::Path;
//!
//! # async fn example(destination: Box<dyn Platform>) -> libeaselcast::Result<()> {
//! if !destination.is_configured() {
//!     eprintln!("{} is not configured", destination.display_name());
//!     return Ok(());
//! }
//!
//! if destination.verify_credentials().await? {
//!     let url = destination
//!         .post_image(Path::new("canal.jpg"), "Canal at Dusk", "A quiet canal")
//!         .await?;
//!     if let Some(url) = url {
//!         println!("posted: {}", url);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use async_trait::async_trait;

use crate::error::{PlatformError, Result};

pub mod cara;
pub mod flickr;
pub mod mastodon;

// Mock destination is available for all builds (not just tests) to support
// integration tests
pub mod mock;

/// Capability contract every destination adapter satisfies.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Lowercase registry name, e.g. "mastodon".
    fn name(&self) -> &str;

    /// Human-facing name, e.g. "Mastodon".
    fn display_name(&self) -> &str;

    fn supports_images(&self) -> bool {
        true
    }

    fn supports_video(&self) -> bool {
        false
    }

    /// Maximum post text length the destination accepts.
    fn max_text_length(&self) -> usize {
        500
    }

    /// Whether the required credentials / session state are present.
    ///
    /// Pure check: any file reading happens when the adapter is constructed,
    /// never here.
    fn is_configured(&self) -> bool;

    /// Live, idempotent credential check against the destination (a
    /// "who am I" call). `Ok(false)` means the destination answered and
    /// rejected the credentials; errors are surfaced verbatim.
    async fn verify_credentials(&self) -> Result<bool>;

    /// Publish an image post. Returns the resulting post URL when the
    /// destination reports one.
    async fn post_image(&self, image: &Path, text: &str, alt_text: &str)
        -> Result<Option<String>>;

    /// Publish a video post. Destinations without video support return a
    /// distinguishable `Unsupported` failure rather than a no-op success.
    async fn post_video(&self, _video: &Path, _text: &str) -> Result<Option<String>> {
        Err(PlatformError::Unsupported(format!(
            "{} does not support video posts",
            self.display_name()
        ))
        .into())
    }
}
