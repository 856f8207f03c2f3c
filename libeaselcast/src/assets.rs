//! Asset resolution seam between the orchestration core and the content
//! collaborator.
//!
//! The core never assumes how a `content_ref` maps to bytes on disk; it asks
//! a resolver. The default implementation roots relative locators at the
//! configured assets directory.

use std::path::{Path, PathBuf};

pub trait AssetResolver: Send + Sync {
    /// Resolve a content locator to a publishable file. `None` means the
    /// asset does not exist, which callers treat as a per-attempt failure.
    fn resolve(&self, asset_ref: &str) -> Option<PathBuf>;
}

/// Filesystem resolver: absolute locators are taken as-is, relative ones are
/// joined onto the assets root. Either way the file must exist.
pub struct FileAssetResolver {
    root: PathBuf,
}

impl FileAssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetResolver for FileAssetResolver {
    fn resolve(&self, asset_ref: &str) -> Option<PathBuf> {
        if asset_ref.is_empty() {
            return None;
        }

        let direct = Path::new(asset_ref);
        if direct.is_absolute() {
            return direct.is_file().then(|| direct.to_path_buf());
        }

        let joined = self.root.join(asset_ref);
        joined.is_file().then_some(joined)
    }
}
