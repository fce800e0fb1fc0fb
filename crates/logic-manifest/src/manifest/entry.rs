//! Entry Loader
//!
//! Resolves a node's implementation entry to an absolute path and hands it to
//! the host's code loader. Both the path and the loaded exports are cached on
//! the node, so the host loader runs at most once per node.

use async_trait::async_trait;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::node::LogicManifest;
use crate::common::{BoxError, ErrorCode, ManifestError, ManifestResult};

/// Opaque handle returned by a [`CodeLoader`]
pub type Exports = Arc<dyn Any + Send + Sync>;

/// Host capability that turns an entry path into loaded code
#[async_trait]
pub trait CodeLoader: Send + Sync {
    async fn load_code(&self, path: &Path) -> Result<Exports, BoxError>;
}

/// Loads entries as native shared libraries
///
/// The exports handle is the [`libloading::Library`]; downcast it to look up
/// symbols. Loaded libraries stay mapped as long as the handle is cached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryLoader;

#[async_trait]
impl CodeLoader for LibraryLoader {
    async fn load_code(&self, path: &Path) -> Result<Exports, BoxError> {
        let path = path.to_path_buf();
        let library = tokio::task::spawn_blocking(move || {
            // SAFETY: running the library's initializers is the point of
            // loading an entry; loaded code is trusted by the host.
            unsafe { libloading::Library::new(&path) }
        })
        .await??;
        Ok(Arc::new(library))
    }
}

impl LogicManifest {
    /// Absolute, accessible path of this node's entry
    pub async fn load_entry(&self) -> ManifestResult<PathBuf> {
        let entry = self
            .entry()
            .ok_or_else(|| ManifestError::entry_not_declared(self.package_name()))?;

        self.entry_path
            .get_or_try_init(|| async {
                let entry = Path::new(entry);
                let absolute = if entry.is_absolute() {
                    entry.to_path_buf()
                } else {
                    self.base_dir().join(entry)
                };
                tokio::fs::metadata(&absolute).await.map_err(|e| {
                    ManifestError::new(
                        ErrorCode::EntryNotFound,
                        format!(
                            "Unable to resolve manifest implementation for {} at {}",
                            self.package_name().unwrap_or("<anonymous>"),
                            absolute.display()
                        ),
                    )
                    .with_cause(e)
                })?;
                debug!("Resolved entry {:?}", absolute);
                Ok::<_, ManifestError>(absolute)
            })
            .await
            .cloned()
    }

    /// Load this node's code once and return the cached exports
    pub async fn get_exports(&self, loader: &dyn CodeLoader) -> ManifestResult<Exports> {
        if self.entry().is_none() {
            return Err(ManifestError::entry_not_declared(self.package_name()));
        }

        self.exports
            .get_or_try_init(|| async {
                let path = self.load_entry().await?;
                let exports = loader.load_code(&path).await.map_err(|e| {
                    ManifestError::new(
                        ErrorCode::EntryLoadFailed,
                        format!("Failed to load entry {}", path.display()),
                    )
                    .with_cause(e)
                })?;
                info!(
                    "Loaded entry for {} from {:?}",
                    self.package_name().unwrap_or("<anonymous>"),
                    path
                );
                Ok::<_, ManifestError>(exports)
            })
            .await
            .cloned()
    }

    /// Exports of the resolved node named `package_name`
    pub async fn get_exports_of(
        self: &Arc<Self>,
        package_name: &str,
        loader: &dyn CodeLoader,
    ) -> ManifestResult<Exports> {
        let target = self
            .find_manifest(package_name)
            .ok_or_else(|| ManifestError::manifest_not_found(package_name))?;
        target.get_exports(loader).await
    }
}
