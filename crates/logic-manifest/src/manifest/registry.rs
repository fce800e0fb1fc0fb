//! Manifest Registry
//!
//! Memoizes file-backed manifest nodes by resolved path and by package name,
//! so every lookup of the same `logic.json` yields the same node.

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::context::ManifestContext;
use super::node::LogicManifest;
use crate::common::{resolve_path, ErrorCode, ManifestError, ManifestResult};
use crate::config::LoaderConfig;

static GLOBAL: Lazy<Arc<ManifestRegistry>> = Lazy::new(|| Arc::new(ManifestRegistry::new()));

/// Where to look for a root manifest
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ManifestSource {
    /// Nearest ancestor of the configured cwd containing the manifest filename
    #[default]
    Nearest,
    /// Explicit manifest file, or a directory holding one
    Path(PathBuf),
}

impl From<PathBuf> for ManifestSource {
    fn from(path: PathBuf) -> Self {
        ManifestSource::Path(path)
    }
}

impl From<&Path> for ManifestSource {
    fn from(path: &Path) -> Self {
        ManifestSource::Path(path.to_path_buf())
    }
}

impl From<Option<PathBuf>> for ManifestSource {
    fn from(path: Option<PathBuf>) -> Self {
        path.map_or(ManifestSource::Nearest, ManifestSource::Path)
    }
}

/// Process-scoped manifest cache
pub struct ManifestRegistry {
    config: LoaderConfig,
    /// File-backed nodes, indexed by absolute manifest path
    by_path: RwLock<HashMap<PathBuf, Arc<LogicManifest>>>,
    /// First node registered for each package name
    by_package: RwLock<HashMap<String, Arc<LogicManifest>>>,
    default_root: RwLock<Option<Arc<LogicManifest>>>,
}

impl ManifestRegistry {
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    pub fn with_config(config: LoaderConfig) -> Self {
        Self {
            config,
            by_path: RwLock::new(HashMap::new()),
            by_package: RwLock::new(HashMap::new()),
            default_root: RwLock::new(None),
        }
    }

    /// Shared process-wide registry with default configuration
    pub fn global() -> Arc<ManifestRegistry> {
        Arc::clone(&GLOBAL)
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Turn a source into an absolute manifest path
    pub async fn locate(&self, source: &ManifestSource) -> ManifestResult<PathBuf> {
        let cwd = self.config.cwd();
        match source {
            ManifestSource::Path(path) => {
                let path = resolve_path(&cwd, path);
                let is_dir = tokio::fs::metadata(&path)
                    .await
                    .map(|m| m.is_dir())
                    .unwrap_or(false);
                if is_dir {
                    Ok(path.join(&self.config.filename))
                } else {
                    Ok(path)
                }
            }
            ManifestSource::Nearest => {
                for dir in cwd.ancestors() {
                    let candidate = dir.join(&self.config.filename);
                    if tokio::fs::metadata(&candidate).await.is_ok() {
                        return Ok(candidate);
                    }
                }
                Err(ManifestError::new(
                    ErrorCode::ManifestNotFound,
                    format!(
                        "No {} found in {} or any parent directory",
                        self.config.filename,
                        cwd.display()
                    ),
                ))
            }
        }
    }

    /// Cached node for `source`, reading and registering it on first use
    ///
    /// The first node loaded through an empty registry becomes the default root.
    pub async fn get_instance(&self, source: ManifestSource) -> ManifestResult<Arc<LogicManifest>> {
        let manifest_path = self.locate(&source).await?;
        if let Some(node) = self.get_by_path(&manifest_path).await {
            debug!("Manifest cache hit: {:?}", manifest_path);
            return Ok(node);
        }

        if tokio::fs::metadata(&manifest_path).await.is_err() {
            return Err(ManifestError::new(
                ErrorCode::ManifestFileNotFound,
                format!("Manifest file not found: {}", manifest_path.display()),
            ));
        }

        let raw = read_json(&manifest_path).await.map_err(|e| {
            ManifestError::new(
                ErrorCode::ManifestFileReadFailed,
                format!("Failed to read manifest {}", manifest_path.display()),
            )
            .with_cause(e)
        })?;

        let node = LogicManifest::from_value(&raw, ManifestContext::root(manifest_path))?;
        let node = self.register(Arc::new(node)).await;

        let mut root = self.default_root.write().await;
        if root.is_none() {
            *root = Some(Arc::clone(&node));
        }
        Ok(node)
    }

    /// Cached node for a ui dependency manifest, reading it on first use
    pub(crate) async fn load_dependency(
        &self,
        package_name: &str,
        manifest_path: &Path,
        context: ManifestContext,
    ) -> ManifestResult<Arc<LogicManifest>> {
        if let Some(node) = self.get_by_path(manifest_path).await {
            debug!("Dependency {} reused from {:?}", package_name, manifest_path);
            return Ok(node);
        }

        let raw = read_json(manifest_path).await.map_err(|e| {
            ManifestError::new(
                ErrorCode::DependencyManifestNotFound,
                format!(
                    "Failed to load dependency manifest for {} at {}",
                    package_name,
                    manifest_path.display()
                ),
            )
            .with_cause(e)
        })?;

        let node = LogicManifest::from_value(&raw, context)?;
        Ok(self.register(Arc::new(node)).await)
    }

    /// Index a node; an already registered node for the same path wins
    pub async fn register(&self, node: Arc<LogicManifest>) -> Arc<LogicManifest> {
        let node = {
            let mut by_path = self.by_path.write().await;
            Arc::clone(
                by_path
                    .entry(node.manifest_path().to_path_buf())
                    .or_insert(node),
            )
        };

        if let Some(name) = node.package_name() {
            let mut by_package = self.by_package.write().await;
            by_package
                .entry(name.to_string())
                .or_insert_with(|| Arc::clone(&node));
        }

        info!(
            "Registered manifest: {} ({:?})",
            node.package_name().unwrap_or("<anonymous>"),
            node.manifest_path()
        );
        node
    }

    pub async fn get_by_path(&self, manifest_path: &Path) -> Option<Arc<LogicManifest>> {
        self.by_path.read().await.get(manifest_path).cloned()
    }

    pub async fn get_by_package(&self, package_name: &str) -> Option<Arc<LogicManifest>> {
        self.by_package.read().await.get(package_name).cloned()
    }

    /// First root manifest loaded through this registry
    pub async fn default_root(&self) -> Option<Arc<LogicManifest>> {
        self.default_root.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.by_path.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every cached node and the default root
    pub async fn reset(&self) {
        self.by_path.write().await.clear();
        self.by_package.write().await.clear();
        *self.default_root.write().await = None;
        debug!("Manifest registry reset");
    }
}

impl Default for ManifestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_json(path: &Path) -> Result<Value, crate::common::BoxError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}
