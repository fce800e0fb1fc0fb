//! Manifest Loader
//!
//! Top-level entry points: locate a root manifest, parse it, and resolve its
//! whole dependency tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::node::LogicManifest;
use super::registry::{ManifestRegistry, ManifestSource};
use super::resolver::{DependencyResolver, ResolveOptions};
use crate::common::{resolve_path, ManifestResult};
use crate::config::LoaderConfig;

/// Locate a root manifest through `registry` and resolve it
///
/// Returns once every reachable dependency has settled.
pub async fn load_manifest(
    registry: &Arc<ManifestRegistry>,
    source: impl Into<ManifestSource>,
    options: ResolveOptions,
) -> ManifestResult<Arc<LogicManifest>> {
    let root = registry.get_instance(source.into()).await?;
    DependencyResolver::new(Arc::clone(registry))
        .resolve_deps(&root, options)
        .await?;
    Ok(root)
}

/// Stateful loader with a private cache
///
/// Each load uses its own registry, so `reload` re-reads every manifest from
/// disk without touching the process-wide registry.
pub struct ManifestLoader {
    config: LoaderConfig,
    manifest_path: PathBuf,
    options: ResolveOptions,
    cache: Option<Arc<LogicManifest>>,
}

impl ManifestLoader {
    /// Loader for `<cwd>/<filename>`
    pub fn new(config: LoaderConfig) -> Self {
        let manifest_path = config.cwd().join(&config.filename);
        Self {
            config,
            manifest_path,
            options: ResolveOptions::ALL,
            cache: None,
        }
    }

    /// Load from an explicit manifest path, relative to the configured cwd
    pub fn with_manifest_path(mut self, path: impl AsRef<Path>) -> Self {
        self.manifest_path = resolve_path(&self.config.cwd(), path);
        self
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn cached(&self) -> Option<Arc<LogicManifest>> {
        self.cache.clone()
    }

    /// Cached root, or a freshly read and resolved one
    pub async fn load(&mut self, force_reload: bool) -> ManifestResult<Arc<LogicManifest>> {
        if !force_reload {
            if let Some(root) = &self.cache {
                return Ok(Arc::clone(root));
            }
        }

        let registry = Arc::new(ManifestRegistry::with_config(self.config.clone()));
        let root = load_manifest(&registry, self.manifest_path.clone(), self.options).await?;
        info!("Loaded manifest tree from {:?}", self.manifest_path);
        self.cache = Some(Arc::clone(&root));
        Ok(root)
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    pub async fn reload(&mut self) -> ManifestResult<Arc<LogicManifest>> {
        self.clear_cache();
        self.load(true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::test_support::{sample_tree, two_module_tree, write_manifest, CountingLoader};
    use serde_json::json;

    fn config_in(cwd: &Path) -> LoaderConfig {
        LoaderConfig {
            cwd: Some(cwd.to_path_buf()),
            ..LoaderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_end_to_end_valid_tree() {
        let tmp = tempfile::tempdir().unwrap();
        sample_tree(tmp.path());
        let registry = Arc::new(ManifestRegistry::with_config(config_in(tmp.path())));

        let root = load_manifest(&registry, ManifestSource::Nearest, ResolveOptions::default())
            .await
            .unwrap();
        assert!(root.validate(), "{:?}", root.validation_errors());
        assert!(Arc::ptr_eq(&registry.default_root().await.unwrap(), &root));

        let loader = CountingLoader::default();
        let exports = root.get_exports_of("sample-b", &loader).await.unwrap();
        assert_eq!(
            exports.downcast_ref::<PathBuf>(),
            Some(&tmp.path().join("modules").join("b").join("controller.js"))
        );
        assert!(root.get_exports_of("db-c", &loader).await.is_ok());
        assert_eq!(loader.calls(), 2);
    }

    #[tokio::test]
    async fn test_end_to_end_version_check() {
        let tmp = tempfile::tempdir().unwrap();
        let root_path = two_module_tree(tmp.path(), "1.0.0");
        let registry = Arc::new(ManifestRegistry::with_config(config_in(tmp.path())));
        let root = load_manifest(&registry, root_path, ResolveOptions::default())
            .await
            .unwrap();
        assert!(root.validate());
        assert!(root.validation_errors().is_empty());

        let tmp = tempfile::tempdir().unwrap();
        two_module_tree(tmp.path(), "2.0.0");
        let registry = Arc::new(ManifestRegistry::with_config(config_in(tmp.path())));
        let root = load_manifest(&registry, tmp.path(), ResolveOptions::default())
            .await
            .unwrap();
        assert!(!root.validate());
        assert_eq!(
            root.validation_errors(),
            vec!["sample-b: sample-b: version 2.0.0 does not match requested 1.0.0"]
        );
    }

    #[tokio::test]
    async fn test_every_edge_checks_shared_version() {
        let tmp = tempfile::tempdir().unwrap();
        let root_path = sample_tree(tmp.path());
        let c_dir = tmp.path().join("node_modules").join("sample-c");
        write_manifest(
            &c_dir,
            &json!({
                "packageName": "sample-c",
                "version": "1.0.0",
                "kind": "module",
                "layer": "ui",
                "entry": "controller.js",
                "uiDeps": {"sample-b": "2.0.0"}
            }),
        );
        let registry = Arc::new(ManifestRegistry::with_config(config_in(tmp.path())));
        let root = load_manifest(&registry, root_path, ResolveOptions::default())
            .await
            .unwrap();

        assert!(!root.validate());
        assert_eq!(
            root.validation_errors(),
            vec!["sample-c: sample-b: sample-b: version 1.0.0 does not match requested 2.0.0"]
        );
    }

    #[tokio::test]
    async fn test_to_json_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        sample_tree(tmp.path());
        let registry = Arc::new(ManifestRegistry::with_config(config_in(tmp.path())));
        let root = load_manifest(&registry, ManifestSource::Nearest, ResolveOptions::default())
            .await
            .unwrap();

        let json = root.to_json();
        assert_eq!(json["packageName"], "sample-root");
        assert_eq!(json["tags"], json!(["shell", "demo"]));
        assert_eq!(json["uiDepsMap"]["sample-c"]["dbDepsMap"]["db-c"]["dbType"], "addon");
        assert_eq!(
            json["uiDepsMap"]["sample-c"]["uiDepsMap"]["sample-b"]["version"],
            "1.0.0"
        );
        assert_eq!(json["dbDepsMap"]["db-a"]["dbType"], "core");
        assert_eq!(
            json["contracts"]["expects"][0],
            json!({"key": "session", "channel": "http", "description": "Active user"})
        );
    }

    #[tokio::test]
    async fn test_loader_cache_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_manifest(tmp.path(), &json!({"packageName": "first"}));
        let mut loader = ManifestLoader::new(config_in(tmp.path()));
        assert_eq!(loader.manifest_path(), path);

        let first = loader.load(false).await.unwrap();
        assert!(Arc::ptr_eq(&first, &loader.load(false).await.unwrap()));

        write_manifest(tmp.path(), &json!({"packageName": "second"}));
        assert_eq!(loader.load(false).await.unwrap().package_name(), Some("first"));

        let reloaded = loader.reload().await.unwrap();
        assert_eq!(reloaded.package_name(), Some("second"));
        assert!(Arc::ptr_eq(&reloaded, &loader.cached().unwrap()));
    }

    #[tokio::test]
    async fn test_loader_explicit_path_and_options() {
        let tmp = tempfile::tempdir().unwrap();
        sample_tree(tmp.path());
        let mut loader = ManifestLoader::new(config_in(tmp.path()))
            .with_manifest_path("logic.json")
            .with_options(ResolveOptions::DB_ONLY);

        let root = loader.load(false).await.unwrap();
        assert!(root.ui_deps_map().is_empty());
        assert_eq!(root.db_deps_map().len(), 1);
    }

    #[tokio::test]
    async fn test_loader_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut loader = ManifestLoader::new(config_in(tmp.path()));
        let err = loader.load(false).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ManifestFileNotFound);
        assert!(loader.cached().is_none());
    }
}
