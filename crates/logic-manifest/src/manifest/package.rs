//! Package Root Resolver
//!
//! Finds the installation root of a ui dependency. The consuming node's
//! `package.json` is consulted first; bare specifiers fall back to searching
//! installed packages up the ancestor chain.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::node::LogicManifest;
use crate::common::{resolve_path, ManifestError, ManifestResult};
use crate::config::LoaderConfig;

/// Package-registry sections searched in priority order
pub const DEPENDENCY_SECTIONS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "optionalDependencies",
    "peerDependencies",
];

#[derive(Debug, Clone)]
pub struct PackageRootResolver {
    package_file: String,
    modules_dir: String,
}

impl PackageRootResolver {
    pub fn new(config: &LoaderConfig) -> Self {
        Self {
            package_file: config.package_file.clone(),
            modules_dir: config.modules_dir.clone(),
        }
    }

    /// Absolute root directory of `package_name` as seen from `node`
    pub async fn resolve(
        &self,
        node: &LogicManifest,
        package_name: &str,
    ) -> ManifestResult<PathBuf> {
        let base_dir = node.base_dir();

        if let Some(spec) = self.dependency_spec(node, package_name).await {
            if let Some(target) = strip_link_protocol(&spec) {
                return Ok(resolve_path(base_dir, target));
            }
            if spec.starts_with('.') || Path::new(&spec).is_absolute() {
                return Ok(resolve_path(base_dir, &spec));
            }
        }

        match self.search_installed(base_dir, package_name).await {
            Some(root) => Ok(root),
            None => Err(ManifestError::dependency_resolve_failed(package_name)),
        }
    }

    /// Specifier declared for `package_name`, first section wins
    pub async fn dependency_spec(
        &self,
        node: &LogicManifest,
        package_name: &str,
    ) -> Option<String> {
        let package_json = self.package_json(node).await?;
        let spec = DEPENDENCY_SECTIONS.iter().find_map(|section| {
            package_json
                .get(section)
                .and_then(|deps| deps.get(package_name))
        })?;
        debug!(package = package_name, spec = %spec, "Found package spec");
        spec.as_str().map(str::to_string)
    }

    /// Parsed package file next to the node's manifest, read once per node
    async fn package_json<'n>(&self, node: &'n LogicManifest) -> Option<&'n Value> {
        node.package_json
            .get_or_init(|| async {
                let path = node.base_dir().join(&self.package_file);
                let content = match tokio::fs::read_to_string(&path).await {
                    Ok(content) => content,
                    Err(e) => {
                        debug!("No package file at {:?}: {}", path, e);
                        return None;
                    }
                };
                match serde_json::from_str::<Value>(&content) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!("Failed to parse package file {:?}: {}", path, e);
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    /// Host package search: `<ancestor>/<modules dir>/<name>/<package file>`
    async fn search_installed(&self, base_dir: &Path, package_name: &str) -> Option<PathBuf> {
        for dir in base_dir.ancestors() {
            let candidate = dir.join(&self.modules_dir).join(package_name);
            if tokio::fs::metadata(candidate.join(&self.package_file))
                .await
                .is_ok()
            {
                debug!("Resolved {} from installed packages at {:?}", package_name, candidate);
                return Some(candidate);
            }
        }
        None
    }
}

fn strip_link_protocol(spec: &str) -> Option<&str> {
    spec.strip_prefix("file:")
        .or_else(|| spec.strip_prefix("link:"))
}
