//! Dependency Resolution Engine
//!
//! Populates the ui and db child collections of a node and walks the tree
//! below it. Sibling dependencies are loaded concurrently and the call settles
//! only once the whole reachable subtree has been resolved.

use futures::future::{try_join_all, BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{debug, info};

use super::context::ManifestContext;
use super::node::{DependencyMap, LogicManifest};
use super::package::PackageRootResolver;
use super::registry::ManifestRegistry;
use super::types::EdgeKind;
use crate::common::{ErrorCode, ManifestError, ManifestResult};

/// Which edge kinds a resolution pass should populate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub include_ui: bool,
    pub include_db: bool,
}

impl ResolveOptions {
    pub const ALL: ResolveOptions = ResolveOptions {
        include_ui: true,
        include_db: true,
    };
    pub const UI_ONLY: ResolveOptions = ResolveOptions {
        include_ui: true,
        include_db: false,
    };
    pub const DB_ONLY: ResolveOptions = ResolveOptions {
        include_ui: false,
        include_db: true,
    };

    fn includes(&self, edge: EdgeKind) -> bool {
        match edge {
            EdgeKind::Ui => self.include_ui,
            EdgeKind::Db => self.include_db,
        }
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::ALL
    }
}

pub struct DependencyResolver {
    registry: Arc<ManifestRegistry>,
    packages: PackageRootResolver,
}

impl DependencyResolver {
    pub fn new(registry: Arc<ManifestRegistry>) -> Self {
        let packages = PackageRootResolver::new(registry.config());
        Self { registry, packages }
    }

    pub fn registry(&self) -> &Arc<ManifestRegistry> {
        &self.registry
    }

    /// Resolve the requested edge kinds of `node` and everything below it
    ///
    /// Each edge kind is built at most once per node; repeated calls only
    /// descend into children to pick up edge kinds not yet requested there.
    pub async fn resolve_deps(
        &self,
        node: &Arc<LogicManifest>,
        options: ResolveOptions,
    ) -> ManifestResult<()> {
        self.resolve_node(Arc::clone(node), options, Vec::new()).await?;
        info!(
            "Resolved dependencies of {} (ui: {}, db: {})",
            node.package_name().unwrap_or("<anonymous>"),
            node.ui_deps_map().len(),
            node.db_deps_map().len()
        );
        Ok(())
    }

    fn resolve_node(
        &self,
        node: Arc<LogicManifest>,
        options: ResolveOptions,
        mut path: Vec<Arc<LogicManifest>>,
    ) -> BoxFuture<'_, ManifestResult<()>> {
        async move {
            for edge in [EdgeKind::Ui, EdgeKind::Db] {
                if !options.includes(edge) {
                    continue;
                }
                if !node.begin_resolve(edge) {
                    debug!(
                        "Skipping {} deps of {}: {:?}",
                        edge.as_str(),
                        node.context().lineage_label(),
                        node.resolve_status(edge)
                    );
                    continue;
                }
                let built = match edge {
                    EdgeKind::Ui => self.build_ui_children(&node).await,
                    EdgeKind::Db => build_db_children(&node),
                };
                match built {
                    Ok(children) => node.finish_resolve(edge, children),
                    Err(e) => {
                        node.abort_resolve(edge);
                        return Err(e);
                    }
                }
            }

            path.push(Arc::clone(&node));
            let pending = node
                .children()
                .into_iter()
                // Package cycles lead back to a node on the current path
                .filter(|child| !path.iter().any(|seen| Arc::ptr_eq(seen, child)))
                .map(|child| self.resolve_node(child, options, path.clone()))
                .collect::<Vec<_>>();
            try_join_all(pending).await?;
            Ok(())
        }
        .boxed()
    }

    async fn build_ui_children(&self, node: &Arc<LogicManifest>) -> ManifestResult<DependencyMap> {
        let specs = &node.definition().ui_deps;
        try_join_all(
            specs
                .iter()
                .map(|(name, requested)| self.load_ui_child(node, name, requested)),
        )
        .await
    }

    async fn load_ui_child(
        &self,
        node: &Arc<LogicManifest>,
        package_name: &str,
        requested_version: &str,
    ) -> ManifestResult<(String, Arc<LogicManifest>)> {
        let package_root = self.packages.resolve(node, package_name).await?;
        let manifest_path = package_root.join(&self.registry.config().filename);
        let context = ManifestContext::ui_child(
            node,
            package_name,
            package_root,
            manifest_path.clone(),
            requested_version,
        );
        let child = self
            .registry
            .load_dependency(package_name, &manifest_path, context)
            .await?;
        Ok((package_name.to_string(), child))
    }
}

fn build_db_children(node: &Arc<LogicManifest>) -> ManifestResult<DependencyMap> {
    node.definition()
        .db_deps
        .iter()
        .map(|(key, raw)| {
            check_db_cycle(node, key)?;
            let child = LogicManifest::from_value(raw, ManifestContext::db_child(node, key))?;
            Ok((key.clone(), Arc::new(child)))
        })
        .collect()
}

/// Fail when `key` already appears in the run of inline db edges leading here
///
/// Inline definitions come from finite JSON and always terminate; this rule is
/// conservative and also rejects a nested definition that merely reuses a key.
fn check_db_cycle(node: &LogicManifest, key: &str) -> ManifestResult<()> {
    let repeated = node
        .lineage()
        .iter()
        .rev()
        .take_while(|segment| segment.edge == EdgeKind::Db)
        .any(|segment| segment.key == key);
    if repeated {
        return Err(ManifestError::new(
            ErrorCode::DependencyCycle,
            format!(
                "Inline db dependency {} repeats along {}",
                key,
                node.context().lineage_label()
            ),
        ));
    }
    Ok(())
}
