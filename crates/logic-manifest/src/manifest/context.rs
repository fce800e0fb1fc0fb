//! Per-node context: where a manifest came from and how it was reached.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use super::node::LogicManifest;
use super::types::EdgeKind;

/// One step from the root manifest towards a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineageSegment {
    pub edge: EdgeKind,
    pub key: String,
}

impl fmt::Display for LineageSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.edge.as_str(), self.key)
    }
}

/// Immutable context of a manifest node
#[derive(Debug, Clone)]
pub struct ManifestContext {
    base_dir: PathBuf,
    manifest_path: PathBuf,
    lineage: Vec<LineageSegment>,
    parent: Option<Weak<LogicManifest>>,
    requested_version: Option<String>,
}

impl ManifestContext {
    /// Context for a root manifest read from `manifest_path`
    pub fn root(manifest_path: PathBuf) -> Self {
        let base_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            base_dir,
            manifest_path,
            lineage: Vec::new(),
            parent: None,
            requested_version: None,
        }
    }

    /// Context for a ui dependency installed at `package_root`
    pub fn ui_child(
        parent: &Arc<LogicManifest>,
        package_name: &str,
        package_root: PathBuf,
        manifest_path: PathBuf,
        requested_version: &str,
    ) -> Self {
        Self {
            base_dir: package_root,
            manifest_path,
            lineage: parent.context().extend_lineage(EdgeKind::Ui, package_name),
            parent: Some(Arc::downgrade(parent)),
            requested_version: Some(requested_version.to_string()),
        }
    }

    /// Context for an inline db definition
    ///
    /// Shares the parent's base directory. Db edges assert no version.
    pub fn db_child(parent: &Arc<LogicManifest>, key: &str) -> Self {
        let ctx = parent.context();
        let mut synthetic = ctx.manifest_path.clone().into_os_string();
        synthetic.push(format!("#/dbDepsMap/{}", key));
        Self {
            base_dir: ctx.base_dir.clone(),
            manifest_path: PathBuf::from(synthetic),
            lineage: ctx.extend_lineage(EdgeKind::Db, key),
            parent: Some(Arc::downgrade(parent)),
            requested_version: None,
        }
    }

    fn extend_lineage(&self, edge: EdgeKind, key: &str) -> Vec<LineageSegment> {
        let mut lineage = self.lineage.clone();
        lineage.push(LineageSegment {
            edge,
            key: key.to_string(),
        });
        lineage
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn lineage(&self) -> &[LineageSegment] {
        &self.lineage
    }

    /// Parent node, if it is still alive
    pub fn parent(&self) -> Option<Arc<LogicManifest>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Version asserted by the edge that first loaded this node
    ///
    /// Shared nodes are validated against every requesting edge, not only this one.
    pub fn requested_version(&self) -> Option<&str> {
        self.requested_version.as_deref()
    }

    /// Lineage rendered as `ui:a > db:b`, or `<root>`
    pub fn lineage_label(&self) -> String {
        if self.lineage.is_empty() {
            return "<root>".to_string();
        }
        self.lineage
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" > ")
    }
}
