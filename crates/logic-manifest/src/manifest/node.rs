//! Manifest Node
//!
//! A `LogicManifest` owns its normalized definition, its context, the
//! validation error list and the two ordered child collections. Child
//! collections are populated by the dependency resolver; nodes never resolve
//! themselves.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};
use tokio::sync::OnceCell;

use super::context::{LineageSegment, ManifestContext};
use super::entry::Exports;
use super::types::{Contract, Contracts, EdgeKind, ManifestDefinition};
use crate::common::ManifestResult;

/// Ordered name → child mapping
pub type DependencyMap = Vec<(String, Arc<LogicManifest>)>;

/// Resolution progress of one edge kind on one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveStatus {
    #[default]
    Unresolved,
    InProgress,
    Resolved,
}

#[derive(Debug, Default)]
struct EdgeState {
    status: ResolveStatus,
    children: DependencyMap,
}

pub struct LogicManifest {
    definition: ManifestDefinition,
    context: ManifestContext,
    validation_errors: Mutex<Vec<String>>,
    ui: RwLock<EdgeState>,
    db: RwLock<EdgeState>,
    pub(crate) package_json: OnceCell<Option<Value>>,
    pub(crate) entry_path: OnceCell<PathBuf>,
    pub(crate) exports: OnceCell<Exports>,
}

impl std::fmt::Debug for LogicManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicManifest")
            .field("package_name", &self.definition.package_name)
            .field("version", &self.definition.version)
            .field("manifest_path", &self.context.manifest_path())
            .field("lineage", &self.context.lineage_label())
            .finish()
    }
}

impl LogicManifest {
    pub fn new(definition: ManifestDefinition, context: ManifestContext) -> Self {
        Self {
            definition,
            context,
            validation_errors: Mutex::new(Vec::new()),
            ui: RwLock::new(EdgeState::default()),
            db: RwLock::new(EdgeState::default()),
            package_json: OnceCell::new(),
            entry_path: OnceCell::new(),
            exports: OnceCell::new(),
        }
    }

    /// Normalize a raw JSON definition and build an unresolved node
    pub fn from_value(raw: &Value, context: ManifestContext) -> ManifestResult<Self> {
        Ok(Self::new(ManifestDefinition::from_value(raw)?, context))
    }

    pub fn definition(&self) -> &ManifestDefinition {
        &self.definition
    }

    pub fn context(&self) -> &ManifestContext {
        &self.context
    }

    pub fn package_name(&self) -> Option<&str> {
        self.definition.package_name.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.definition.version.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.definition.category.as_deref()
    }

    pub fn kind(&self) -> Option<&str> {
        self.definition.kind.as_deref()
    }

    pub fn layer(&self) -> Option<&str> {
        self.definition.layer.as_deref()
    }

    pub fn db_type(&self) -> Option<&str> {
        self.definition.db_type.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.definition.tags
    }

    pub fn contracts(&self) -> &Contracts {
        &self.definition.contracts
    }

    pub fn business_domain(&self) -> Option<&str> {
        self.definition.business_domain.as_deref()
    }

    pub fn platform(&self) -> Option<&str> {
        self.definition.platform.as_deref()
    }

    pub fn structure(&self) -> Option<&str> {
        self.definition.structure.as_deref()
    }

    pub fn implementation(&self) -> Option<&str> {
        self.definition.implementation.as_deref()
    }

    pub fn render_mode(&self) -> Option<&str> {
        self.definition.render_mode.as_deref()
    }

    pub fn family(&self) -> Option<&str> {
        self.definition.family.as_deref()
    }

    pub fn theme(&self) -> Option<&str> {
        self.definition.theme.as_deref()
    }

    /// Usable entry; an empty string counts as absent
    pub fn entry(&self) -> Option<&str> {
        self.definition.entry.as_deref().filter(|e| !e.is_empty())
    }

    pub fn base_dir(&self) -> &Path {
        self.context.base_dir()
    }

    pub fn manifest_path(&self) -> &Path {
        self.context.manifest_path()
    }

    pub fn lineage(&self) -> &[LineageSegment] {
        self.context.lineage()
    }

    pub fn parent(&self) -> Option<Arc<LogicManifest>> {
        self.context.parent()
    }

    /// Snapshot of the resolved ui children
    pub fn ui_deps_map(&self) -> DependencyMap {
        read(&self.ui).children.clone()
    }

    /// Snapshot of the resolved db children
    pub fn db_deps_map(&self) -> DependencyMap {
        read(&self.db).children.clone()
    }

    pub fn ui_dep(&self, name: &str) -> Option<Arc<LogicManifest>> {
        lookup(&read(&self.ui).children, name)
    }

    pub fn db_dep(&self, name: &str) -> Option<Arc<LogicManifest>> {
        lookup(&read(&self.db).children, name)
    }

    /// Direct children, ui collection first
    pub fn children(&self) -> Vec<Arc<LogicManifest>> {
        let ui = read(&self.ui);
        let db = read(&self.db);
        ui.children
            .iter()
            .chain(db.children.iter())
            .map(|(_, child)| Arc::clone(child))
            .collect()
    }

    pub fn resolve_status(&self, edge: EdgeKind) -> ResolveStatus {
        read(self.edge(edge)).status
    }

    pub fn is_resolved(&self, edge: EdgeKind) -> bool {
        self.resolve_status(edge) == ResolveStatus::Resolved
    }

    /// Claim resolution of `edge`; false when it is running or done
    pub(crate) fn begin_resolve(&self, edge: EdgeKind) -> bool {
        let mut state = write(self.edge(edge));
        if state.status != ResolveStatus::Unresolved {
            return false;
        }
        state.status = ResolveStatus::InProgress;
        true
    }

    /// Install freshly built children and mark `edge` resolved
    pub(crate) fn finish_resolve(&self, edge: EdgeKind, children: DependencyMap) {
        let mut state = write(self.edge(edge));
        state.children = children;
        state.status = ResolveStatus::Resolved;
    }

    /// Release a claim after a failed build so the edge can be retried
    pub(crate) fn abort_resolve(&self, edge: EdgeKind) {
        write(self.edge(edge)).status = ResolveStatus::Unresolved;
    }

    fn edge(&self, edge: EdgeKind) -> &RwLock<EdgeState> {
        match edge {
            EdgeKind::Ui => &self.ui,
            EdgeKind::Db => &self.db,
        }
    }

    pub(crate) fn errors(&self) -> MutexGuard<'_, Vec<String>> {
        self.validation_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Depth-first search over resolved children: self, ui, then db
    pub fn find_manifest(self: &Arc<Self>, package_name: &str) -> Option<Arc<LogicManifest>> {
        if package_name.is_empty() {
            return None;
        }
        let mut path = Vec::new();
        find_in(self, package_name, &mut path)
    }

    /// Plain JSON view of this node and its resolved subtree
    pub fn to_json(&self) -> Value {
        let mut path = Vec::new();
        self.to_json_inner(&mut path)
    }

    fn to_json_inner(&self, path: &mut Vec<*const LogicManifest>) -> Value {
        let on_path = path.contains(&(self as *const LogicManifest));
        let mut json = Map::new();
        let def = &self.definition;

        json.insert("packageName".into(), opt(&def.package_name));
        json.insert("version".into(), opt(&def.version));
        json.insert("category".into(), opt(&def.category));
        json.insert("kind".into(), opt(&def.kind));
        json.insert("layer".into(), opt(&def.layer));
        json.insert("dbType".into(), opt(&def.db_type));
        json.insert(
            "tags".into(),
            Value::Array(def.tags.iter().cloned().map(Value::String).collect()),
        );
        let mut contracts = Map::new();
        contracts.insert("expects".into(), contract_list(&def.contracts.expects));
        contracts.insert("provides".into(), contract_list(&def.contracts.provides));
        json.insert("contracts".into(), Value::Object(contracts));
        json.insert("businessDomain".into(), opt(&def.business_domain));
        json.insert("platform".into(), opt(&def.platform));
        json.insert("structure".into(), opt(&def.structure));
        json.insert("implementation".into(), opt(&def.implementation));
        json.insert("renderMode".into(), opt(&def.render_mode));
        json.insert("family".into(), opt(&def.family));
        json.insert("theme".into(), opt(&def.theme));

        // A node revisited through a package cycle is emitted without children
        let (ui, db) = if on_path {
            (Map::new(), Map::new())
        } else {
            path.push(self as *const LogicManifest);
            let ui = self.children_json(&self.ui_deps_map(), path);
            let db = self.children_json(&self.db_deps_map(), path);
            path.pop();
            (ui, db)
        };
        json.insert("uiDepsMap".into(), Value::Object(ui));
        json.insert("dbDepsMap".into(), Value::Object(db));

        Value::Object(json)
    }

    fn children_json(
        &self,
        children: &DependencyMap,
        path: &mut Vec<*const LogicManifest>,
    ) -> Map<String, Value> {
        children
            .iter()
            .map(|(name, child)| (name.clone(), child.to_json_inner(path)))
            .collect()
    }
}

fn find_in(
    node: &Arc<LogicManifest>,
    package_name: &str,
    path: &mut Vec<*const LogicManifest>,
) -> Option<Arc<LogicManifest>> {
    if node.package_name() == Some(package_name) {
        return Some(Arc::clone(node));
    }
    let ptr = Arc::as_ptr(node);
    if path.contains(&ptr) {
        return None;
    }
    path.push(ptr);
    let found = node
        .children()
        .iter()
        .find_map(|child| find_in(child, package_name, path));
    path.pop();
    found
}

fn lookup(children: &DependencyMap, name: &str) -> Option<Arc<LogicManifest>> {
    children
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, child)| Arc::clone(child))
}

fn opt(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn contract_list(contracts: &[Contract]) -> Value {
    Value::Array(
        contracts
            .iter()
            .map(|c| {
                let mut obj = Map::new();
                obj.insert("key".into(), Value::String(c.key.clone()));
                obj.insert("channel".into(), Value::String(c.channel.clone()));
                obj.insert("description".into(), Value::String(c.description.clone()));
                Value::Object(obj)
            })
            .collect(),
    )
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
