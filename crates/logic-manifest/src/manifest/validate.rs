//! Validation Engine
//!
//! Recomputes structural errors for a node and every child already resolved
//! under it. Validation never fails; problems are collected as messages.

use super::node::LogicManifest;
use super::types::{DbType, Kind, Layer};

impl LogicManifest {
    /// Validate this node and its resolved subtree; true when no errors
    pub fn validate(&self) -> bool {
        let mut path = Vec::new();
        self.validate_inner(&mut path)
    }

    /// Snapshot of the errors from the last `validate` call
    pub fn validation_errors(&self) -> Vec<String> {
        self.errors().clone()
    }

    fn validate_inner(&self, path: &mut Vec<*const LogicManifest>) -> bool {
        let mut errors = self.own_errors();

        path.push(self as *const LogicManifest);
        let ui = self.ui_deps_map();
        let db = self.db_deps_map();
        for (key, child) in &ui {
            // Shared nodes are checked against every edge that requests them
            if let Some(msg) = self.edge_version_error(key, child) {
                errors.push(format!("{}: {}", child_prefix(child), msg));
            }
            validate_child(child, path, &mut errors);
        }
        for (_, child) in &db {
            validate_child(child, path, &mut errors);
        }
        path.pop();

        let valid = errors.is_empty();
        *self.errors() = errors;
        valid
    }

    /// Mismatch between the version this node requests for `key` and the child's own
    fn edge_version_error(&self, key: &str, child: &LogicManifest) -> Option<String> {
        let requested = self
            .definition()
            .ui_deps
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, requested)| requested.as_str())?;
        let version = child.version().filter(|v| is_semver(v))?;
        if version == requested {
            return None;
        }
        Some(format!(
            "{}: version {} does not match requested {}",
            child.package_name().unwrap_or("<unknown>"),
            version,
            requested
        ))
    }

    fn own_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let label = self.package_name().unwrap_or("<unknown>");

        if self.package_name().map_or(true, str::is_empty) {
            errors.push("packageName is required".to_string());
        }

        match self.version().filter(|v| !v.is_empty()) {
            None => errors.push(format!("{}: version is required", label)),
            Some(version) if !is_semver(version) => {
                errors.push(format!("{}: version is not a valid semver string", label))
            }
            Some(_) => {}
        }

        let kind = self.kind().and_then(Kind::parse);
        if kind.is_none() {
            errors.push(format!(
                "{}: kind must be one of {}",
                label,
                join(Kind::ALL.iter().map(Kind::as_str))
            ));
        }

        let layer = self.layer().and_then(Layer::parse);
        if layer.is_none() {
            errors.push(format!(
                "{}: layer must be one of {}",
                label,
                join(Layer::ALL.iter().map(Layer::as_str))
            ));
        }

        let db_type = self.db_type().filter(|d| !d.is_empty());
        if layer == Some(Layer::Db) && kind == Some(Kind::Module) && db_type.is_none() {
            errors.push(format!("{}: dbType is required for database modules", label));
        }
        if let Some(db_type) = db_type {
            if DbType::parse(db_type).is_none() {
                errors.push(format!(
                    "{}: dbType must be one of {}",
                    label,
                    join(DbType::ALL.iter().map(DbType::as_str))
                ));
            }
        }

        if layer == Some(Layer::Ui) && kind == Some(Kind::Module) && self.entry().is_none() {
            errors.push(format!(
                "{}: UI modules must declare an implementation entry",
                label
            ));
        }

        errors
    }
}

fn validate_child(
    child: &LogicManifest,
    path: &mut Vec<*const LogicManifest>,
    errors: &mut Vec<String>,
) {
    // Package cycles lead back to a node already being validated
    if path.contains(&(child as *const LogicManifest)) {
        return;
    }
    child.validate_inner(path);
    let prefix = child_prefix(child);
    errors.extend(
        child
            .validation_errors()
            .into_iter()
            .map(|msg| format!("{}: {}", prefix, msg)),
    );
}

fn child_prefix(child: &LogicManifest) -> &str {
    child.package_name().unwrap_or("<anonymous>")
}

fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(", ")
}

/// `MAJOR.MINOR.PATCH` with an optional `-`/`+` suffix of `[0-9A-Za-z.-]`
pub(crate) fn is_semver(version: &str) -> bool {
    let (core, suffix) = match version.find(|c: char| c == '-' || c == '+') {
        Some(idx) => (&version[..idx], Some(&version[idx + 1..])),
        None => (version, None),
    };

    let mut parts = 0;
    for part in core.split('.') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        parts += 1;
    }
    if parts != 3 {
        return false;
    }

    match suffix {
        None => true,
        Some(s) => {
            !s.is_empty()
                && s
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
        }
    }
}
