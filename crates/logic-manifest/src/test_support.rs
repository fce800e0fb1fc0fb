//! Fixture helpers shared by unit tests

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::common::BoxError;
use crate::manifest::{CodeLoader, Exports};

pub(crate) fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// Write `<dir>/logic.json` and return its path
pub(crate) fn write_manifest(dir: &Path, value: &Value) -> PathBuf {
    let path = dir.join("logic.json");
    write_json(&path, value);
    path
}

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, "").unwrap();
}

/// Root bundle with two ui modules and inline db modules:
///
/// ```text
/// sample-root
/// ├── ui:sample-b   (file:./modules/b)
/// ├── ui:sample-c   (node_modules/sample-c)
/// │   ├── ui:sample-b
/// │   └── db:db-c
/// └── db:db-a
/// ```
pub(crate) fn sample_tree(root: &Path) -> PathBuf {
    write_json(
        &root.join("package.json"),
        &json!({
            "name": "sample-root",
            "dependencies": {"sample-b": "file:./modules/b", "sample-c": "^1.0.0"}
        }),
    );

    let b = root.join("modules").join("b");
    write_manifest(
        &b,
        &json!({
            "packageName": "sample-b",
            "version": "1.0.0",
            "kind": "module",
            "layer": "ui",
            "implementation": "controller.js"
        }),
    );
    touch(&b.join("controller.js"));

    let c = root.join("node_modules").join("sample-c");
    write_json(
        &c.join("package.json"),
        &json!({
            "name": "sample-c",
            "dependencies": {"sample-b": "file:../../modules/b"}
        }),
    );
    write_manifest(
        &c,
        &json!({
            "packageName": "sample-c",
            "version": "1.0.0",
            "kind": "module",
            "layer": "ui",
            "entry": "controller.js",
            "uiDeps": {"sample-b": "1.0.0"},
            "dbDepsMap": {
                "db-c": {
                    "packageName": "db-c",
                    "version": "1.0.0",
                    "kind": "module",
                    "layer": "db",
                    "dbType": "addon",
                    "entry": "db/index.js"
                }
            }
        }),
    );
    touch(&c.join("controller.js"));
    touch(&c.join("db").join("index.js"));

    write_manifest(
        root,
        &json!({
            "packageName": "sample-root",
            "version": "1.0.0",
            "kind": "bundle",
            "layer": "ui",
            "tags": ["shell", " demo "],
            "contracts": {
                "expects": [{"key": "session", "channel": "http", "description": "Active user"}]
            },
            "uiDeps": {"sample-b": "1.0.0", "sample-c": "1.0.0"},
            "dbDepsMap": {
                "db-a": {
                    "packageName": "db-a",
                    "version": "1.0.0",
                    "kind": "module",
                    "layer": "db",
                    "dbType": "core",
                    "entry": "db-a/index.js"
                }
            }
        }),
    )
}

/// Root bundle depending on `sample-b`, whose own version is `dep_version`
pub(crate) fn two_module_tree(root: &Path, dep_version: &str) -> PathBuf {
    write_json(
        &root.join("package.json"),
        &json!({"dependencies": {"sample-b": "file:./modules/b"}}),
    );
    let b = root.join("modules").join("b");
    write_manifest(
        &b,
        &json!({
            "packageName": "sample-b",
            "version": dep_version,
            "kind": "module",
            "layer": "ui",
            "implementation": "controller.js"
        }),
    );
    touch(&b.join("controller.js"));
    write_manifest(
        root,
        &json!({
            "packageName": "sample-root",
            "version": "1.0.0",
            "kind": "bundle",
            "layer": "ui",
            "uiDeps": {"sample-b": "1.0.0"}
        }),
    )
}

/// Code loader that returns the entry path as its exports
#[derive(Default)]
pub(crate) struct CountingLoader {
    calls: AtomicUsize,
    fail_first: bool,
}

impl CountingLoader {
    pub(crate) fn failing_first() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first: true,
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeLoader for CountingLoader {
    async fn load_code(&self, path: &Path) -> Result<Exports, BoxError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_first && call == 0 {
            return Err("entry rejected".into());
        }
        Ok(Arc::new(path.to_path_buf()))
    }
}
