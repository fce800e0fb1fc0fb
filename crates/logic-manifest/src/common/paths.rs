//! Path Utilities
//!
//! Lexical path resolution for manifest and package locations.

use std::path::{Component, Path, PathBuf};

/// Collapse `.` and `..` components without touching the filesystem
///
/// `..` at the root stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Resolve `path` against `base` the way a shell would
///
/// # Example
/// ```ignore
/// let root = resolve_path(Path::new("/srv/app"), "../shared/ui");
/// // root == "/srv/shared/ui"
/// ```
pub fn resolve_path(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}

/// Make `path` absolute against the process working directory
pub(crate) fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_path(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => resolve_path(&cwd, path),
        Err(_) => normalize_path(path),
    }
}
