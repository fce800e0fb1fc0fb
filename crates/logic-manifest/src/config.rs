//! Loader configuration
//!
//! File names and search roots used when locating manifests and packages.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::common::{absolutize, ErrorCode, ManifestError, ManifestResult};

/// Default manifest discovery filename
pub const DEFAULT_MANIFEST_FILENAME: &str = "logic.json";

/// Default package-registry filename consulted for ui dependencies
pub const DEFAULT_PACKAGE_FILENAME: &str = "package.json";

/// Default directory searched by host package resolution
pub const DEFAULT_MODULES_DIR: &str = "node_modules";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderConfig {
    /// Manifest filename looked up in directories and ancestors
    pub filename: String,
    /// Package-registry filename next to each manifest
    pub package_file: String,
    /// Package install directory searched up the ancestor chain
    pub modules_dir: String,
    /// Starting directory for nearest-ancestor discovery (process cwd when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            filename: DEFAULT_MANIFEST_FILENAME.to_string(),
            package_file: DEFAULT_PACKAGE_FILENAME.to_string(),
            modules_dir: DEFAULT_MODULES_DIR.to_string(),
            cwd: None,
        }
    }
}

impl LoaderConfig {
    /// Read a config file; missing keys keep their defaults
    pub fn load(path: &Path) -> ManifestResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ManifestError::new(
                ErrorCode::ManifestFileReadFailed,
                format!("Failed to read config {}", path.display()),
            )
            .with_cause(e)
        })?;

        serde_json::from_str(&content).map_err(|e| {
            ManifestError::new(
                ErrorCode::ManifestFileReadFailed,
                format!("Failed to parse config JSON {}", path.display()),
            )
            .with_cause(e)
        })
    }

    /// Per-user config location (`<config dir>/logic-manifest/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("logic-manifest").join("config.json"))
    }

    /// Absolute starting directory for discovery
    pub fn cwd(&self) -> PathBuf {
        match &self.cwd {
            Some(cwd) => absolutize(cwd),
            None => absolutize(Path::new(".")),
        }
    }
}
