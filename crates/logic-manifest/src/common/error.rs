//! Common Error Types
//!
//! One error type for every manifest failure, dispatched on by [`ErrorCode`].

use std::error::Error as StdError;
use std::fmt;

/// Boxed underlying cause attached to a [`ManifestError`]
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Stable manifest error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Raw definition is not a JSON object
    DefinitionInvalid,
    /// No manifest file could be located
    ManifestNotFound,
    /// Located manifest path does not exist
    ManifestFileNotFound,
    /// Manifest file could not be read or parsed
    ManifestFileReadFailed,
    /// Declared ui dependency has no readable manifest
    DependencyManifestNotFound,
    /// No package root could be derived for a ui dependency
    DependencyResolveFailed,
    /// Inline db definitions reference themselves
    DependencyCycle,
    /// Node has no usable entry field
    EntryNotDeclared,
    /// Declared entry path is not accessible
    EntryNotFound,
    /// Host code loader rejected the entry
    EntryLoadFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DefinitionInvalid => "DEFINITION_INVALID",
            ErrorCode::ManifestNotFound => "MANIFEST_NOT_FOUND",
            ErrorCode::ManifestFileNotFound => "MANIFEST_FILE_NOT_FOUND",
            ErrorCode::ManifestFileReadFailed => "MANIFEST_FILE_READ_FAILED",
            ErrorCode::DependencyManifestNotFound => "DEPENDENCY_MANIFEST_NOT_FOUND",
            ErrorCode::DependencyResolveFailed => "DEPENDENCY_RESOLVE_FAILED",
            ErrorCode::DependencyCycle => "DEPENDENCY_CYCLE",
            ErrorCode::EntryNotDeclared => "ENTRY_NOT_DECLARED",
            ErrorCode::EntryNotFound => "ENTRY_NOT_FOUND",
            ErrorCode::EntryLoadFailed => "ENTRY_LOAD_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manifest error with a stable code and an optional cause
#[derive(Debug, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct ManifestError {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub cause: Option<BoxError>,
}

impl ManifestError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn definition_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DefinitionInvalid, message)
    }

    /// Create an unknown manifest error
    pub fn manifest_not_found(what: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ManifestNotFound,
            format!("Unknown manifest: {}", what),
        )
    }

    pub fn dependency_resolve_failed(package_name: &str) -> Self {
        Self::new(
            ErrorCode::DependencyResolveFailed,
            format!("Cannot resolve dependency {}", package_name),
        )
    }

    pub fn entry_not_declared(package_name: Option<&str>) -> Self {
        Self::new(
            ErrorCode::EntryNotDeclared,
            format!(
                "No loadable entry declared for {}",
                package_name.unwrap_or("<anonymous>")
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = ManifestError::dependency_resolve_failed("sample-b");
        assert_eq!(
            err.to_string(),
            "[DEPENDENCY_RESOLVE_FAILED] Cannot resolve dependency sample-b"
        );
    }

    #[test]
    fn test_cause_is_exposed_as_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ManifestError::new(ErrorCode::ManifestFileReadFailed, "read failed")
            .with_cause(io);
        assert_eq!(err.code(), ErrorCode::ManifestFileReadFailed);
        assert_eq!(err.source().map(|s| s.to_string()), Some("gone".to_string()));
    }
}
