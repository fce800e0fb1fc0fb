//! Common Result Type

use super::error::ManifestError;

/// Manifest result type
///
/// Every fallible manifest operation returns a ManifestError.
pub type ManifestResult<T> = Result<T, ManifestError>;
