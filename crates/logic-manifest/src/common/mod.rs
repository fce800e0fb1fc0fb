//! Common Utilities
//!
//! Shared error handling and path helpers used across the crate.

pub mod error;
pub mod paths;
pub mod result;

pub use error::{BoxError, ErrorCode, ManifestError};
pub(crate) use paths::absolutize;
pub use paths::{normalize_path, resolve_path};
pub use result::ManifestResult;
