//! Logic manifest resolution
//!
//! Turns a declarative `logic.json` into a validated tree of module nodes.
//! ui dependencies are located through each module's `package.json`; db
//! dependencies are declared inline. Module code is loaded lazily through a
//! host-supplied [`CodeLoader`].

pub mod common;
pub mod config;
pub mod manifest;

#[cfg(test)]
mod test_support;

pub use common::{ErrorCode, ManifestError, ManifestResult};
pub use config::LoaderConfig;
pub use manifest::{
    load_manifest, CodeLoader, DependencyResolver, EdgeKind, Exports, LibraryLoader,
    LogicManifest, ManifestLoader, ManifestRegistry, ManifestSource, ResolveOptions,
};
