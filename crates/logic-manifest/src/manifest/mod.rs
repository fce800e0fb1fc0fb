//! Manifest System
//!
//! Parses `logic.json` manifests, resolves their ui and db dependencies into a
//! tree of shared nodes, validates the tree, and loads module entries on demand.

pub mod context;
pub mod entry;
pub mod loader;
pub mod node;
pub mod package;
pub mod registry;
pub mod resolver;
pub mod types;
mod validate;

pub use context::{LineageSegment, ManifestContext};
pub use entry::{CodeLoader, Exports, LibraryLoader};
pub use loader::{load_manifest, ManifestLoader};
pub use node::{DependencyMap, LogicManifest, ResolveStatus};
pub use package::{PackageRootResolver, DEPENDENCY_SECTIONS};
pub use registry::{ManifestRegistry, ManifestSource};
pub use resolver::{DependencyResolver, ResolveOptions};
pub use types::{Contract, Contracts, DbType, EdgeKind, Kind, Layer, ManifestDefinition};
