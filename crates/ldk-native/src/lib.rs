//! Native library loading scoped to owners.
//!
//! An [`Owner`] stands for the context a library is loaded on behalf of.
//! [`NativeLibraryRegistry`] opens libraries for owners and keeps every
//! library name unique across all registries that share a [`LibraryTable`].
//! [`TrustedNativeLibraryRegistry`] is the unscoped, explicitly managed
//! variant.
//!
//! # Modules
//!
//! - [`owner`] — owners, their ids and lifetime kinds
//! - [`registry`] — the owner-scoped registry and its search order
//! - [`trusted`] — the path-keyed registry
//! - [`opener`] — the platform seam, with a `libloading` implementation
//! - [`search`] — platform file names and search directories
//! - [`config`] — [`NativeConfig`] and library path string parsing
//!
//! # Design Rules
//!
//! 1. A library name is registered to at most one owner per table.
//! 2. The table lock is held across the platform open and close.
//! 3. A thread that re-enters the registry from a library hook sees its own
//!    in-flight operation and never deadlocks on it.
//! 4. Dropping a collectible owner unloads its libraries; system owners never
//!    unload.

pub mod config;
pub mod context;
pub mod error;
pub mod library;
pub mod opener;
pub mod owner;
pub mod registry;
pub mod search;
pub mod table;
pub mod trusted;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{parse_library_path, NativeConfig};
pub use context::{ContextKind, LoadContext};
pub use error::{NativeError, NativeResult};
pub use library::NativeLibrary;
pub use opener::{DylibOpener, LibraryHandle, LibraryOpener};
pub use owner::{LibraryFinder, Owner, OwnerId, OwnerKind};
pub use registry::NativeLibraryRegistry;
pub use search::{alternative_library_name, library_base_name, map_library_name, LibrarySearchPath};
pub use table::LibraryTable;
pub use trusted::{TrustedLibrary, TrustedNativeLibraryRegistry};
