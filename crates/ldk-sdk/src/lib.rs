//! High-level SDK for ldk.
//!
//! A [`LoadingContext`] is the unit applications embed: one owner, its
//! classpath, its load coordinator and its native libraries.

pub mod config;
pub mod context;
pub mod error;

pub use config::SdkConfig;
pub use context::{LoadedClass, LoadingContext, LoadingContextBuilder};
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use ldk_classpath::{ClasspathResolver, Resource, ResolverConfig};
pub use ldk_coord::{CoordinatorConfig, LockingMode};
pub use ldk_native::{LibraryTable, NativeConfig, NativeLibrary, Owner, OwnerId, OwnerKind};
pub use ldk_types::Location;
