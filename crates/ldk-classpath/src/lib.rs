//! Lazy classpath resolution.
//!
//! A [`ClasspathResolver`] owns an ordered search path of [`Location`]s and
//! turns them into loader units on demand. Each unit answers "do you have
//! resource X" for one directory or archive. Archives may declare further
//! locations in their manifest's `Class-Path` attribute; those are chased
//! depth-first before the resolver moves on to the next original entry.
//!
//! # Modules
//!
//! - [`config`] — [`ResolverConfig`] toggles (header check, diagnostics, legacy mode)
//! - [`manifest`] — `META-INF/MANIFEST.MF` parsing
//! - [`unit`] — the [`LoaderUnit`] trait with [`DirectoryUnit`] and [`ArchiveUnit`]
//! - [`resource`] — [`Resource`] values produced per query
//! - [`resolver`] — the [`ClasspathResolver`] itself
//!
//! # Design Rules
//!
//! 1. Earlier units always shadow later ones; queries never skip ahead.
//! 2. A location is materialized into at most one unit per resolver.
//! 3. A bad entry is skipped, never fatal to the whole resolution.
//! 4. Closing is irreversible and idempotent.
//!
//! [`Location`]: ldk_types::Location

pub mod config;
pub mod error;
pub mod manifest;
pub mod resolver;
pub mod resource;
pub mod unit;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ResolverConfig;
pub use error::{ClasspathError, ClasspathResult};
pub use manifest::{Attributes, Manifest};
pub use resolver::{ClasspathResolver, ResourceIter};
pub use resource::Resource;
pub use unit::{open_unit, ArchiveUnit, DirectoryUnit, LoaderUnit};
