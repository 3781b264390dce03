//! Foundation types for ldk.
//!
//! This crate provides the location and naming types shared by the classpath
//! resolver, the native library registry, and the tooling built on top of
//! them. Every other ldk crate depends on `ldk-types`.
//!
//! # Key Types
//!
//! - [`Location`] — A normalized classpath location (local path or remote URL)
//! - [`LocationKey`] — Deduplication key for a location (fragment dropped)
//! - [`split_classpath`] — Platform classpath string splitting
//! - [`binary_name_to_resource`] — `a.b.C` to `a/b/C.class` mapping

pub mod classpath;
pub mod error;
pub mod location;
pub mod name;

pub use classpath::{split_classpath, split_classpath_with, PATH_SEPARATOR};
pub use error::{TypeError, TypeResult};
pub use location::{normalize_path, Location, LocationKey};
pub use name::{binary_name_to_resource, resource_to_binary_name};
