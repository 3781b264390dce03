//! Loader units: one per materialized classpath location.

pub mod archive;
pub mod directory;

use std::sync::Arc;

use ldk_types::Location;

use crate::config::ResolverConfig;
use crate::error::{ClasspathError, ClasspathResult};
use crate::resource::Resource;

pub use archive::ArchiveUnit;
pub use directory::DirectoryUnit;

/// One resolved classpath element.
///
/// Implementations must be thread-safe: the resolver hands out shared
/// references and queries them without holding its own lock.
pub trait LoaderUnit: Send + Sync {
    /// The location this unit was created for.
    fn location(&self) -> &Location;

    /// Look up a resource by its `/`-separated name.
    ///
    /// Returns `Ok(None)` if the unit does not contain it.
    fn get_resource(&self, name: &str) -> ClasspathResult<Option<Resource>>;

    /// Check whether the unit contains `name`.
    fn has_resource(&self, name: &str) -> ClasspathResult<bool> {
        Ok(self.get_resource(name)?.is_some())
    }

    /// Additional locations this unit declares, in declaration order.
    ///
    /// Units without a manifest declare nothing.
    fn extension_class_path(&self) -> ClasspathResult<Vec<Location>> {
        Ok(Vec::new())
    }

    /// All resource names in this unit, sorted.
    fn entries(&self) -> ClasspathResult<Vec<String>>;

    /// Release any handles held by the unit. Closing twice is a no-op.
    fn close(&self) -> ClasspathResult<()>;
}

/// Create the loader unit for `location`.
///
/// Existing directories become [`DirectoryUnit`]s; every other local path is
/// treated as an archive, which is opened lazily on first access. Non-local
/// schemes are not supported.
pub fn open_unit(
    location: &Location,
    config: &ResolverConfig,
) -> ClasspathResult<Arc<dyn LoaderUnit>> {
    let path = location
        .as_path()
        .ok_or_else(|| ClasspathError::UnsupportedScheme {
            scheme: location.scheme().to_string(),
            location: location.clone(),
        })?;

    if path.is_dir() {
        Ok(Arc::new(DirectoryUnit::new(location.clone())))
    } else {
        Ok(Arc::new(ArchiveUnit::new(location.clone(), config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_locations_unsupported() {
        let loc = Location::parse("http://host/a.jar").unwrap();
        let err = open_unit(&loc, &ResolverConfig::default()).err().unwrap();
        assert!(matches!(err, ClasspathError::UnsupportedScheme { ref scheme, .. } if scheme == "http"));
    }

    #[test]
    fn directory_vs_archive() {
        let dir = tempfile::tempdir().unwrap();
        let config = ResolverConfig::default();

        let unit = open_unit(&Location::local(dir.path()), &config).unwrap();
        assert!(unit.entries().unwrap().is_empty());

        // Missing archives are only detected on first access.
        let missing = Location::local(dir.path().join("missing.jar"));
        let unit = open_unit(&missing, &config).unwrap();
        assert!(unit.get_resource("x").is_err());
    }
}
