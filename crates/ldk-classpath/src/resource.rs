use std::fmt;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use ldk_types::Location;

use crate::error::ClasspathResult;
use crate::manifest::Manifest;
use crate::unit::archive::ArchiveShared;

/// A resource found by a loader unit.
///
/// Resources are produced fresh for every query and are never cached by the
/// resolver. Reading an archive resource after its unit has been closed fails
/// with [`ClasspathError::Closed`](crate::ClasspathError::Closed).
#[derive(Clone)]
pub struct Resource {
    name: String,
    origin: Location,
    source: Source,
    manifest: Option<Arc<Manifest>>,
}

#[derive(Clone)]
enum Source {
    File(PathBuf),
    Archive { archive: Arc<ArchiveShared>, size: u64 },
}

impl Resource {
    pub(crate) fn file(name: &str, origin: Location, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            origin,
            source: Source::File(path),
            manifest: None,
        }
    }

    pub(crate) fn archive_entry(
        name: &str,
        archive: Arc<ArchiveShared>,
        size: u64,
        manifest: Option<Arc<Manifest>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            origin: archive.location().clone(),
            source: Source::Archive { archive, size },
            manifest,
        }
    }

    /// The name the resource was requested under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of the unit that produced this resource.
    pub fn origin(&self) -> &Location {
        &self.origin
    }

    /// Manifest of the archive this resource came from, if any.
    pub fn manifest(&self) -> Option<&Arc<Manifest>> {
        self.manifest.as_ref()
    }

    /// The local file backing a directory resource.
    pub fn file_path(&self) -> Option<&PathBuf> {
        match &self.source {
            Source::File(path) => Some(path),
            Source::Archive { .. } => None,
        }
    }

    /// Uncompressed length in bytes, when known without reading.
    pub fn content_length(&self) -> Option<u64> {
        match &self.source {
            Source::File(path) => std::fs::metadata(path).ok().map(|m| m.len()),
            Source::Archive { size, .. } => Some(*size),
        }
    }

    /// Read the whole resource.
    pub fn bytes(&self) -> ClasspathResult<Vec<u8>> {
        match &self.source {
            Source::File(path) => Ok(std::fs::read(path)?),
            Source::Archive { archive, .. } => archive.read_entry(&self.name),
        }
    }

    /// Open the resource for streaming reads.
    pub fn reader(&self) -> ClasspathResult<Box<dyn Read + Send>> {
        match &self.source {
            Source::File(path) => Ok(Box::new(std::fs::File::open(path)?)),
            Source::Archive { archive, .. } => {
                Ok(Box::new(Cursor::new(archive.read_entry(&self.name)?)))
            }
        }
    }

    /// Human-readable address: the file path, or `jar:<archive>!/<entry>`.
    pub fn url(&self) -> String {
        match &self.source {
            Source::File(path) => format!("file:{}", path.display()),
            Source::Archive { .. } => format!("jar:file:{}!/{}", self.origin, self.name),
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("url", &self.url())
            .field("has_manifest", &self.manifest.is_some())
            .finish()
    }
}
