use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use ldk_types::Location;
use parking_lot::Mutex;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::config::ResolverConfig;
use crate::error::{ClasspathError, ClasspathResult};
use crate::manifest::{Manifest, MANIFEST_PATH};
use crate::resource::Resource;
use crate::unit::LoaderUnit;

/// Signature of a zip local file header (`PK\x03\x04`).
const LOCAL_HEADER_SIGNATURE: [u8; 4] = *b"PK\x03\x04";

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOC: u64 = 64 * 1024;

type Zip = ZipArchive<BufReader<File>>;

struct OpenArchive {
    zip: Zip,
    manifest: Option<Arc<Manifest>>,
    class_path: Vec<Location>,
}

enum Slot {
    Unopened,
    Open(OpenArchive),
    Closed,
}

/// Archive state shared between the unit and the resources it produced.
pub(crate) struct ArchiveShared {
    location: Location,
    slot: Mutex<Slot>,
}

impl ArchiveShared {
    pub(crate) fn location(&self) -> &Location {
        &self.location
    }

    pub(crate) fn read_entry(&self, name: &str) -> ClasspathResult<Vec<u8>> {
        let mut slot = self.slot.lock();
        let Slot::Open(archive) = &mut *slot else {
            return Err(ClasspathError::Closed(self.location.clone()));
        };
        let mut file = archive
            .zip
            .by_name(name)
            .map_err(|e| zip_error(&self.location, e))?;
        let mut data = entry_buffer(file.size());
        file.read_to_end(&mut data)?;
        Ok(data)
    }
}

/// Declared sizes come from the archive and are not trusted.
fn entry_buffer(declared: u64) -> Vec<u8> {
    Vec::with_capacity(declared.min(MAX_PREALLOC) as usize)
}

/// Loader unit backed by a zip archive.
///
/// The archive is opened on first access, not at construction. Opening
/// optionally verifies the local file header signature, reads the manifest,
/// and resolves its `Class-Path` tokens against the archive's location.
pub struct ArchiveUnit {
    shared: Arc<ArchiveShared>,
    path: PathBuf,
    check_header: bool,
    diagnostics: bool,
    follow_class_path: bool,
}

impl ArchiveUnit {
    pub fn new(location: Location, config: &ResolverConfig) -> Self {
        let path = location.as_path().map(PathBuf::from).unwrap_or_default();
        Self {
            shared: Arc::new(ArchiveShared {
                location,
                slot: Mutex::new(Slot::Unopened),
            }),
            path,
            check_header: config.check_archive_header,
            diagnostics: config.diagnostics,
            follow_class_path: config.manifest_class_path,
        }
    }

    /// Whether the backing archive is currently open.
    pub fn is_open(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Open(_))
    }

    /// The archive manifest, opening the archive if needed.
    pub fn manifest(&self) -> ClasspathResult<Option<Arc<Manifest>>> {
        self.with_open(|archive| Ok(archive.manifest.clone()))
    }

    fn with_open<R>(
        &self,
        f: impl FnOnce(&mut OpenArchive) -> ClasspathResult<R>,
    ) -> ClasspathResult<R> {
        let mut slot = self.shared.slot.lock();
        if matches!(*slot, Slot::Unopened) {
            *slot = Slot::Open(self.open_archive()?);
        }
        match &mut *slot {
            Slot::Open(archive) => f(archive),
            Slot::Unopened | Slot::Closed => Err(ClasspathError::Closed(self.shared.location.clone())),
        }
    }

    fn open_archive(&self) -> ClasspathResult<OpenArchive> {
        let location = &self.shared.location;
        let mut file = File::open(&self.path)?;

        if self.check_header {
            let mut magic = [0u8; 4];
            let valid = file.read_exact(&mut magic).is_ok() && magic == LOCAL_HEADER_SIGNATURE;
            if !valid {
                return Err(ClasspathError::BadArchiveHeader(location.clone()));
            }
            file.seek(SeekFrom::Start(0))?;
        }

        let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| zip_error(location, e))?;
        let manifest = self.read_manifest(&mut zip);
        let class_path = match (&manifest, self.follow_class_path) {
            (Some(manifest), true) => self.resolve_class_path(manifest),
            _ => Vec::new(),
        };

        debug!(
            archive = %location,
            entries = zip.len(),
            class_path = class_path.len(),
            "opened archive"
        );
        Ok(OpenArchive {
            zip,
            manifest,
            class_path,
        })
    }

    /// A missing manifest is normal; a malformed one is dropped and the
    /// archive stays usable.
    fn read_manifest(&self, zip: &mut Zip) -> Option<Arc<Manifest>> {
        let mut file = zip.by_name(MANIFEST_PATH).ok()?;
        let mut bytes = entry_buffer(file.size());
        let parsed = file
            .read_to_end(&mut bytes)
            .map_err(ClasspathError::from)
            .and_then(|_| Manifest::parse(&bytes));
        match parsed {
            Ok(manifest) => Some(Arc::new(manifest)),
            Err(e) => {
                if self.diagnostics {
                    warn!(archive = %self.shared.location, error = %e, "ignoring malformed manifest");
                }
                None
            }
        }
    }

    fn resolve_class_path(&self, manifest: &Manifest) -> Vec<Location> {
        let base = &self.shared.location;
        manifest
            .class_path()
            .into_iter()
            .filter_map(|token| {
                let resolved = base.resolve_manifest_token(token);
                if resolved.is_none() && self.diagnostics {
                    warn!(archive = %base, token, "dropping Class-Path entry");
                }
                resolved
            })
            .collect()
    }
}

impl LoaderUnit for ArchiveUnit {
    fn location(&self) -> &Location {
        &self.shared.location
    }

    fn get_resource(&self, name: &str) -> ClasspathResult<Option<Resource>> {
        let location = &self.shared.location;
        self.with_open(|archive| {
            let Some(index) = archive.zip.index_for_name(name) else {
                return Ok(None);
            };
            let size = archive
                .zip
                .by_index(index)
                .map_err(|e| zip_error(location, e))?
                .size();
            Ok(Some(Resource::archive_entry(
                name,
                Arc::clone(&self.shared),
                size,
                archive.manifest.clone(),
            )))
        })
    }

    fn extension_class_path(&self) -> ClasspathResult<Vec<Location>> {
        self.with_open(|archive| Ok(archive.class_path.clone()))
    }

    fn entries(&self) -> ClasspathResult<Vec<String>> {
        self.with_open(|archive| {
            let mut names: Vec<String> = archive
                .zip
                .file_names()
                .filter(|name| !name.ends_with('/'))
                .map(String::from)
                .collect();
            names.sort();
            Ok(names)
        })
    }

    fn close(&self) -> ClasspathResult<()> {
        let previous = std::mem::replace(&mut *self.shared.slot.lock(), Slot::Closed);
        if let Slot::Open(archive) = previous {
            debug!(archive = %self.shared.location, "closing archive");
            drop(archive);
        }
        Ok(())
    }
}

fn zip_error(location: &Location, error: ZipError) -> ClasspathError {
    match error {
        ZipError::Io(e) => ClasspathError::Io(e),
        other => ClasspathError::InvalidArchive {
            location: location.clone(),
            reason: other.to_string(),
        },
    }
}
