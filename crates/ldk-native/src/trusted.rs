use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{NativeError, NativeResult};
use crate::opener::{DylibOpener, LibraryHandle, LibraryOpener};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// A library opened through a [`TrustedNativeLibraryRegistry`].
pub struct TrustedLibrary {
    path: PathBuf,
    registry: u64,
    handle: Mutex<Option<Box<dyn LibraryHandle>>>,
}

impl TrustedLibrary {
    /// Canonical absolute path of the library.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.lock().is_some()
    }

    pub fn symbol(&self, symbol: &str) -> Option<usize> {
        self.handle.lock().as_ref().and_then(|handle| handle.symbol(symbol))
    }
}

impl fmt::Debug for TrustedLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustedLibrary")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Path-keyed library registry for explicitly managed libraries.
///
/// No owners, no shared name table and no reentrancy tracking: loads are
/// memoized per instance and stay open until [`unload`](Self::unload) is
/// called with the handle this instance returned.
pub struct TrustedNativeLibraryRegistry {
    id: u64,
    opener: Arc<dyn LibraryOpener>,
    libraries: Mutex<HashMap<PathBuf, Arc<TrustedLibrary>>>,
}

impl TrustedNativeLibraryRegistry {
    pub fn new(opener: Arc<dyn LibraryOpener>) -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            opener,
            libraries: Mutex::new(HashMap::new()),
        }
    }

    /// A registry using the platform loader.
    pub fn dylib() -> Self {
        Self::new(Arc::new(DylibOpener::new()))
    }

    /// Open the library at the absolute `path`, or return the handle from an
    /// earlier load of the same file.
    pub fn load(&self, path: &Path) -> NativeResult<Arc<TrustedLibrary>> {
        let name = path.display().to_string();
        if !path.is_absolute() {
            return Err(NativeError::NotAbsolute {
                name,
                path: path.to_path_buf(),
            });
        }
        let canonical = std::fs::canonicalize(path).map_err(|_| NativeError::NotFound { name })?;

        let mut libraries = self.libraries.lock();
        if let Some(existing) = libraries.get(&canonical) {
            return Ok(Arc::clone(existing));
        }

        let handle = self.opener.open(&canonical.to_string_lossy(), false)?;
        let library = Arc::new(TrustedLibrary {
            path: canonical.clone(),
            registry: self.id,
            handle: Mutex::new(Some(handle)),
        });
        libraries.insert(canonical, Arc::clone(&library));
        debug!(library = %library.path.display(), "opened trusted native library");
        Ok(library)
    }

    /// Close a library previously returned by [`load`](Self::load) on this
    /// instance.
    pub fn unload(&self, library: &Arc<TrustedLibrary>) -> NativeResult<()> {
        if library.registry != self.id {
            return Err(NativeError::ForeignHandle {
                path: library.path.clone(),
            });
        }

        {
            let mut libraries = self.libraries.lock();
            match libraries.get(&library.path) {
                Some(current) if Arc::ptr_eq(current, library) => {
                    libraries.remove(&library.path);
                }
                _ => {
                    return Err(NativeError::Unloaded {
                        name: library.path.display().to_string(),
                    })
                }
            }
        }

        let handle = library.handle.lock().take();
        match handle {
            Some(handle) => {
                debug!(library = %library.path.display(), "closing trusted native library");
                handle.close()
            }
            None => Err(NativeError::Unloaded {
                name: library.path.display().to_string(),
            }),
        }
    }

    /// Address of `symbol` in any loaded library.
    pub fn find(&self, symbol: &str) -> Option<usize> {
        self.libraries
            .lock()
            .values()
            .find_map(|library| library.symbol(symbol))
    }

    /// Paths of the loaded libraries, sorted.
    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.libraries.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl fmt::Debug for TrustedNativeLibraryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustedNativeLibraryRegistry")
            .field("id", &self.id)
            .field("libraries", &self.loaded_paths())
            .finish()
    }
}
