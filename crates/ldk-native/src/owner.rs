use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::library::NativeLibrary;

static NEXT_OWNER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an owning context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(u64);

impl OwnerId {
    fn next() -> Self {
        Self(NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifetime class of an owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// Lives for the whole process; its libraries are never unloaded and it
    /// only searches system paths.
    System,
    /// Unloads its libraries when dropped.
    Collectible,
}

/// Hook mapping a logical library name to an absolute file path.
pub type LibraryFinder = Box<dyn Fn(&str) -> Option<PathBuf> + Send + Sync>;

/// The context on whose behalf native libraries are loaded.
///
/// Libraries loaded for an owner stay registered to it until the owner is
/// dropped. Dropping a collectible owner unloads each of its libraries and
/// frees their names in the shared table.
pub struct Owner {
    id: OwnerId,
    name: String,
    kind: OwnerKind,
    libraries: Mutex<Vec<Arc<NativeLibrary>>>,
    library_finder: Option<LibraryFinder>,
}

impl Owner {
    /// A collectible owner.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, OwnerKind::Collectible)
    }

    /// A system owner.
    pub fn system(name: impl Into<String>) -> Self {
        Self::with_kind(name, OwnerKind::System)
    }

    pub fn with_kind(name: impl Into<String>, kind: OwnerKind) -> Self {
        Self {
            id: OwnerId::next(),
            name: name.into(),
            kind,
            libraries: Mutex::new(Vec::new()),
            library_finder: None,
        }
    }

    /// Install a hook consulted before the search path.
    pub fn with_library_finder(
        mut self,
        finder: impl Fn(&str) -> Option<PathBuf> + Send + Sync + 'static,
    ) -> Self {
        self.library_finder = Some(Box::new(finder));
        self
    }

    pub fn id(&self) -> OwnerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OwnerKind {
        self.kind
    }

    pub fn is_system(&self) -> bool {
        self.kind == OwnerKind::System
    }

    /// Libraries registered to this owner, in load order.
    pub fn libraries(&self) -> Vec<Arc<NativeLibrary>> {
        self.libraries.lock().clone()
    }

    /// Address of `symbol` in the first of this owner's libraries exporting
    /// it.
    pub fn find_symbol(&self, symbol: &str) -> Option<usize> {
        let libraries = self.libraries.lock();
        if libraries.is_empty() {
            return None;
        }
        libraries.iter().find_map(|library| library.symbol(symbol))
    }

    pub(crate) fn find_library_path(&self, name: &str) -> Option<PathBuf> {
        self.library_finder.as_ref().and_then(|finder| finder(name))
    }

    pub(crate) fn loaded(&self, name: &str) -> Option<Arc<NativeLibrary>> {
        self.libraries
            .lock()
            .iter()
            .find(|library| library.name() == name)
            .cloned()
    }

    pub(crate) fn register(&self, library: Arc<NativeLibrary>) {
        self.libraries.lock().push(library);
    }
}

impl Drop for Owner {
    fn drop(&mut self) {
        let libraries = std::mem::take(&mut *self.libraries.lock());
        if libraries.is_empty() {
            return;
        }

        match self.kind {
            OwnerKind::System => {
                debug!(owner = %self.id, count = libraries.len(), "system owner dropped; libraries stay loaded");
                std::mem::forget(libraries);
            }
            OwnerKind::Collectible => {
                for library in libraries.iter().rev() {
                    if let Err(e) = library.unload() {
                        warn!(owner = %self.id, library = library.name(), error = %e, "failed to unload native library");
                    }
                }
            }
        }
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("libraries", &self.libraries.lock().len())
            .field("library_finder", &self.library_finder.is_some())
            .finish()
    }
}
