use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::NativeConfig;
use crate::context::{self, ContextKind, Frame, LoadContext};
use crate::error::{NativeError, NativeResult};
use crate::library::NativeLibrary;
use crate::opener::{DylibOpener, LibraryOpener};
use crate::owner::Owner;
use crate::search::{file_name_of, LibrarySearchPath};
use crate::table::LibraryTable;

/// Loads native libraries on behalf of owners.
///
/// Library names move through `unregistered → opening → registered →
/// unloading → unregistered`. The name set lives in the shared
/// [`LibraryTable`], and the table lock is held across the platform open, so
/// at most one owner can ever register a given name.
pub struct NativeLibraryRegistry {
    table: Arc<LibraryTable>,
    opener: Arc<dyn LibraryOpener>,
    search: LibrarySearchPath,
}

impl NativeLibraryRegistry {
    pub fn new(
        table: Arc<LibraryTable>,
        opener: Arc<dyn LibraryOpener>,
        search: LibrarySearchPath,
    ) -> Self {
        Self {
            table,
            opener,
            search,
        }
    }

    /// A registry using the platform loader, configured from `config`.
    pub fn with_config(table: Arc<LibraryTable>, config: &NativeConfig) -> Self {
        Self::new(
            table,
            Arc::new(DylibOpener::with_builtins(config.builtins.iter().cloned())),
            LibrarySearchPath::from_config(config),
        )
    }

    pub fn table(&self) -> &Arc<LibraryTable> {
        &self.table
    }

    pub fn search_path(&self) -> &LibrarySearchPath {
        &self.search
    }

    /// Load the library `name` for `owner`.
    ///
    /// An absolute `name` is opened directly. Otherwise the owner's library
    /// finder is asked first, then each system directory, then, for
    /// collectible owners only, each user directory.
    pub fn load_library(&self, owner: &Owner, name: &str) -> NativeResult<Arc<NativeLibrary>> {
        let not_found = || NativeError::NotFound {
            name: name.to_string(),
        };

        let direct = Path::new(name);
        if direct.is_absolute() {
            return self.load(owner, direct)?.ok_or_else(not_found);
        }

        if let Some(found) = owner.find_library_path(name) {
            if !found.is_absolute() {
                return Err(NativeError::NotAbsolute {
                    name: name.to_string(),
                    path: found,
                });
            }
            return self.load(owner, &found)?.ok_or_else(not_found);
        }

        for candidate in self.search.candidates(name, !owner.is_system()) {
            trace!(library = name, candidate = %candidate.display(), "probing");
            if let Some(library) = self.load(owner, &candidate)? {
                return Ok(library);
            }
        }
        Err(not_found())
    }

    /// Load the library file at `path` for `owner`.
    ///
    /// Returns `Ok(None)` when the file does not exist and is not a builtin.
    /// Loading a library the owner already holds returns the same record
    /// without opening it again.
    pub fn load(&self, owner: &Owner, path: &Path) -> NativeResult<Option<Arc<NativeLibrary>>> {
        let builtin = self.opener.find_builtin(&file_name_of(path));
        let name = match &builtin {
            Some(name) => name.clone(),
            None => match std::fs::canonicalize(path) {
                Ok(canonical) if canonical.is_file() => canonical.to_string_lossy().into_owned(),
                _ => return Ok(None),
            },
        };

        if let Some(library) = owner.loaded(&name) {
            return Ok(Some(library));
        }

        let table = self.table.lock();
        if let Some((holder, library)) = table.lookup(&name) {
            if holder == owner.id() {
                return Ok(Some(library));
            }
            return Err(NativeError::AlreadyLoadedElsewhere {
                name,
                owner: holder,
            });
        }

        if let Some(frame) = context::find(self.table.id(), &name) {
            let context = frame.context().clone();
            return match context.kind {
                ContextKind::Unload => Err(NativeError::UnloadInProgress { name }),
                ContextKind::Load if context.owner == owner.id() => {
                    trace!(library = %name, "reentrant load");
                    Ok(frame.into_record())
                }
                ContextKind::Load => Err(NativeError::InProgressElsewhere {
                    name,
                    owner: context.owner,
                }),
            };
        }

        let library = Arc::new(NativeLibrary::opening(
            name,
            owner.id(),
            builtin.is_some(),
            Arc::clone(&self.table),
        ));
        let opened = {
            let _frame = context::push(Frame::load(self.table.id(), &library));
            self.opener.open(library.name(), library.is_builtin())
        };
        let handle = opened?;

        library.set_loaded(handle);
        table.insert(&library);
        owner.register(Arc::clone(&library));
        debug!(
            library = library.name(),
            owner = %owner.id(),
            builtin = library.is_builtin(),
            "registered native library"
        );
        Ok(Some(library))
    }

    /// Address of `symbol` in one of `owner`'s libraries.
    pub fn find(&self, owner: &Owner, symbol: &str) -> Option<usize> {
        owner.find_symbol(symbol)
    }

    /// The innermost load or unload this thread is performing against this
    /// registry's table.
    pub fn current_context(&self) -> Option<LoadContext> {
        context::current(self.table.id())
    }
}

impl std::fmt::Debug for NativeLibraryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibraryRegistry")
            .field("table", &self.table.id())
            .field("search", &self.search)
            .finish()
    }
}
