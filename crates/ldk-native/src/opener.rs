//! The platform seam: opening, probing and closing shared libraries.

use std::collections::HashSet;
use std::ffi::c_void;

use libloading::Library;
use tracing::debug;

use crate::error::{NativeError, NativeResult};
use crate::search::library_base_name;

/// Export called after a library is opened. A non-zero return fails the load.
pub const ON_LOAD_SYMBOL: &str = "ldk_on_load";

/// Export called before a library is closed.
pub const ON_UNLOAD_SYMBOL: &str = "ldk_on_unload";

type HookFn = unsafe extern "C" fn() -> i32;
type UnloadFn = unsafe extern "C" fn();

/// Opens libraries on behalf of a registry.
///
/// Implementations are called with the registry's table lock held, and may
/// re-enter the registry from the same thread.
pub trait LibraryOpener: Send + Sync {
    /// Open the library identified by `name`: a canonical file path, or a
    /// builtin name when `builtin` is set.
    fn open(&self, name: &str, builtin: bool) -> NativeResult<Box<dyn LibraryHandle>>;

    /// The builtin library name for a platform file name, if that library is
    /// linked into the executable.
    fn find_builtin(&self, _file_name: &str) -> Option<String> {
        None
    }
}

/// An open library.
pub trait LibraryHandle: Send {
    /// Address of an exported symbol.
    fn symbol(&self, name: &str) -> Option<usize>;

    /// Close the library. Consumes the handle so it can only happen once.
    fn close(self: Box<Self>) -> NativeResult<()>;
}

/// [`LibraryOpener`] backed by the operating system's dynamic loader.
#[derive(Clone, Debug, Default)]
pub struct DylibOpener {
    builtins: HashSet<String>,
}

impl DylibOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `names` as linked into the executable.
    pub fn with_builtins<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            builtins: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl LibraryOpener for DylibOpener {
    fn open(&self, name: &str, builtin: bool) -> NativeResult<Box<dyn LibraryHandle>> {
        let open_error = |reason: String| NativeError::Open {
            name: name.to_string(),
            reason,
        };

        let library = if builtin {
            open_self().map_err(|e| open_error(e.to_string()))?
        } else {
            // SAFETY: loading a library runs its initializers; callers only
            // hand us files found on the configured search path.
            unsafe { Library::new(name) }.map_err(|e| open_error(e.to_string()))?
        };

        let (on_load, on_unload) = if builtin {
            (format!("{ON_LOAD_SYMBOL}_{name}"), format!("{ON_UNLOAD_SYMBOL}_{name}"))
        } else {
            (ON_LOAD_SYMBOL.to_string(), ON_UNLOAD_SYMBOL.to_string())
        };

        // SAFETY: the hook signature is part of the library contract.
        if let Ok(hook) = unsafe { library.get::<HookFn>(on_load.as_bytes()) } {
            let code = unsafe { hook() };
            if code != 0 {
                return Err(open_error(format!("{on_load} returned {code}")));
            }
        }

        debug!(library = name, builtin, "opened native library");
        Ok(Box::new(DylibHandle {
            name: name.to_string(),
            library,
            on_unload,
        }))
    }

    fn find_builtin(&self, file_name: &str) -> Option<String> {
        let base = library_base_name(file_name)?;
        self.builtins.contains(base).then(|| base.to_string())
    }
}

#[cfg(unix)]
fn open_self() -> Result<Library, libloading::Error> {
    Ok(libloading::os::unix::Library::this().into())
}

#[cfg(windows)]
fn open_self() -> Result<Library, libloading::Error> {
    libloading::os::windows::Library::this().map(Into::into)
}

struct DylibHandle {
    name: String,
    library: Library,
    on_unload: String,
}

impl LibraryHandle for DylibHandle {
    fn symbol(&self, name: &str) -> Option<usize> {
        // SAFETY: the pointer is returned as an address and never dereferenced here.
        let symbol = unsafe { self.library.get::<*const c_void>(name.as_bytes()) }.ok()?;
        Some(*symbol as usize)
    }

    fn close(self: Box<Self>) -> NativeResult<()> {
        let DylibHandle {
            name,
            library,
            on_unload,
        } = *self;

        // SAFETY: see ON_UNLOAD_SYMBOL.
        if let Ok(hook) = unsafe { library.get::<UnloadFn>(on_unload.as_bytes()) } {
            unsafe { hook() };
        }

        library.close().map_err(|e| NativeError::Close {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        debug!(library = %name, "closed native library");
        Ok(())
    }
}
