use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::context::{self, Frame};
use crate::error::NativeResult;
use crate::opener::LibraryHandle;
use crate::owner::OwnerId;
use crate::table::LibraryTable;

enum LibraryState {
    Opening,
    Loaded(Box<dyn LibraryHandle>),
    Unloaded,
}

/// A native library registered to an owner.
///
/// The record outlives the library itself: once its owner is dropped the
/// library is closed and [`symbol`](Self::symbol) returns `None`.
pub struct NativeLibrary {
    name: String,
    owner: OwnerId,
    builtin: bool,
    table: Arc<LibraryTable>,
    state: Mutex<LibraryState>,
}

impl NativeLibrary {
    pub(crate) fn opening(name: String, owner: OwnerId, builtin: bool, table: Arc<LibraryTable>) -> Self {
        Self {
            name,
            owner,
            builtin,
            table,
            state: Mutex::new(LibraryState::Opening),
        }
    }

    /// Canonical name: the resolved file path, or the builtin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.lock(), LibraryState::Loaded(_))
    }

    /// Address of an exported symbol. `None` while the library is still
    /// opening or after it has been unloaded.
    pub fn symbol(&self, symbol: &str) -> Option<usize> {
        match &*self.state.lock() {
            LibraryState::Loaded(handle) => handle.symbol(symbol),
            LibraryState::Opening | LibraryState::Unloaded => None,
        }
    }

    pub(crate) fn set_loaded(&self, handle: Box<dyn LibraryHandle>) {
        *self.state.lock() = LibraryState::Loaded(handle);
    }

    /// Drop the name from the table and close the library.
    ///
    /// Runs under the table lock with an unload frame pushed, so a hook
    /// calling back into the registry sees the unload. A second call is a
    /// no-op.
    pub(crate) fn unload(&self) -> NativeResult<()> {
        let table = self.table.lock();
        let handle = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, LibraryState::Unloaded) {
                LibraryState::Loaded(handle) => handle,
                LibraryState::Opening | LibraryState::Unloaded => return Ok(()),
            }
        };

        table.remove(self);
        let _frame = context::push(Frame::unload(self.table.id(), &self.name, self.owner));
        debug!(library = %self.name, owner = %self.owner, "unloading native library");
        handle.close()
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("builtin", &self.builtin)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
