use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::library::NativeLibrary;
use crate::owner::OwnerId;

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

struct TableEntry {
    owner: OwnerId,
    record: Weak<NativeLibrary>,
}

type Entries = HashMap<String, TableEntry>;

/// The set of registered native library names.
///
/// Every [`NativeLibraryRegistry`](crate::NativeLibraryRegistry) sharing one
/// table sees the same names: a name registered to one owner cannot be
/// opened for another until the first owner unloads it. Share it with
/// `Arc`; separate tables are fully independent.
///
/// The lock is reentrant so a library's load hook can call back into the
/// registry from the thread that holds it.
pub struct LibraryTable {
    id: u64,
    entries: ReentrantMutex<RefCell<Entries>>,
}

impl LibraryTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            entries: ReentrantMutex::new(RefCell::new(HashMap::new())),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().lookup(name).is_some()
    }

    /// The owner `name` is registered to.
    pub fn owner_of(&self, name: &str) -> Option<OwnerId> {
        self.lock().lookup(name).map(|(owner, _)| owner)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let guard = self.entries.lock();
        let entries = guard.borrow();
        let mut names: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.record.strong_count() > 0)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn lock(&self) -> TableGuard<'_> {
        TableGuard {
            entries: self.entries.lock(),
        }
    }
}

impl std::fmt::Debug for LibraryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryTable")
            .field("id", &self.id)
            .field("names", &self.names())
            .finish()
    }
}

/// Held across a whole load or unload. Each accessor borrows the map only
/// for its own duration, so the guard can stay alive while the platform
/// open runs and re-enters.
pub(crate) struct TableGuard<'a> {
    entries: ReentrantMutexGuard<'a, RefCell<Entries>>,
}

impl TableGuard<'_> {
    /// The owner and live record registered under `name`. Entries whose
    /// record is gone are purged.
    pub(crate) fn lookup(&self, name: &str) -> Option<(OwnerId, Arc<NativeLibrary>)> {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.get(name)?;
        match entry.record.upgrade() {
            Some(record) => Some((entry.owner, record)),
            None => {
                entries.remove(name);
                None
            }
        }
    }

    pub(crate) fn insert(&self, record: &Arc<NativeLibrary>) {
        self.entries.borrow_mut().insert(
            record.name().to_string(),
            TableEntry {
                owner: record.owner(),
                record: Arc::downgrade(record),
            },
        );
    }

    /// Remove `name` if it is registered to `record`.
    pub(crate) fn remove(&self, record: &NativeLibrary) -> bool {
        let mut entries = self.entries.borrow_mut();
        let matches = entries
            .get(record.name())
            .is_some_and(|entry| std::ptr::eq(entry.record.as_ptr(), record));
        if matches {
            entries.remove(record.name());
        }
        matches
    }
}
