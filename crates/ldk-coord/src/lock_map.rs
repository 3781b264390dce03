use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

/// A lazily populated map of one reentrant lock per name.
///
/// Locks are created on first request and kept for the life of the map, so
/// every caller asking for the same name gets the same lock.
#[derive(Debug, Default)]
pub struct ParallelLockMap {
    locks: Mutex<HashMap<String, Arc<ReentrantMutex<()>>>>,
}

impl ParallelLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `name`.
    pub fn lock_for(&self, name: &str) -> Arc<ReentrantMutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(ReentrantMutex::new(()))),
        )
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
