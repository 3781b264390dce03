use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::config::{CoordinatorConfig, LockingMode};
use crate::error::{CoordError, CoordResult};
use crate::interrupt::current_interrupt;
use crate::lock_map::ParallelLockMap;

/// Serializes loads of the same name for one owner.
///
/// In [`LockingMode::Parallel`] each name has its own reentrant lock, and a
/// thread may load a name again while already loading it.
///
/// In [`LockingMode::Legacy`] each name has a slot recording the thread
/// currently loading it. A second thread waits for the slot to be vacated;
/// the same thread asking again is a circular load and fails. Waiting
/// tolerates interruption: the interrupt is remembered, the wait goes on,
/// and the flag is set again once the slot has been taken.
pub struct LoadingCoordinator {
    config: CoordinatorConfig,
    locks: ParallelLockMap,
    loading: Mutex<HashMap<String, ThreadId>>,
    vacated: Condvar,
}

impl LoadingCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            locks: ParallelLockMap::new(),
            loading: Mutex::new(HashMap::new()),
            vacated: Condvar::new(),
        }
    }

    pub fn parallel() -> Self {
        Self::new(CoordinatorConfig::default())
    }

    pub fn legacy() -> Self {
        Self::new(CoordinatorConfig::legacy())
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn mode(&self) -> LockingMode {
        self.config.mode
    }

    /// Run `load` for `name` under this coordinator's protocol.
    pub fn load<T, E>(&self, name: &str, load: impl FnOnce() -> Result<T, E>) -> CoordResult<T, E> {
        match self.config.mode {
            LockingMode::Parallel => {
                let lock = self.locks.lock_for(name);
                let _guard = lock.lock();
                load().map_err(CoordError::Load)
            }
            LockingMode::Legacy => {
                let _slot = self.claim(name)?;
                load().map_err(CoordError::Load)
            }
        }
    }

    /// The thread currently loading `name` in legacy mode.
    pub fn loading_thread(&self, name: &str) -> Option<ThreadId> {
        self.loading.lock().get(name).copied()
    }

    /// Number of names being loaded in legacy mode.
    pub fn in_flight(&self) -> usize {
        self.loading.lock().len()
    }

    fn claim<E>(&self, name: &str) -> CoordResult<Slot<'_>, E> {
        let me = thread::current().id();
        let interrupt = current_interrupt();
        let mut interrupted = false;

        let mut loading = self.loading.lock();
        loop {
            match loading.get(name).copied() {
                None => {
                    loading.insert(name.to_string(), me);
                    break;
                }
                Some(holder) if holder == me => {
                    debug!(name, "circular load detected");
                    return Err(CoordError::Circularity {
                        name: name.to_string(),
                    });
                }
                Some(holder) => {
                    trace!(name, holder = ?holder, "waiting for loading slot");
                    self.vacated.notify_all();
                    self.vacated.wait_for(&mut loading, self.config.wait_poll());
                    if interrupt.take_interrupt() {
                        interrupted = true;
                    }
                }
            }
        }
        drop(loading);

        if interrupted {
            interrupt.interrupt();
        }
        Ok(Slot {
            coordinator: self,
            name: name.to_string(),
        })
    }
}

impl Default for LoadingCoordinator {
    fn default() -> Self {
        Self::parallel()
    }
}

impl std::fmt::Debug for LoadingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingCoordinator")
            .field("mode", &self.config.mode)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// A claimed legacy slot. Vacates and wakes waiters on drop, including
/// when the load panics.
struct Slot<'a> {
    coordinator: &'a LoadingCoordinator,
    name: String,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        let mut loading = self.coordinator.loading.lock();
        loading.remove(&self.name);
        self.coordinator.vacated.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    type LoadErr = &'static str;

    fn fast_legacy() -> Arc<LoadingCoordinator> {
        Arc::new(LoadingCoordinator::new(CoordinatorConfig {
            mode: LockingMode::Legacy,
            wait_poll_ms: 5,
        }))
    }

    // -----------------------------------------------------------------------
    // Legacy mode
    // -----------------------------------------------------------------------

    #[test]
    fn nested_same_name_is_circular() {
        let coord = LoadingCoordinator::legacy();
        let result = coord.load("a.B", || {
            let inner = coord.load("a.B", || Ok::<_, LoadErr>(()));
            assert!(inner.as_ref().unwrap_err().is_circularity());
            Ok::<_, LoadErr>(7)
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(coord.in_flight(), 0);
    }

    #[test]
    fn nested_different_names_are_fine() {
        let coord = LoadingCoordinator::legacy();
        let result = coord.load("a.B", || {
            coord
                .load("a.C", || Ok::<_, LoadErr>("c"))
                .map_err(|_| "inner failed")
        });
        assert_eq!(result.unwrap(), "c");
    }

    #[test]
    fn failure_propagates_and_vacates() {
        let coord = LoadingCoordinator::legacy();
        let err = coord.load("a.B", || Err::<(), _>("broken")).unwrap_err();
        assert_eq!(err.into_load(), Some("broken"));
        assert!(coord.loading_thread("a.B").is_none());
        assert!(coord.load("a.B", || Ok::<_, LoadErr>(())).is_ok());
    }

    #[test]
    fn panic_vacates_slot() {
        let coord = LoadingCoordinator::legacy();
        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = coord.load("a.B", || -> Result<(), LoadErr> { panic!("boom") });
        }));
        assert!(caught.is_err());
        assert_eq!(coord.in_flight(), 0);
    }

    #[test]
    fn second_thread_waits_for_holder() {
        let coord = fast_legacy();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = mpsc::channel();

        let holder = {
            let coord = Arc::clone(&coord);
            let order = Arc::clone(&order);
            thread::spawn(move || {
                coord.load("a.B", || {
                    assert_eq!(coord.loading_thread("a.B"), Some(thread::current().id()));
                    entered_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(60));
                    order.lock().push("holder");
                    Ok::<_, LoadErr>(())
                })
            })
        };

        entered_rx.recv().unwrap();
        coord
            .load("a.B", || {
                order.lock().push("waiter");
                Ok::<_, LoadErr>(())
            })
            .unwrap();
        holder.join().unwrap().unwrap();
        assert_eq!(*order.lock(), vec!["holder", "waiter"]);
    }

    #[test]
    fn interrupt_during_wait_is_deferred() {
        let coord = fast_legacy();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (waiter_tx, waiter_rx) = mpsc::channel();

        let holder = {
            let coord = Arc::clone(&coord);
            thread::spawn(move || {
                coord.load("a.B", || {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok::<_, LoadErr>(())
                })
            })
        };
        entered_rx.recv().unwrap();

        let waiter = {
            let coord = Arc::clone(&coord);
            thread::spawn(move || {
                waiter_tx.send(current_interrupt()).unwrap();
                coord.load("a.B", || Ok::<_, LoadErr>(current_interrupt().is_interrupted()))
            })
        };

        let waiter_interrupt = waiter_rx.recv().unwrap();
        thread::sleep(Duration::from_millis(20));
        waiter_interrupt.interrupt();
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        release_tx.send(()).unwrap();
        holder.join().unwrap().unwrap();
        let saw_interrupt = waiter.join().unwrap().unwrap();
        assert!(saw_interrupt);
        assert!(waiter_interrupt.is_interrupted());
    }

    // -----------------------------------------------------------------------
    // Parallel mode
    // -----------------------------------------------------------------------

    #[test]
    fn parallel_allows_reentry() {
        let coord = LoadingCoordinator::parallel();
        let result = coord.load("a.B", || {
            coord.load("a.B", || Ok::<_, LoadErr>(1)).map_err(|_| "inner")
        });
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn parallel_serializes_same_name() {
        let coord = Arc::new(LoadingCoordinator::parallel());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let coord = Arc::clone(&coord);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    coord.load("a.B", || {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, LoadErr>(())
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn parallel_names_do_not_block_each_other() {
        let coord = Arc::new(LoadingCoordinator::parallel());
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let coord = Arc::clone(&coord);
            thread::spawn(move || {
                coord.load("a.B", || {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok::<_, LoadErr>(())
                })
            })
        };
        entered_rx.recv().unwrap();

        assert!(coord.load("a.C", || Ok::<_, LoadErr>(())).is_ok());
        release_tx.send(()).unwrap();
        holder.join().unwrap().unwrap();
    }
}
