//! Cooperative thread interruption.
//!
//! Each thread has one interrupt flag. Any thread holding the flag's
//! [`InterruptHandle`] may set it; the owning thread polls or clears it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

thread_local! {
    static CURRENT: InterruptHandle = InterruptHandle::default();
}

/// Shared handle to one thread's interrupt flag.
#[derive(Clone, Debug, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    /// Set the flag.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag, returning whether it was set.
    pub fn take_interrupt(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

/// The calling thread's interrupt handle.
pub fn current_interrupt() -> InterruptHandle {
    CURRENT.with(Clone::clone)
}
