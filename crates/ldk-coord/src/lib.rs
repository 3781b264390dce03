//! Coordination of concurrent loads by name.
//!
//! A [`LoadingCoordinator`] wraps each load of a name so that two threads
//! never load the same name for the same owner at once. Parallel mode uses a
//! reentrant lock per name from a [`ParallelLockMap`]; legacy mode tracks
//! which thread is loading each name and reports circular loads.
//!
//! # Modules
//!
//! - [`coordinator`] — the [`LoadingCoordinator`]
//! - [`lock_map`] — per-name reentrant locks
//! - [`interrupt`] — per-thread interrupt flags honoured by legacy waits
//! - [`config`] — [`CoordinatorConfig`] and [`LockingMode`]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod interrupt;
pub mod lock_map;

pub use config::{CoordinatorConfig, LockingMode};
pub use coordinator::LoadingCoordinator;
pub use error::{CoordError, CoordResult};
pub use interrupt::{current_interrupt, InterruptHandle};
pub use lock_map::ParallelLockMap;
