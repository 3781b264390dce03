//! Per-thread stack of in-flight loads and unloads.
//!
//! A thread pushes a frame before calling into the platform open or close
//! and pops it afterwards. A request arriving on the same thread while the
//! frame is live is a reentrant call from the library's own hooks.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::library::NativeLibrary;
use crate::owner::OwnerId;

/// What the thread is doing with a library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextKind {
    Load,
    Unload,
}

/// A view of one in-flight operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadContext {
    pub name: String,
    pub owner: OwnerId,
    pub kind: ContextKind,
}

#[derive(Clone)]
pub(crate) struct Frame {
    table: u64,
    context: LoadContext,
    record: Option<Arc<NativeLibrary>>,
}

impl Frame {
    pub(crate) fn load(table: u64, record: &Arc<NativeLibrary>) -> Self {
        Self {
            table,
            context: LoadContext {
                name: record.name().to_string(),
                owner: record.owner(),
                kind: ContextKind::Load,
            },
            record: Some(Arc::clone(record)),
        }
    }

    pub(crate) fn unload(table: u64, name: &str, owner: OwnerId) -> Self {
        Self {
            table,
            context: LoadContext {
                name: name.to_string(),
                owner,
                kind: ContextKind::Unload,
            },
            record: None,
        }
    }

    pub(crate) fn context(&self) -> &LoadContext {
        &self.context
    }

    pub(crate) fn into_record(self) -> Option<Arc<NativeLibrary>> {
        self.record
    }
}

thread_local! {
    static STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Pops its frame when dropped. Not `Send`: it must be dropped on the thread
/// that pushed it.
pub(crate) struct FrameGuard {
    _thread: PhantomData<*const ()>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        STACK.with_borrow_mut(|stack| {
            stack.pop();
        });
    }
}

pub(crate) fn push(frame: Frame) -> FrameGuard {
    STACK.with_borrow_mut(|stack| stack.push(frame));
    FrameGuard {
        _thread: PhantomData,
    }
}

/// Innermost frame for `name` in `table`.
pub(crate) fn find(table: u64, name: &str) -> Option<Frame> {
    STACK.with_borrow(|stack| {
        stack
            .iter()
            .rev()
            .find(|frame| frame.table == table && frame.context.name == name)
            .cloned()
    })
}

/// Innermost frame in `table`.
pub(crate) fn current(table: u64) -> Option<LoadContext> {
    STACK.with_borrow(|stack| {
        stack
            .iter()
            .rev()
            .find(|frame| frame.table == table)
            .map(|frame| frame.context.clone())
    })
}
