//! Scripted opener shared by the unit tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{NativeError, NativeResult};
use crate::opener::{LibraryHandle, LibraryOpener};
use crate::search::{file_name_of, library_base_name};

type Hook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Counters {
    opens: AtomicUsize,
    closes: AtomicUsize,
}

#[derive(Default)]
struct Hooks {
    on_open: Option<Hook>,
    on_close: Option<Hook>,
}

/// Opens nothing real. Each library exports `<base>_entry`, where `<base>`
/// is the logical name recovered from the file name.
#[derive(Default)]
pub(crate) struct ScriptedOpener {
    counters: Arc<Counters>,
    hooks: Arc<Mutex<Hooks>>,
    failing: HashSet<String>,
    builtins: HashSet<String>,
}

impl ScriptedOpener {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(mut self, base: &str) -> Self {
        self.failing.insert(base.to_string());
        self
    }

    pub(crate) fn with_builtin(mut self, base: &str) -> Self {
        self.builtins.insert(base.to_string());
        self
    }

    pub(crate) fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    /// Run `hook` inside every open, after it is counted.
    pub(crate) fn on_open(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        self.hooks.lock().on_open = Some(Arc::new(hook));
    }

    /// Run `hook` inside every close, before it is counted.
    pub(crate) fn on_close(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        self.hooks.lock().on_close = Some(Arc::new(hook));
    }

    /// Drop installed hooks, releasing whatever they captured.
    pub(crate) fn clear_hooks(&self) {
        *self.hooks.lock() = Hooks::default();
    }
}

fn base_of(name: &str) -> String {
    let file = file_name_of(Path::new(name));
    library_base_name(&file).unwrap_or(file.as_str()).to_string()
}

impl LibraryOpener for ScriptedOpener {
    fn open(&self, name: &str, _builtin: bool) -> NativeResult<Box<dyn LibraryHandle>> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        let hook = self.hooks.lock().on_open.clone();
        if let Some(hook) = hook {
            hook(name);
        }

        let base = base_of(name);
        if self.failing.contains(&base) {
            return Err(NativeError::Open {
                name: name.to_string(),
                reason: "scripted failure".into(),
            });
        }
        Ok(Box::new(ScriptedHandle {
            name: name.to_string(),
            export: format!("{base}_entry"),
            address: 0x1000 * self.opens(),
            counters: Arc::clone(&self.counters),
            hooks: Arc::clone(&self.hooks),
        }))
    }

    fn find_builtin(&self, file_name: &str) -> Option<String> {
        let base = library_base_name(file_name)?;
        self.builtins.contains(base).then(|| base.to_string())
    }
}

struct ScriptedHandle {
    name: String,
    export: String,
    address: usize,
    counters: Arc<Counters>,
    hooks: Arc<Mutex<Hooks>>,
}

impl LibraryHandle for ScriptedHandle {
    fn symbol(&self, name: &str) -> Option<usize> {
        (name == self.export).then_some(self.address)
    }

    fn close(self: Box<Self>) -> NativeResult<()> {
        let hook = self.hooks.lock().on_close.clone();
        if let Some(hook) = hook {
            hook(&self.name);
        }
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
