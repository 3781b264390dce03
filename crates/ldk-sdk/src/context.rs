use std::path::{Path, PathBuf};
use std::sync::Arc;

use ldk_classpath::{ClasspathError, ClasspathResolver, Resource, ResourceIter};
use ldk_coord::LoadingCoordinator;
use ldk_native::{
    DylibOpener, LibraryOpener, LibrarySearchPath, LibraryTable, NativeError, NativeLibrary,
    NativeLibraryRegistry, Owner, OwnerKind,
};
use ldk_types::{binary_name_to_resource, Location};
use tracing::debug;

use crate::config::SdkConfig;
use crate::error::{SdkError, SdkResult};

/// Bytes of a class located on the classpath.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedClass {
    pub binary_name: String,
    pub origin: Location,
    pub bytes: Vec<u8>,
}

/// A search path element as handed to the builder. Classpath strings are
/// split in [`LoadingContextBuilder::build`], under the final config.
enum PathEntry {
    Location(Location),
    Classpath(String),
}

/// Builder for [`LoadingContext`].
pub struct LoadingContextBuilder {
    name: String,
    kind: OwnerKind,
    config: SdkConfig,
    entries: Vec<PathEntry>,
    table: Option<Arc<LibraryTable>>,
    opener: Option<Arc<dyn LibraryOpener>>,
    library_finder: Option<Box<dyn Fn(&str) -> Option<PathBuf> + Send + Sync>>,
}

impl LoadingContextBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: OwnerKind::Collectible,
            config: SdkConfig::default(),
            entries: Vec::new(),
            table: None,
            opener: None,
            library_finder: None,
        }
    }

    /// Replace the configuration.
    pub fn config(mut self, config: SdkConfig) -> Self {
        self.config = config;
        self
    }

    /// Make the owner a system owner: its libraries are never unloaded and
    /// user library paths are not searched.
    pub fn system(mut self) -> Self {
        self.kind = OwnerKind::System;
        self
    }

    pub fn location(mut self, location: Location) -> Self {
        self.entries.push(PathEntry::Location(location));
        self
    }

    pub fn locations(mut self, locations: impl IntoIterator<Item = Location>) -> Self {
        self.entries.extend(locations.into_iter().map(PathEntry::Location));
        self
    }

    /// Append the elements of a platform classpath string. Elements that do
    /// not parse are skipped, and logged only in diagnostic mode.
    pub fn classpath(mut self, classpath: &str) -> Self {
        self.entries.push(PathEntry::Classpath(classpath.to_string()));
        self
    }

    /// Share a library name table with other contexts. Without one the
    /// context gets a private table.
    pub fn table(mut self, table: Arc<LibraryTable>) -> Self {
        self.table = Some(table);
        self
    }

    /// Replace the platform loader.
    pub fn opener(mut self, opener: Arc<dyn LibraryOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn library_finder(
        mut self,
        finder: impl Fn(&str) -> Option<PathBuf> + Send + Sync + 'static,
    ) -> Self {
        self.library_finder = Some(Box::new(finder));
        self
    }

    pub fn build(self) -> LoadingContext {
        let mut owner = Owner::with_kind(self.name, self.kind);
        if let Some(finder) = self.library_finder {
            owner = owner.with_library_finder(finder);
        }

        let table = self.table.unwrap_or_else(LibraryTable::new);
        let opener = self.opener.unwrap_or_else(|| {
            Arc::new(DylibOpener::with_builtins(self.config.native.builtins.iter().cloned()))
        });
        let natives = NativeLibraryRegistry::new(
            table,
            opener,
            LibrarySearchPath::from_config(&self.config.native),
        );

        let mut locations = Vec::new();
        for entry in self.entries {
            match entry {
                PathEntry::Location(location) => locations.push(location),
                PathEntry::Classpath(classpath) => locations.extend(
                    ClasspathResolver::classpath_locations(&classpath, &self.config.resolver),
                ),
            }
        }

        debug!(owner = owner.name(), locations = locations.len(), "built loading context");
        LoadingContext {
            resolver: ClasspathResolver::new(locations, self.config.resolver),
            coordinator: LoadingCoordinator::new(self.config.coordinator),
            natives,
            owner,
        }
    }
}

/// One owner with its classpath, load coordinator and native libraries.
///
/// Dropping the context drops its owner, which unloads the owner's native
/// libraries unless it is a system owner.
pub struct LoadingContext {
    owner: Owner,
    resolver: ClasspathResolver,
    coordinator: LoadingCoordinator,
    natives: NativeLibraryRegistry,
}

impl LoadingContext {
    pub fn builder(name: &str) -> LoadingContextBuilder {
        LoadingContextBuilder::new(name)
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn resolver(&self) -> &ClasspathResolver {
        &self.resolver
    }

    pub fn coordinator(&self) -> &LoadingCoordinator {
        &self.coordinator
    }

    pub fn natives(&self) -> &NativeLibraryRegistry {
        &self.natives
    }

    // ---- Resources ----

    pub fn find_resource(&self, name: &str) -> Option<Resource> {
        self.resolver.find_resource(name)
    }

    pub fn resources(&self, name: &str) -> ResourceIter<'_> {
        self.resolver.resources(name)
    }

    // ---- Classes ----

    /// Locate `binary_name` and hand its bytes to `define`, all while
    /// holding the coordinator's lock or slot for that name.
    pub fn load_class<T>(
        &self,
        binary_name: &str,
        define: impl FnOnce(&LoadedClass) -> SdkResult<T>,
    ) -> SdkResult<T> {
        if self.resolver.is_closed() {
            return Err(SdkError::Closed(self.owner.name().to_string()));
        }
        let resource_name = binary_name_to_resource(binary_name);

        let result = self.coordinator.load(binary_name, || {
            let resource = self
                .resolver
                .find_resource(&resource_name)
                .ok_or_else(|| SdkError::ClassNotFound(binary_name.to_string()))?;
            let class = LoadedClass {
                binary_name: binary_name.to_string(),
                origin: resource.origin().clone(),
                bytes: resource.bytes()?,
            };
            define(&class)
        });
        Ok(result?)
    }

    /// The bytes of `binary_name`.
    pub fn load_class_bytes(&self, binary_name: &str) -> SdkResult<LoadedClass> {
        self.load_class(binary_name, |class| Ok(class.clone()))
    }

    // ---- Native libraries ----

    /// Load a native library by logical name or absolute path.
    pub fn load_library(&self, name: &str) -> SdkResult<Arc<NativeLibrary>> {
        Ok(self.natives.load_library(&self.owner, name)?)
    }

    /// Load the native library file at `path`.
    pub fn load_library_file(&self, path: &Path) -> SdkResult<Arc<NativeLibrary>> {
        self.natives
            .load(&self.owner, path)?
            .ok_or_else(|| {
                SdkError::Native(NativeError::NotFound {
                    name: path.display().to_string(),
                })
            })
    }

    /// Address of `symbol` in this context's native libraries.
    pub fn find_symbol(&self, symbol: &str) -> Option<usize> {
        self.natives.find(&self.owner, symbol)
    }

    // ---- Lifecycle ----

    /// Close the classpath. Native libraries stay loaded until the context
    /// is dropped.
    pub fn close(&self) -> Vec<ClasspathError> {
        self.resolver.close()
    }
}

impl std::fmt::Debug for LoadingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingContext")
            .field("owner", &self.owner)
            .field("resolver", &self.resolver)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldk_native::{LibraryHandle, NativeResult};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_jar(path: &Path, entries: &[(&str, &[u8])], class_path: Option<&str>) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut writer = ZipWriter::new(std::fs::File::create(path).unwrap());
        if let Some(cp) = class_path {
            writer.start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default()).unwrap();
            write!(writer, "Manifest-Version: 1.0\r\nClass-Path: {cp}\r\n\r\n").unwrap();
        }
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    fn write_file(path: &Path, data: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    #[derive(Default)]
    struct CountingOpener {
        opens: AtomicUsize,
    }

    struct NullHandle;

    impl LibraryHandle for NullHandle {
        fn symbol(&self, name: &str) -> Option<usize> {
            (name == "entry").then_some(0x10)
        }

        fn close(self: Box<Self>) -> NativeResult<()> {
            Ok(())
        }
    }

    impl LibraryOpener for CountingOpener {
        fn open(&self, _name: &str, _builtin: bool) -> NativeResult<Box<dyn LibraryHandle>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NullHandle))
        }
    }

    // -----------------------------------------------------------------------
    // Classpath
    // -----------------------------------------------------------------------

    #[test]
    fn application_layout() {
        let root = tempfile::tempdir().unwrap();
        let app = root.path().join("app");
        write_jar(
            &app.join("lib/a.jar"),
            &[("com/example/Shared.class", b"a.jar copy")],
            Some("b.jar"),
        );
        write_jar(&app.join("lib/b.jar"), &[("com/example/OnlyB.class", b"b.jar copy")], None);
        write_file(&app.join("classes/com/example/Shared.class"), b"classes copy");

        let cx = LoadingContext::builder("app")
            .location(Location::local(app.join("lib/a.jar")))
            .location(Location::local(app.join("classes")))
            .build();

        let only_b = cx.load_class_bytes("com.example.OnlyB").unwrap();
        assert_eq!(only_b.bytes, b"b.jar copy");
        assert_eq!(only_b.origin, Location::local(app.join("lib/b.jar")));

        let shared = cx.load_class_bytes("com.example.Shared").unwrap();
        assert_eq!(shared.bytes, b"a.jar copy");

        assert!(matches!(
            cx.load_class_bytes("com.example.Missing"),
            Err(SdkError::ClassNotFound(_))
        ));
        assert_eq!(cx.resources("com/example/Shared.class").count(), 2);
    }

    #[test]
    fn classpath_string_builder() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("classes");
        write_file(&dir.join("r.txt"), b"r");

        let cx = LoadingContext::builder("cp")
            .classpath(&dir.to_string_lossy())
            .build();
        assert!(cx.find_resource("r.txt").is_some());
        assert_eq!(cx.resolver().search_path(), vec![Location::local(&dir)]);
    }

    #[test]
    fn builder_call_order_is_irrelevant() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("classes");
        let jar = root.path().join("a.jar");
        let sep = ldk_types::PATH_SEPARATOR;
        let cp = format!("{}{sep}", dir.display());

        let late = LoadingContext::builder("late")
            .location(Location::local(&jar))
            .classpath(&cp)
            .config(SdkConfig::legacy())
            .build();
        let early = LoadingContext::builder("early")
            .config(SdkConfig::legacy())
            .location(Location::local(&jar))
            .classpath(&cp)
            .build();

        let expected = vec![
            Location::local(&jar),
            Location::local(&dir),
            Location::parse(".").unwrap(),
        ];
        assert_eq!(late.resolver().search_path(), expected);
        assert_eq!(early.resolver().search_path(), expected);
    }

    struct LogSink(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for LogSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn captured_logs(f: impl FnOnce()) -> String {
        let buf = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || LogSink(Arc::clone(&sink)))
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buf.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn bad_classpath_elements_logged_only_with_diagnostics() {
        let root = tempfile::tempdir().unwrap();
        let sep = ldk_types::PATH_SEPARATOR;
        let cp = format!("   {sep}{}", root.path().display());

        let quiet = captured_logs(|| {
            let cx = LoadingContext::builder("quiet").classpath(&cp).build();
            assert_eq!(cx.resolver().search_path(), vec![Location::local(root.path())]);
        });
        assert!(!quiet.contains("skipping classpath element"), "{quiet}");

        let mut config = SdkConfig::default();
        config.resolver = config.resolver.with_diagnostics();
        let loud = captured_logs(|| {
            let cx = LoadingContext::builder("loud").classpath(&cp).config(config).build();
            assert_eq!(cx.resolver().search_path().len(), 1);
        });
        assert!(loud.contains("skipping classpath element"), "{loud}");
    }

    #[test]
    fn closed_context_refuses_classes() {
        let root = tempfile::tempdir().unwrap();
        write_file(&root.path().join("a/B.class"), b"b");
        let cx = LoadingContext::builder("c")
            .location(Location::local(root.path()))
            .build();

        assert!(cx.load_class_bytes("a.B").is_ok());
        assert!(cx.close().is_empty());
        assert!(cx.close().is_empty());
        assert!(matches!(cx.load_class_bytes("a.B"), Err(SdkError::Closed(_))));
        assert!(cx.find_resource("a/B.class").is_none());
    }

    #[test]
    fn legacy_nested_load_is_circular() {
        let root = tempfile::tempdir().unwrap();
        write_file(&root.path().join("a/B.class"), b"b");
        let cx = LoadingContext::builder("legacy")
            .config(SdkConfig::legacy())
            .location(Location::local(root.path()))
            .build();

        let err = cx
            .load_class("a.B", |_| cx.load_class_bytes("a.B").map(|_| ()))
            .unwrap_err();
        assert!(matches!(err, SdkError::Circularity(ref name) if name == "a.B"));
        assert!(cx.load_class_bytes("a.B").is_ok());
    }

    #[test]
    fn parallel_nested_load_is_allowed() {
        let root = tempfile::tempdir().unwrap();
        write_file(&root.path().join("a/B.class"), b"b");
        let cx = LoadingContext::builder("parallel")
            .location(Location::local(root.path()))
            .build();

        let inner = cx
            .load_class("a.B", |_| cx.load_class_bytes("a.B"))
            .unwrap();
        assert_eq!(inner.bytes, b"b");
    }

    // -----------------------------------------------------------------------
    // Native libraries
    // -----------------------------------------------------------------------

    #[test]
    fn library_moves_between_owners_only_after_drop() {
        let root = tempfile::tempdir().unwrap();
        let lib = root.path().join(ldk_native::map_library_name("foo"));
        write_file(&lib, b"");

        let table = LibraryTable::new();
        let opener = Arc::new(CountingOpener::default());
        let mut config = SdkConfig::default();
        config.native.system_paths = vec![root.path().to_path_buf()];
        let context = |name: &str| {
            LoadingContext::builder(name)
                .config(config.clone())
                .table(Arc::clone(&table))
                .opener(opener.clone())
                .build()
        };

        let x = context("x");
        let y = context("y");

        let first = x.load_library("foo").unwrap();
        assert!(Arc::ptr_eq(&first, &x.load_library("foo").unwrap()));
        assert_eq!(opener.opens.load(Ordering::SeqCst), 1);
        assert_eq!(x.find_symbol("entry"), Some(0x10));
        assert_eq!(y.find_symbol("entry"), None);

        assert!(matches!(
            y.load_library("foo"),
            Err(SdkError::Native(NativeError::AlreadyLoadedElsewhere { .. }))
        ));

        drop(x);
        let second = y.load_library("foo").unwrap();
        assert_eq!(second.owner(), y.owner().id());
        assert_eq!(opener.opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_library_file() {
        let root = tempfile::tempdir().unwrap();
        let cx = LoadingContext::builder("x")
            .opener(Arc::new(CountingOpener::default()))
            .build();
        assert!(matches!(
            cx.load_library_file(&root.path().join("libnone.so")),
            Err(SdkError::Native(NativeError::NotFound { .. }))
        ));
    }
}
