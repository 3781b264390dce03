//! Platform library file names and directory search.

use std::path::{Path, PathBuf};

use crate::config::NativeConfig;

#[cfg(target_os = "windows")]
const PREFIX: &str = "";
#[cfg(not(target_os = "windows"))]
const PREFIX: &str = "lib";

#[cfg(target_os = "windows")]
const SUFFIX: &str = ".dll";
#[cfg(target_os = "macos")]
const SUFFIX: &str = ".dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const SUFFIX: &str = ".so";

/// Map a logical library name to the platform file name.
///
/// `foo` becomes `libfoo.so`, `libfoo.dylib` or `foo.dll`.
pub fn map_library_name(name: &str) -> String {
    format!("{PREFIX}{name}{SUFFIX}")
}

/// The secondary file name tried after [`map_library_name`], if the
/// platform has one.
pub fn alternative_library_name(name: &str) -> Option<String> {
    if cfg!(target_os = "macos") {
        Some(format!("lib{name}.jnilib"))
    } else {
        None
    }
}

/// Recover the logical name from a platform file name, if it follows the
/// platform convention.
pub fn library_base_name(file_name: &str) -> Option<&str> {
    let base = file_name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    (!base.is_empty()).then_some(base)
}

/// Ordered directories searched by
/// [`NativeLibraryRegistry::load_library`](crate::NativeLibraryRegistry::load_library).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LibrarySearchPath {
    system: Vec<PathBuf>,
    user: Vec<PathBuf>,
}

impl LibrarySearchPath {
    pub fn new(system: Vec<PathBuf>, user: Vec<PathBuf>) -> Self {
        Self { system, user }
    }

    pub fn from_config(config: &NativeConfig) -> Self {
        Self::new(config.system_paths.clone(), config.user_paths.clone())
    }

    pub fn system_paths(&self) -> &[PathBuf] {
        &self.system
    }

    pub fn user_paths(&self) -> &[PathBuf] {
        &self.user
    }

    /// Candidate files for `name`, in search order.
    ///
    /// Each system directory contributes the primary then the alternative
    /// file name; user directories follow when `include_user` is set.
    pub fn candidates(&self, name: &str, include_user: bool) -> Vec<PathBuf> {
        let primary = map_library_name(name);
        let alternative = alternative_library_name(name);

        let user: &[PathBuf] = if include_user { &self.user } else { &[] };
        self.system
            .iter()
            .chain(user)
            .flat_map(|dir| {
                std::iter::once(dir.join(&primary))
                    .chain(alternative.as_deref().map(|alt| dir.join(alt)))
            })
            .collect()
    }
}

/// The file name component of `path` as a string.
pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_inverts_mapping() {
        let mapped = map_library_name("zip");
        assert_eq!(library_base_name(&mapped), Some("zip"));
        assert_eq!(library_base_name(&map_library_name("")), None);
        assert_eq!(library_base_name("README"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_naming() {
        assert_eq!(map_library_name("foo"), "libfoo.so");
        assert_eq!(alternative_library_name("foo"), None);
    }

    #[test]
    fn candidates_follow_directory_order() {
        let search = LibrarySearchPath::new(
            vec![PathBuf::from("/sys1"), PathBuf::from("/sys2")],
            vec![PathBuf::from("/usr1")],
        );
        let file = map_library_name("foo");

        let system_only = search.candidates("foo", false);
        assert_eq!(system_only.first(), Some(&PathBuf::from("/sys1").join(&file)));
        assert!(system_only.iter().all(|p| !p.starts_with("/usr1")));

        let all = search.candidates("foo", true);
        assert_eq!(all.last().map(|p| p.starts_with("/usr1")), Some(true));
        assert_eq!(all.len(), system_only.len() * 3 / 2);
    }

    #[test]
    fn file_name_of_path() {
        assert_eq!(file_name_of(Path::new("/a/b/libx.so")), "libx.so");
        assert_eq!(file_name_of(Path::new("/")), "");
    }
}
