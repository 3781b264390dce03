use std::path::PathBuf;

use ldk_types::PATH_SEPARATOR;
use serde::{Deserialize, Serialize};

/// Configuration for native library lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    /// Directories searched for every owner.
    pub system_paths: Vec<PathBuf>,
    /// Directories searched only for collectible owners.
    pub user_paths: Vec<PathBuf>,
    /// Honour `"..."` groups in library path strings.
    pub allow_quoted_paths: bool,
    /// Names of libraries linked into the executable.
    pub builtins: Vec<String>,
}

impl NativeConfig {
    /// Build a config from platform library path strings.
    ///
    /// Quoted groups are honoured on Windows only.
    pub fn from_path_strings(system: &str, user: &str) -> Self {
        let allow_quoted_paths = cfg!(windows);
        Self {
            system_paths: parse_library_path(system, PATH_SEPARATOR, allow_quoted_paths),
            user_paths: parse_library_path(user, PATH_SEPARATOR, allow_quoted_paths),
            allow_quoted_paths,
            builtins: Vec::new(),
        }
    }

    pub fn with_builtin(mut self, name: impl Into<String>) -> Self {
        self.builtins.push(name.into());
        self
    }
}

/// Split a library path string into directories.
///
/// Every separator delimits an element, and an empty element means the
/// current directory, so an empty string yields `["."]`. When `allow_quoted`
/// is set, text between double quotes is taken literally, separators
/// included, and the quotes are removed.
pub fn parse_library_path(path: &str, separator: char, allow_quoted: bool) -> Vec<PathBuf> {
    let quoting = allow_quoted && path.contains('"');
    let mut elements = Vec::new();
    let mut current = String::new();

    let mut chars = path.chars();
    while let Some(ch) = chars.next() {
        if quoting && ch == '"' {
            for quoted in chars.by_ref() {
                if quoted == '"' {
                    break;
                }
                current.push(quoted);
            }
        } else if ch == separator {
            elements.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    elements.push(current);

    elements
        .into_iter()
        .map(|element| {
            if element.is_empty() {
                PathBuf::from(".")
            } else {
                PathBuf::from(element)
            }
        })
        .collect()
}
