//! Classpath string splitting.

/// Platform path-list separator used in classpath strings.
#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';
/// Platform path-list separator used in classpath strings.
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

/// Split a classpath string on the platform separator.
///
/// See [`split_classpath_with`].
pub fn split_classpath(classpath: &str, empty_is_cwd: bool) -> Vec<String> {
    split_classpath_with(classpath, PATH_SEPARATOR, empty_is_cwd)
}

/// Split a classpath string on `separator`.
///
/// Empty elements are dropped, except in legacy mode (`empty_is_cwd`) where
/// each one stands for the current directory and becomes `"."`.
pub fn split_classpath_with(classpath: &str, separator: char, empty_is_cwd: bool) -> Vec<String> {
    if classpath.is_empty() {
        return if empty_is_cwd {
            vec![".".to_string()]
        } else {
            Vec::new()
        };
    }
    classpath
        .split(separator)
        .filter_map(|element| {
            if !element.is_empty() {
                Some(element.to_string())
            } else if empty_is_cwd {
                Some(".".to_string())
            } else {
                None
            }
        })
        .collect()
}
