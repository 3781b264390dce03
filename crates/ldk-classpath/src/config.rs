use serde::{Deserialize, Serialize};

/// Configuration for a [`ClasspathResolver`](crate::ClasspathResolver).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Reject archives that do not start with a zip local file header.
    pub check_archive_header: bool,
    /// Log skipped entries and rejected manifest `Class-Path` tokens.
    pub diagnostics: bool,
    /// Treat empty classpath elements as the current directory.
    pub empty_element_is_cwd: bool,
    /// Follow manifest `Class-Path` declarations.
    pub manifest_class_path: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            check_archive_header: true,
            diagnostics: false,
            empty_element_is_cwd: false,
            manifest_class_path: true,
        }
    }
}

impl ResolverConfig {
    /// Legacy compatibility: empty classpath elements mean the current
    /// directory.
    pub fn legacy() -> Self {
        Self {
            empty_element_is_cwd: true,
            ..Default::default()
        }
    }

    /// Same as the default, with diagnostic logging switched on.
    pub fn with_diagnostics(mut self) -> Self {
        self.diagnostics = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ResolverConfig::default();
        assert!(c.check_archive_header);
        assert!(!c.diagnostics);
        assert!(!c.empty_element_is_cwd);
        assert!(c.manifest_class_path);
    }

    #[test]
    fn legacy_config() {
        let c = ResolverConfig::legacy().with_diagnostics();
        assert!(c.empty_element_is_cwd);
        assert!(c.diagnostics);
        assert!(c.check_archive_header);
    }
}
