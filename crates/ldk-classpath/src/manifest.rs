//! Archive manifest (`META-INF/MANIFEST.MF`) parsing.
//!
//! The format is a sequence of sections separated by blank lines. Each
//! section is a list of `Name: value` headers; a line starting with a single
//! space continues the previous header. The first section holds the main
//! attributes, later sections are per-entry and must start with `Name`.

use std::collections::BTreeMap;

use crate::error::{ClasspathError, ClasspathResult};

/// Path of the manifest inside an archive.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Main attribute naming the extension classpath.
pub const CLASS_PATH_ATTRIBUTE: &str = "Class-Path";

/// An ordered set of manifest headers with case-insensitive lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    /// Look up a header value, ignoring the case of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Insert or replace a header.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push_line(&mut self, line: &str) -> ClasspathResult<()> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ClasspathError::Manifest(format!("header without ':': {line:?}")))?;
        let name = name.trim_end();
        if name.is_empty() {
            return Err(ClasspathError::Manifest(format!("empty header name: {line:?}")));
        }
        let value = value.strip_prefix(' ').unwrap_or(value);
        self.insert(name, value);
        Ok(())
    }
}

/// A parsed archive manifest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Attributes,
    sections: BTreeMap<String, Attributes>,
}

impl Manifest {
    /// Parse manifest bytes.
    pub fn parse(bytes: &[u8]) -> ClasspathResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ClasspathError::Manifest(format!("not UTF-8: {e}")))?;

        let mut manifest = Manifest::default();
        let mut section = Attributes::default();
        let mut seen_main = false;
        let mut header: Option<String> = None;

        for raw in text.split('\n') {
            let line = raw.strip_suffix('\r').unwrap_or(raw);

            if let Some(continuation) = line.strip_prefix(' ') {
                match header.as_mut() {
                    Some(h) => h.push_str(continuation),
                    None => {
                        return Err(ClasspathError::Manifest(
                            "continuation line without a header".into(),
                        ))
                    }
                }
                continue;
            }

            if let Some(h) = header.take() {
                section.push_line(&h)?;
            }

            if line.is_empty() {
                manifest.finish_section(&mut section, &mut seen_main)?;
            } else {
                header = Some(line.to_string());
            }
        }

        if let Some(h) = header.take() {
            section.push_line(&h)?;
        }
        manifest.finish_section(&mut section, &mut seen_main)?;
        Ok(manifest)
    }

    fn finish_section(
        &mut self,
        section: &mut Attributes,
        seen_main: &mut bool,
    ) -> ClasspathResult<()> {
        if section.is_empty() {
            return Ok(());
        }
        let done = std::mem::take(section);
        if !*seen_main {
            self.main = done;
            *seen_main = true;
            return Ok(());
        }
        let name = done
            .get("Name")
            .ok_or_else(|| ClasspathError::Manifest("entry section without Name".into()))?
            .to_string();
        self.sections.insert(name, done);
        Ok(())
    }

    /// The main attributes.
    pub fn main_attributes(&self) -> &Attributes {
        &self.main
    }

    /// Per-entry attributes for `name`.
    pub fn section(&self, name: &str) -> Option<&Attributes> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Attributes)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whitespace-separated tokens of the main `Class-Path` attribute, in
    /// declaration order.
    pub fn class_path(&self) -> Vec<&str> {
        self.main
            .get(CLASS_PATH_ATTRIBUTE)
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_main_attributes() {
        let m = Manifest::parse(b"Manifest-Version: 1.0\nClass-Path: b.jar  lib/c.jar\n").unwrap();
        assert_eq!(m.main_attributes().get("manifest-version"), Some("1.0"));
        assert_eq!(m.class_path(), vec!["b.jar", "lib/c.jar"]);
        assert_eq!(m.sections().count(), 0);
    }

    #[test]
    fn continuation_lines_join() {
        let text = "Manifest-Version: 1.0\r\nClass-Path: first.jar sec\r\n ond.jar \r\n third.jar\r\n\r\n";
        let m = Manifest::parse(text.as_bytes()).unwrap();
        assert_eq!(m.class_path(), vec!["first.jar", "second.jar", "third.jar"]);
    }

    #[test]
    fn entry_sections() {
        let text = "Manifest-Version: 1.0\n\nName: a/B.class\nSHA-256-Digest: xyz\n\n\nName: c/D.class\nSealed: true\n";
        let m = Manifest::parse(text.as_bytes()).unwrap();
        assert_eq!(m.sections().count(), 2);
        assert_eq!(m.section("a/B.class").unwrap().get("sha-256-digest"), Some("xyz"));
        assert_eq!(m.section("c/D.class").unwrap().get("Sealed"), Some("true"));
        assert!(m.class_path().is_empty());
    }

    #[test]
    fn later_header_replaces_earlier() {
        let m = Manifest::parse(b"Class-Path: a.jar\nclass-path: b.jar\n").unwrap();
        assert_eq!(m.class_path(), vec!["b.jar"]);
        assert_eq!(m.main_attributes().len(), 1);
    }

    #[test]
    fn malformed_manifests() {
        assert!(matches!(
            Manifest::parse(b" dangling\n"),
            Err(ClasspathError::Manifest(_))
        ));
        assert!(matches!(
            Manifest::parse(b"no colon here\n"),
            Err(ClasspathError::Manifest(_))
        ));
        assert!(matches!(
            Manifest::parse(b"A: 1\n\nSealed: true\n"),
            Err(ClasspathError::Manifest(_))
        ));
        assert!(matches!(
            Manifest::parse(&[0xff, 0xfe, b'\n']),
            Err(ClasspathError::Manifest(_))
        ));
    }

    #[test]
    fn empty_manifest() {
        let m = Manifest::parse(b"").unwrap();
        assert!(m.main_attributes().is_empty());
        assert!(m.class_path().is_empty());
    }
}
