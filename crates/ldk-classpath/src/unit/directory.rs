use std::path::{Path, PathBuf};

use ldk_types::{normalize_path, Location};
use parking_lot::Mutex;
use walkdir::WalkDir;

use crate::error::ClasspathResult;
use crate::resource::Resource;
use crate::unit::LoaderUnit;

/// Loader unit backed by a local directory.
///
/// Resource names resolve to `base/name`. Names that would leave the base
/// directory are treated as absent; names containing `..` are additionally
/// checked against the canonical base, which catches symlink escapes.
pub struct DirectoryUnit {
    location: Location,
    dir: PathBuf,
    canonical_dir: Mutex<Option<PathBuf>>,
}

impl DirectoryUnit {
    pub fn new(location: Location) -> Self {
        let dir = location
            .as_path()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            location,
            dir,
            canonical_dir: Mutex::new(None),
        }
    }

    fn canonical_dir(&self) -> ClasspathResult<PathBuf> {
        let mut cached = self.canonical_dir.lock();
        if let Some(dir) = cached.as_ref() {
            return Ok(dir.clone());
        }
        let dir = std::fs::canonicalize(&self.dir)?;
        *cached = Some(dir.clone());
        Ok(dir)
    }

    fn resolve(&self, name: &str) -> ClasspathResult<Option<PathBuf>> {
        let joined = self.dir.join(name);
        let normalized = normalize_path(&joined);
        if !normalized.starts_with(&self.dir) {
            return Ok(None);
        }
        if !name.contains("..") {
            return Ok(Some(normalized));
        }
        let canonical = match std::fs::canonicalize(&joined) {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if canonical.starts_with(self.canonical_dir()?) {
            Ok(Some(canonical))
        } else {
            Ok(None)
        }
    }
}

impl LoaderUnit for DirectoryUnit {
    fn location(&self) -> &Location {
        &self.location
    }

    fn get_resource(&self, name: &str) -> ClasspathResult<Option<Resource>> {
        match self.resolve(name)? {
            Some(path) if path.exists() => {
                Ok(Some(Resource::file(name, self.location.clone(), path)))
            }
            _ => Ok(None),
        }
    }

    fn entries(&self) -> ClasspathResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.dir)
                .unwrap_or(entry.path());
            let name: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            names.push(name.join("/"));
        }
        names.sort();
        Ok(names)
    }

    fn close(&self) -> ClasspathResult<()> {
        Ok(())
    }
}
