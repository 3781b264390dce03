//! Classpath location identifiers.
//!
//! A [`Location`] names one classpath element: either a local filesystem path
//! (directory or archive) or a URL with some other scheme. Locations are
//! normalized on construction so that two spellings of the same element
//! compare equal through their [`LocationKey`].

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::{ParseError, Url};

use crate::error::{TypeError, TypeResult};

/// Deduplication key for a [`Location`].
///
/// Two locations with the same key are the same classpath element. URL
/// fragments never participate in the key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey(String);

impl LocationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized classpath location.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    /// Absolute, lexically normalized local path.
    Local(PathBuf),
    /// URL with a non-`file` scheme, fragment removed.
    Remote(Url),
}

impl Location {
    /// Parse a location, resolving relative paths against the current
    /// working directory.
    pub fn parse(input: &str) -> TypeResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|_| TypeError::NoBaseDirectory(input.to_string()))?;
        Self::parse_in(input, &cwd)
    }

    /// Parse a location, resolving relative paths against `base_dir`.
    ///
    /// Accepts plain paths, `file:` URLs (percent-decoded), and URLs of any
    /// other scheme. A `#fragment` on a URL is dropped.
    pub fn parse_in(input: &str, base_dir: &Path) -> TypeResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TypeError::invalid(input, "empty location"));
        }

        match Url::parse(trimmed) {
            Ok(url) if !is_drive_letter(&url) => Self::from_url(input, url),
            Ok(_) | Err(ParseError::RelativeUrlWithoutBase) => {
                let path = Path::new(trimmed);
                let absolute = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    base_dir.join(path)
                };
                Ok(Location::Local(normalize_path(&absolute)))
            }
            Err(e) => Err(TypeError::invalid(input, e.to_string())),
        }
    }

    fn from_url(input: &str, mut url: Url) -> TypeResult<Self> {
        url.set_fragment(None);
        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| TypeError::invalid(input, "file URL does not name a local path"))?;
            return Ok(Location::Local(normalize_path(&path)));
        }
        if url.cannot_be_a_base() && url.path().is_empty() {
            return Err(TypeError::invalid(input, "URL has no body"));
        }
        Ok(Location::Remote(url))
    }

    /// Build a local location from a path, normalizing it lexically.
    ///
    /// Relative paths are kept relative; callers wanting an absolute location
    /// should use [`Location::parse_in`].
    pub fn local(path: impl AsRef<Path>) -> Self {
        Location::Local(normalize_path(path.as_ref()))
    }

    /// The deduplication key for this location.
    pub fn key(&self) -> LocationKey {
        match self {
            Location::Local(path) => LocationKey(format!("file:{}", path.to_string_lossy())),
            Location::Remote(url) => LocationKey(url.as_str().to_string()),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Location::Local(_))
    }

    /// The local path, if this is a local location.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Location::Local(path) => Some(path),
            Location::Remote(_) => None,
        }
    }

    /// The URL, if this is a remote location.
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Location::Local(_) => None,
            Location::Remote(url) => Some(url),
        }
    }

    /// The URL scheme (`file` for local locations).
    pub fn scheme(&self) -> &str {
        match self {
            Location::Local(_) => "file",
            Location::Remote(url) => url.scheme(),
        }
    }

    /// Resolve one token of an archive's manifest `Class-Path` attribute,
    /// with `self` being the declaring archive.
    ///
    /// Returns `None` when the token is malformed or would escape the
    /// declaring archive's directory:
    ///
    /// - local base: relative tokens must normalize to a path under the
    ///   archive's directory; absolute paths and `file:` URLs are accepted;
    ///   tokens with any other scheme are dropped.
    /// - remote base: only relative tokens are accepted, none of their
    ///   segments may be `..`, and the joined URL's path must literally
    ///   extend the base path up to its last `/`.
    pub fn resolve_manifest_token(&self, token: &str) -> Option<Location> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        match self {
            Location::Local(archive) => resolve_local_token(archive, token),
            Location::Remote(url) => resolve_remote_token(url, token),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Remote(url) => f.write_str(url.as_str()),
        }
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. `..` at the root is discarded; leading `..` of a
/// relative path is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `C:\dir` parses as a URL with scheme `c`.
fn is_drive_letter(url: &Url) -> bool {
    url.scheme().len() == 1
}

fn resolve_local_token(archive: &Path, token: &str) -> Option<Location> {
    let base_dir = archive.parent()?;
    match Url::parse(token) {
        Ok(url) if !is_drive_letter(&url) => {
            if url.scheme() == "file" {
                Location::from_url(token, url).ok()
            } else {
                None
            }
        }
        Ok(_) => {
            let path = Path::new(token);
            path.is_absolute().then(|| Location::Local(normalize_path(path)))
        }
        Err(ParseError::RelativeUrlWithoutBase) => {
            let base = Url::from_directory_path(base_dir).ok()?;
            let joined = base.join(token).ok()?;
            let resolved = normalize_path(&joined.to_file_path().ok()?);
            let absolute = token.starts_with(['/', '\\']);
            if absolute || resolved.starts_with(base_dir) {
                Some(Location::Local(resolved))
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

fn resolve_remote_token(base: &Url, token: &str) -> Option<Location> {
    let child = token.replace('\\', "/");
    if child.starts_with('/') || Url::parse(&child).is_ok() {
        return None;
    }
    if child.split(['/', '?', '#']).any(|segment| segment == "..") {
        return None;
    }

    let mut joined = base.join(&child).ok()?;
    joined.set_fragment(None);

    let base_path = base.path();
    let region = &base_path[..base_path.rfind('/').map_or(0, |i| i + 1)];
    if joined.path().starts_with(region) {
        Some(Location::Remote(joined))
    } else {
        None
    }
}
