//! Resolving and reading the files a document refers to.
//!
//! The viewer never touches the filesystem directly. Documents, linked documents and images are
//! all read through an [`AssetSource`], which is shared with the image worker threads.

use std::collections::HashMap;
use std::io;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use url::Url;

pub trait AssetSource: Send + Sync {
    /// Resolves `target` (a link destination or image source) relative to `base_document`.
    ///
    /// Returns `None` when the target does not name a local resource.
    fn resolve(&self, base_document: &Path, target: &str) -> Option<PathBuf>;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads from the local filesystem.
///
/// Relative targets resolve against the directory of the base document; relative results are
/// anchored at the process working directory so cache keys are absolute.
#[derive(Clone, Debug, Default)]
pub struct FsAssets;

impl AssetSource for FsAssets {
    fn resolve(&self, base_document: &Path, target: &str) -> Option<PathBuf> {
        let joined = join_target(base_document, target)?;
        if joined.is_absolute() {
            return Some(joined);
        }
        let cwd = std::env::current_dir().ok()?;
        Some(normalize(&cwd.join(joined)))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// An in-memory file map, mostly for tests and embedded documentation.
#[derive(Clone, Debug, Default)]
pub struct MemoryAssets {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(normalize(path.as_ref()), bytes.into());
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl AssetSource for MemoryAssets {
    fn resolve(&self, base_document: &Path, target: &str) -> Option<PathBuf> {
        join_target(base_document, target)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}

/// `true` when `target` carries a URL scheme such as `https:` or `mailto:`.
///
/// Single-letter schemes are treated as Windows drive letters, not URLs.
pub fn has_scheme(target: &str) -> bool {
    Url::parse(target.trim()).is_ok_and(|url| url.scheme().len() > 1)
}

/// Lexically removes `.` and `..` components. Never touches the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn join_target(base_document: &Path, target: &str) -> Option<PathBuf> {
    let target = target.trim();
    if target.is_empty() || target.starts_with('#') || has_scheme(target) {
        return None;
    }
    let target = Path::new(target);
    let joined = if target.has_root() {
        target.to_path_buf()
    } else {
        base_document
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(target)
    };
    Some(normalize(&joined))
}
