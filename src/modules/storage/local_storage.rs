//! Local filesystem storage area
//!
//! All uploaded and extracted files live below a single root directory. Callers address
//! files by a path relative to that root; absolute paths and `..` components are refused.
//! The methods here do blocking I/O and are meant to run inside `spawn_blocking`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::shared::constants::UPLOADS_URL_PREFIX;

/// Upper bound on `-N` suffixes tried by [`CollisionPolicy::Rename`]
const MAX_RENAME_ATTEMPTS: u32 = 10_000;

/// What to do when the target of a write already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Replace the existing file
    #[default]
    Overwrite,
    /// Keep the existing file and write to `stem-N.ext` instead
    Rename,
    /// Fail the write
    Reject,
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "rename" => Ok(Self::Rename),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "FILE_COLLISION_POLICY must be one of overwrite, rename, reject (got '{}')",
                other
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file already exists: {0}")]
    Conflict(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Storage area rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    policy: CollisionPolicy,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, policy: CollisionPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// Create the root directory if needed; fail if the root is not a directory
    pub fn ensure_root(&self) -> Result<(), StorageError> {
        if self.root.exists() {
            if !self.root.is_dir() {
                return Err(StorageError::Io(io::Error::other(format!(
                    "storage root is not a directory: {}",
                    self.root.display()
                ))));
            }
            return Ok(());
        }

        fs::create_dir_all(&self.root)?;
        debug!("Created storage root {}", self.root.display());
        Ok(())
    }

    /// Write `data` to `relative`, honoring the collision policy.
    ///
    /// Returns the location actually written, which differs from `root/relative` under
    /// [`CollisionPolicy::Rename`].
    pub fn write(&self, relative: &Path, data: &[u8]) -> Result<PathBuf, StorageError> {
        let (mut file, path) = self.create(relative)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(path)
    }

    /// Open a new file at `relative` for writing, creating intermediate directories.
    pub fn create(&self, relative: &Path) -> Result<(File, PathBuf), StorageError> {
        let relative = normalize_relative(relative)?;
        let target = self.root.join(&relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        match self.policy {
            CollisionPolicy::Overwrite => {
                let file = File::create(&target)?;
                Ok((file, target))
            }
            CollisionPolicy::Reject => match create_new(&target) {
                Ok(file) => Ok((file, target)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    Err(StorageError::Conflict(target.display().to_string()))
                }
                Err(e) => Err(e.into()),
            },
            CollisionPolicy::Rename => {
                match create_new(&target) {
                    Ok(file) => return Ok((file, target)),
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                    Err(e) => return Err(e.into()),
                }

                for attempt in 1..=MAX_RENAME_ATTEMPTS {
                    let candidate = numbered_sibling(&target, attempt);
                    match create_new(&candidate) {
                        Ok(file) => {
                            debug!(
                                "Renamed {} to {} to avoid collision",
                                target.display(),
                                candidate.display()
                            );
                            return Ok((file, candidate));
                        }
                        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                        Err(e) => return Err(e.into()),
                    }
                }

                Err(StorageError::Conflict(target.display().to_string()))
            }
        }
    }

    /// Public URL of a stored path, if it lies under the storage root.
    ///
    /// Each segment is percent-encoded so names with `%`, `?`, `#` or spaces stay reachable.
    pub fn public_url(&self, stored_path: &str) -> Option<String> {
        let relative = Path::new(stored_path).strip_prefix(&self.root).ok()?;

        let segments: Vec<String> = relative
            .components()
            .map(|c| match c {
                Component::Normal(part) => {
                    Some(urlencoding::encode(&part.to_string_lossy()).into_owned())
                }
                _ => None,
            })
            .collect::<Option<_>>()?;

        if segments.is_empty() {
            return None;
        }

        Some(format!("{}/{}", UPLOADS_URL_PREFIX, segments.join("/")))
    }
}

/// Keep only the final component of a client-supplied filename.
///
/// Browsers may send full paths (`C:\Users\me\clip.mp4`); both separators are stripped.
pub fn upload_file_name(original: &str) -> Option<&str> {
    let name = original.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name)
}

fn normalize_relative(relative: &Path) -> Result<PathBuf, StorageError> {
    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(StorageError::InvalidPath(
                    relative.display().to_string(),
                ))
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(StorageError::InvalidPath(relative.display().to_string()));
    }

    Ok(clean)
}

fn create_new(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn numbered_sibling(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}-{}", stem, n),
    };
    path.with_file_name(name)
}
