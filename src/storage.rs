//! Storage backends the streaming layer reads asset bytes from.
//!
//! All paths crossing this boundary are normalized relative asset paths
//! (forward slashes, relative to the import root).

use crate::error::{Result, StreamError};
use crate::hash::{compute_name_hash, hash_normalized, normalize_asset_path, NameHash};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of asset bytes and asset identity
pub trait StorageBackend: Send + Sync {
    /// Open a file for reading
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>>;

    /// Identity hash of a path
    fn hash(&self, path: &str) -> NameHash;

    /// Every file below `path`, recursively, sorted
    fn list_directory(&self, path: &str) -> Result<Vec<String>>;

    /// Read a whole file
    fn read_all(&self, path: &str) -> Result<Vec<u8>> {
        let mut reader = self.open(path)?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| StreamError::Io(format!("Failed to read {path}: {e}")))?;
        Ok(bytes)
    }

    /// Check whether a file exists
    fn exists(&self, path: &str) -> bool {
        self.open(path).is_ok()
    }
}

/// Real filesystem rooted at the import root
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collect_files(&self, directory: &Path, files: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(directory).map_err(|e| {
            StreamError::Io(format!(
                "Failed to read directory {}: {e}",
                directory.display()
            ))
        })? {
            let entry =
                entry.map_err(|e| StreamError::Io(format!("Failed to read entry: {e}")))?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_files(&path, files)?;
            } else if path.is_file() {
                files.push(normalize_asset_path(&self.root, &path));
            }
        }
        Ok(())
    }
}

impl StorageBackend for FileSystemStorage {
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let full_path = self.root.join(path);
        let file = fs::File::open(&full_path).map_err(|e| {
            StreamError::Io(format!("Failed to open {}: {e}", full_path.display()))
        })?;
        Ok(Box::new(file))
    }

    fn hash(&self, path: &str) -> NameHash {
        compute_name_hash(&self.root, path)
    }

    fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        let directory = self.root.join(path);
        let mut files = Vec::new();
        if directory.is_dir() {
            self.collect_files(&directory, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    fn exists(&self, path: &str) -> bool {
        self.root.join(path).is_file()
    }
}

/// In-memory archive, used as a virtual filesystem and in tests.
///
/// Every successful `open` is counted so callers can verify how often the
/// streaming layer actually touched storage.
#[derive(Default)]
pub struct MemoryStorage {
    files: RwLock<AHashMap<String, Arc<[u8]>>>,
    reads: AtomicU64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&self, path: impl AsRef<str>, bytes: impl Into<Vec<u8>>) {
        let path = normalize_asset_path(Path::new(""), path.as_ref());
        self.files.write().insert(path, Arc::from(bytes.into()));
    }

    pub fn remove(&self, path: &str) -> bool {
        let path = normalize_asset_path(Path::new(""), path);
        self.files.write().remove(&path).is_some()
    }

    /// Move a file, keeping its content
    pub fn rename(&self, from: &str, to: &str) -> bool {
        let from = normalize_asset_path(Path::new(""), from);
        let to = normalize_asset_path(Path::new(""), to);
        let mut files = self.files.write();
        match files.remove(&from) {
            Some(bytes) => {
                files.insert(to, bytes);
                true
            }
            None => false,
        }
    }

    /// Number of successful opens so far
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let bytes = self
            .files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| StreamError::Io(format!("No such file: {path}")))?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn hash(&self, path: &str) -> NameHash {
        hash_normalized(path)
    }

    fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        let prefix = path.trim_end_matches('/');
        let mut files: Vec<String> = self
            .files
            .read()
            .keys()
            .filter(|file| {
                prefix.is_empty()
                    || file
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .cloned()
            .collect();
        files.sort();
        Ok(files)
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }
}
