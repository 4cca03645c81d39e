use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::DirEntry;
use crate::core::{File, FsBackend, FsError, OpenFlags, Result, utils};

/// Allows each path to be created only once.
///
/// `mkdir_all`, `write_file` and `rename` (for the destination) fail with
/// [`FsError::NonUnique`] when the exact path string was already used through this
/// layer, without calling the inner backend. `remove` and `remove_all` release paths,
/// and `rename` moves the reservation from source to destination.
///
/// Paths are compared as given: `a.txt` and `./a.txt` are different names.
///
/// ```
/// use vfs_layers::{FsBackend, MapFS, Unique, is_non_unique};
///
/// let fs = Unique::new(MapFS::new());
/// fs.write_file("a.txt", b"first", 0o644).unwrap();
///
/// let err = fs.write_file("a.txt", b"second", 0o644).unwrap_err();
/// assert!(is_non_unique(&err));
/// assert_eq!(err.to_string(), "trying to write a.txt more than once");
/// ```
pub struct Unique<F> {
    inner: F,
    used: Mutex<HashSet<String>>,
}

impl<F: FsBackend> Unique<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            used: Mutex::new(HashSet::new()),
        }
    }

    fn used(&self) -> MutexGuard<'_, HashSet<String>> {
        self.used.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `create` unless `path` is taken, then reserves `path`. The returned guard
    /// keeps the set locked for follow-up updates.
    fn reserve<C>(&self, path: &str, create: C) -> Result<MutexGuard<'_, HashSet<String>>>
    where
        C: FnOnce() -> Result<()>,
    {
        let mut used = self.used();
        if used.contains(path) {
            debug!(path, "path already written");
            return Err(FsError::NonUnique(path.to_string()).into());
        }
        create()?;
        used.insert(path.to_string());
        Ok(used)
    }
}

impl<F: FsBackend> FsBackend for Unique<F> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        self.inner.open(name)
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        self.inner.read_dir(name)
    }

    fn open_file(&self, name: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>> {
        self.inner.open_file(name, flags, mode)
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        self.reserve(path, || self.inner.mkdir_all(path, mode))?;
        Ok(())
    }

    fn write_file(&self, name: &str, data: &[u8], mode: u32) -> Result<()> {
        self.reserve(name, || self.inner.write_file(name, data, mode))?;
        Ok(())
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let mut used = self.reserve(dst, || self.inner.rename(src, dst))?;
        if src != dst {
            used.remove(src);
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.inner.remove(name)?;
        self.used().remove(name);
        Ok(())
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        self.inner.remove_all(path)?;
        let removed = utils::normalize(path);
        self.used()
            .retain(|used| used != path && !utils::is_sub_path(&removed, used));
        Ok(())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        self.inner.read_file(name)
    }
}
