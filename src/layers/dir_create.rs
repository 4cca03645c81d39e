use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::DirEntry;
use crate::core::{File, FsBackend, OpenFlags, Result, utils};

/// Creates parent directories on demand and remembers which ones exist.
///
/// `write_file`, `open_file` with [`OpenFlags::CREATE`] and `rename` (for the
/// destination) first call this layer's `mkdir_all` on the parent directory, using the
/// mode given at construction. `mkdir_all` itself is memoized: a path that was created
/// through this layer is not created again until it is removed through this layer.
///
/// The cache reflects only what went through this instance. Changes made to the
/// underlying store by other means are not seen.
pub struct DirCreate<F> {
    inner: F,
    dir_mode: u32,
    known: Mutex<HashSet<String>>,
}

impl<F: FsBackend> DirCreate<F> {
    pub fn new(inner: F, dir_mode: u32) -> Self {
        Self {
            inner,
            dir_mode,
            known: Mutex::new(HashSet::new()),
        }
    }

    fn known(&self) -> MutexGuard<'_, HashSet<String>> {
        self.known.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_parent(&self, name: &str) -> Result<()> {
        self.mkdir_all(&utils::dir(&utils::normalize(name)), self.dir_mode)
    }

    /// Forgets `path` and everything below it.
    fn invalidate(&self, path: &str) {
        let removed = utils::normalize(path);
        let mut known = self.known();
        let before = known.len();
        known.retain(|dir| !utils::is_sub_path(&removed, dir));
        if known.len() != before {
            debug!(path = %removed, forgotten = before - known.len(), "invalidated directory cache");
        }
    }
}

impl<F: FsBackend> FsBackend for DirCreate<F> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        self.inner.open(name)
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        self.inner.read_dir(name)
    }

    fn open_file(&self, name: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>> {
        if flags.contains(OpenFlags::CREATE) {
            self.create_parent(name)?;
        }
        self.inner.open_file(name, flags, mode)
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        let key = utils::normalize(path);
        let mut known = self.known();
        if known.contains(&key) {
            trace!(path = %key, "directory already created");
            return Ok(());
        }

        self.inner.mkdir_all(path, mode)?;
        known.insert(key);
        Ok(())
    }

    fn write_file(&self, name: &str, data: &[u8], mode: u32) -> Result<()> {
        self.create_parent(name)?;
        self.inner.write_file(name, data, mode)
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        self.create_parent(dst)?;
        self.inner.rename(src, dst)?;

        let src_key = utils::normalize(src);
        let dst_key = utils::normalize(dst);
        let mut known = self.known();
        let moved: Vec<String> = known
            .iter()
            .filter(|dir| utils::is_sub_path(&src_key, dir))
            .cloned()
            .collect();
        for dir in moved {
            known.remove(&dir);
            let rest = match dir.strip_prefix(&src_key) {
                Some("") => Some(""),
                Some(rest) => rest.strip_prefix('/'),
                None => None,
            };
            if let Some(rest) = rest {
                known.insert(utils::join(&dst_key, rest));
            }
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.inner.remove(name)?;
        self.invalidate(name);
        Ok(())
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        self.inner.remove_all(path)?;
        self.invalidate(path);
        Ok(())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        self.inner.read_file(name)
    }
}
