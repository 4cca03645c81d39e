use tracing::trace;

use crate::DirEntry;
use crate::core::{File, FsBackend, OpenFlags, Result, is_not_found};

/// Skips `write_file` when the stored content already equals the new data.
///
/// The current content is read through the inner backend first. A missing file is
/// written; any other read failure is returned as is.
pub struct ChangedOnly<F> {
    inner: F,
}

impl<F: FsBackend> ChangedOnly<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: FsBackend> FsBackend for ChangedOnly<F> {
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
        self.inner.mkdir_all(path, mode)
    }

    fn write_file(&self, name: &str, data: &[u8], mode: u32) -> Result<()> {
        match self.inner.read_file(name) {
            Ok(current) if current == data => {
                trace!(name, "content unchanged, skipping write");
                Ok(())
            }
            Ok(_) => self.inner.write_file(name, data, mode),
            Err(err) if is_not_found(&err) => self.inner.write_file(name, data, mode),
            Err(err) => Err(err),
        }
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        self.inner.rename(src, dst)
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.inner.remove(name)
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        self.inner.remove_all(path)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        self.inner.read_file(name)
    }
}
