use tracing::debug;

use crate::DirEntry;
use crate::core::{File, FsBackend, FsError, OpenFlags, Result, utils};

/// Makes `write_file` atomic: data goes to `NAME.tmp` first, which is then renamed to
/// `NAME` through the inner backend.
///
/// Readers of `NAME` see either the old content or the new one, never a partial
/// file. On failure the temp file is removed and both errors are reported. All other
/// operations pass through unchanged.
///
/// The rename is only atomic when the temp file lives on the same mounted file system
/// as the destination, see [`AtomicWrite::with_temp_dir`].
pub struct AtomicWrite<F> {
    inner: F,
    temp_dir: Option<String>,
}

impl<F: FsBackend> AtomicWrite<F> {
    /// Keeps temp files next to their destination.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            temp_dir: None,
        }
    }

    /// Keeps temp files under `dir` (`dir/NAME.tmp`). An empty `dir` is the same as
    /// [`AtomicWrite::new`].
    pub fn with_temp_dir<S: Into<String>>(inner: F, dir: S) -> Self {
        let dir = dir.into();
        Self {
            inner,
            temp_dir: (!dir.is_empty()).then_some(dir),
        }
    }

    fn temp_name(&self, name: &str) -> String {
        let temp = format!("{name}.tmp");
        match &self.temp_dir {
            Some(dir) => utils::join(dir, &temp),
            None => temp,
        }
    }

    /// Removes the temp file after `err` and reports what could not be cleaned up.
    fn clean_up(&self, temp: &str, err: anyhow::Error) -> anyhow::Error {
        match self.inner.remove(temp) {
            Ok(()) => {
                debug!(temp, "removed temp file after failed write");
                err
            }
            Err(cleanup) => {
                debug!(temp, error = %cleanup, "failed to remove temp file");
                FsError::join(err, cleanup)
            }
        }
    }
}

impl<F: FsBackend> FsBackend for AtomicWrite<F> {
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
        let temp = self.temp_name(name);
        if let Err(err) = self.inner.write_file(&temp, data, mode) {
            return Err(self.clean_up(&temp, err));
        }

        debug!(temp = %temp, name, "renaming temp file into place");
        if let Err(err) = self.inner.rename(&temp, name) {
            return Err(self.clean_up(&temp, err));
        }
        Ok(())
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
