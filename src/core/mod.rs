pub(crate) mod error;
pub(crate) mod utils;

use std::io::{Read, Seek, Write};
use std::sync::Arc;

use bitflags::bitflags;

use crate::{DirEntry, Metadata};

pub use error::{FsError, io_kind, is_non_unique, is_not_found, is_not_supported};

pub type Result<T> = std::result::Result<T, anyhow::Error>;

bitflags! {
    /// Flags accepted by [`FsBackend::open_file`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const APPEND = 1 << 2;
        const CREATE = 1 << 3;
        const EXCLUSIVE = 1 << 4;
        const TRUNCATE = 1 << 5;
    }
}

/// An open file handle returned by [`FsBackend::open`] and [`FsBackend::open_file`].
///
/// Handles opened only for reading reject writes and vice versa, the same way host
/// files do.
pub trait File: Read + Write + Seek + Send {
    /// Returns metadata of the opened entry.
    fn metadata(&self) -> Result<Metadata>;

    /// Flushes and releases the handle.
    ///
    /// Dropping a handle closes it as well, but silently; call `close` when the
    /// caller needs to know whether buffered data reached the store.
    fn close(mut self: Box<Self>) -> Result<()> {
        self.flush()?;
        Ok(())
    }
}

/// The capability set shared by every backend and every layer.
///
/// All methods take `&self`; implementations that keep state use interior
/// mutability, so a composed stack can be shared between threads.
///
/// Paths are `/`-separated strings. Backends clean them lexically before use, layers
/// pass them through unchanged unless their contract says otherwise.
pub trait FsBackend: Send + Sync {
    /// Opens `name` for reading.
    fn open(&self, name: &str) -> Result<Box<dyn File>>;

    /// Lists the children of directory `name`, sorted by name.
    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>>;

    /// Opens `name` for streaming access.
    ///
    /// `mode` holds permission bits and is used only when the file gets created.
    fn open_file(&self, name: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>>;

    /// Creates directory `path` together with all missing parents.
    /// Succeeds if the directory already exists.
    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()>;

    /// Replaces the content of `name` with `data`, creating the file if needed.
    fn write_file(&self, name: &str, data: &[u8], mode: u32) -> Result<()>;

    /// Moves `src` to `dst`, replacing a file at `dst`.
    fn rename(&self, src: &str, dst: &str) -> Result<()>;

    /// Removes a file or an empty directory.
    fn remove(&self, name: &str) -> Result<()>;

    /// Removes `path` and everything below it. A missing path is not an error.
    fn remove_all(&self, path: &str) -> Result<()>;

    /// Reads the whole content of `name`.
    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.open(name)?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        file.close()?;
        Ok(content)
    }
}

impl<T: FsBackend + ?Sized> FsBackend for Box<T> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        (**self).open(name)
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        (**self).read_dir(name)
    }

    fn open_file(&self, name: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>> {
        (**self).open_file(name, flags, mode)
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        (**self).mkdir_all(path, mode)
    }

    fn write_file(&self, name: &str, data: &[u8], mode: u32) -> Result<()> {
        (**self).write_file(name, data, mode)
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        (**self).rename(src, dst)
    }

    fn remove(&self, name: &str) -> Result<()> {
        (**self).remove(name)
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        (**self).remove_all(path)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        (**self).read_file(name)
    }
}

impl<T: FsBackend + ?Sized> FsBackend for Arc<T> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        (**self).open(name)
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        (**self).read_dir(name)
    }

    fn open_file(&self, name: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>> {
        (**self).open_file(name, flags, mode)
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        (**self).mkdir_all(path, mode)
    }

    fn write_file(&self, name: &str, data: &[u8], mode: u32) -> Result<()> {
        (**self).write_file(name, data, mode)
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        (**self).rename(src, dst)
    }

    fn remove(&self, name: &str) -> Result<()> {
        (**self).remove(name)
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        (**self).remove_all(path)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        (**self).read_file(name)
    }
}
