use tracing::warn;

use crate::DirEntry;
use crate::core::{File, FsBackend, FsError, OpenFlags, Result, utils};

/// Confines every path to a base directory.
///
/// Names are joined to the base and normalized; a leading `/` is relative to the base,
/// so `/a.txt` under `out` is `out/a.txt`. A name resolving outside the base (`../x`,
/// `a/../../x`) fails with a not-found [`FsError::Path`] carrying the operation and
/// the name as given, and never reaches the inner backend.
///
/// An empty or `.` base leaves names untouched.
///
/// ```
/// use vfs_layers::{BaseDir, FsBackend, MapFS, is_not_found};
///
/// let store = MapFS::new();
/// store.mkdir_all("out", 0o755).unwrap();
/// let fs = BaseDir::new(store.clone(), "out");
///
/// fs.write_file("/report.txt", b"ok", 0o644).unwrap();
/// assert_eq!(store.names(), vec!["out/report.txt"]);
/// assert!(is_not_found(&fs.write_file("../escape.txt", b"", 0o644).unwrap_err()));
/// ```
pub struct BaseDir<F> {
    inner: F,
    base: Option<String>,
}

impl<F: FsBackend> BaseDir<F> {
    pub fn new<S: Into<String>>(inner: F, dir: S) -> Self {
        let dir = dir.into();
        let base = match dir.as_str() {
            "" | "." => None,
            _ => Some(utils::normalize(&dir)),
        };
        Self { inner, base }
    }

    fn resolve(&self, op: &'static str, name: &str) -> Result<String> {
        let Some(base) = &self.base else {
            return Ok(name.to_string());
        };

        let resolved = utils::join(base, name);
        if utils::is_sub_path(base, &resolved) {
            Ok(resolved)
        } else {
            warn!(op, name, base = %base, "path escapes base directory");
            Err(FsError::not_found(op, name).into())
        }
    }
}

impl<F: FsBackend> FsBackend for BaseDir<F> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        self.inner.open(&self.resolve("open", name)?)
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        self.inner.read_dir(&self.resolve("readdir", name)?)
    }

    fn open_file(&self, name: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>> {
        self.inner
            .open_file(&self.resolve("openfile", name)?, flags, mode)
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        self.inner.mkdir_all(&self.resolve("mkdir", path)?, mode)
    }

    fn write_file(&self, name: &str, data: &[u8], mode: u32) -> Result<()> {
        self.inner
            .write_file(&self.resolve("write_file", name)?, data, mode)
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let src = self.resolve("rename", src)?;
        let dst = self.resolve("rename", dst)?;
        self.inner.rename(&src, &dst)
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.inner.remove(&self.resolve("remove", name)?)
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        self.inner.remove_all(&self.resolve("remove_all", path)?)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        self.inner.read_file(&self.resolve("open", name)?)
    }
}
