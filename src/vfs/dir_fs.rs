//! This module provides the backend that maps directly onto the host file system.
//!
//! ### Key Features:
//! - **Host semantics**: paths, permission bits and rename atomicity are those of the host.
//! - **Path normalization**: `.` and `..` components are resolved lexically and trailing
//!   slashes removed before a path reaches the host.
//! - **No confinement of its own**: combine with the base directory layer to jail a
//!   `DirFS` inside a directory.

use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};

use anyhow::Context;

use crate::core::{File, FsBackend, OpenFlags, Result, utils};
use crate::{DirEntry, EntryType, Metadata};

/// A file system backend that forwards every operation to the host.
///
/// ### Usage notes:
/// - `DirFS` does not follow symlinks when listing; `read_dir()` reports them as
///   [`EntryType::Symlink`].
/// - `mode` arguments are applied on Unix (subject to the process umask) and ignored
///   elsewhere.
/// - Errors are returned via `anyhow::Result`; the underlying [`io::Error`] stays in
///   the chain, so its kind can be inspected with [`io_kind`](crate::io_kind).
///
/// ### Example:
/// ```
/// use vfs_layers::{DirFS, FsBackend};
///
/// let root = std::env::temp_dir().join("vfs_layers_doc");
/// let root = root.to_str().unwrap();
/// let fs = DirFS::new();
///
/// fs.mkdir_all(&format!("{root}/docs"), 0o755).unwrap();
/// fs.write_file(&format!("{root}/docs/note.txt"), b"Hello", 0o644).unwrap();
/// assert_eq!(fs.read_file(&format!("{root}/docs/note.txt")).unwrap(), b"Hello");
///
/// fs.remove_all(root).unwrap();
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct DirFS;

impl DirFS {
    pub fn new() -> Self {
        DirFS
    }
}

impl FsBackend for DirFS {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        let path = utils::normalize(name);
        let file = fs::File::open(&path).with_context(|| format!("open {path}"))?;
        Ok(Box::new(HostFile { path, file }))
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        let path = utils::normalize(name);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&path).with_context(|| format!("readdir {path}"))? {
            let entry = entry.with_context(|| format!("readdir {path}"))?;
            let metadata = entry
                .metadata()
                .with_context(|| format!("stat {}", entry.path().display()))?;
            entries.push(DirEntry::new(
                entry.file_name().to_string_lossy(),
                host_metadata(&metadata),
            ));
        }
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(entries)
    }

    fn open_file(&self, name: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>> {
        let path = utils::normalize(name);
        let writable = flags.intersects(OpenFlags::WRITE | OpenFlags::APPEND);

        let mut options = fs::OpenOptions::new();
        options
            .read(flags.contains(OpenFlags::READ) || !writable)
            .write(flags.contains(OpenFlags::WRITE))
            .append(flags.contains(OpenFlags::APPEND))
            .truncate(writable && flags.contains(OpenFlags::TRUNCATE));
        if flags.contains(OpenFlags::CREATE | OpenFlags::EXCLUSIVE) {
            options.create_new(true);
        } else {
            options.create(flags.contains(OpenFlags::CREATE));
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        let file = options.open(&path).with_context(|| format!("open {path}"))?;
        Ok(Box::new(HostFile { path, file }))
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        let path = utils::normalize(path);
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        builder
            .create(&path)
            .with_context(|| format!("mkdir {path}"))
    }

    fn write_file(&self, name: &str, data: &[u8], mode: u32) -> Result<()> {
        let mut file = self.open_file(
            name,
            OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
            mode,
        )?;
        file.write_all(data)
            .with_context(|| format!("write {}", utils::normalize(name)))?;
        file.close()
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let src = utils::normalize(src);
        let dst = utils::normalize(dst);
        fs::rename(&src, &dst).with_context(|| format!("rename {src} {dst}"))
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = utils::normalize(name);
        let metadata = fs::symlink_metadata(&path).with_context(|| format!("remove {path}"))?;
        let removed = if metadata.is_dir() {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.with_context(|| format!("remove {path}"))
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        let path = utils::normalize(path);
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).with_context(|| format!("remove_all {path}")),
        };
        let removed = if metadata.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.with_context(|| format!("remove_all {path}"))
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let path = utils::normalize(name);
        fs::read(&path).with_context(|| format!("read {path}"))
    }
}

/// A host file opened through [`DirFS`].
struct HostFile {
    path: String,
    file: fs::File,
}

impl Read for HostFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for HostFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for HostFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl File for HostFile {
    fn metadata(&self) -> Result<Metadata> {
        let metadata = self
            .file
            .metadata()
            .with_context(|| format!("stat {}", self.path))?;
        Ok(host_metadata(&metadata))
    }
}

fn host_metadata(metadata: &fs::Metadata) -> Metadata {
    let file_type = metadata.file_type();
    let entry_type = if file_type.is_symlink() {
        EntryType::Symlink
    } else if file_type.is_dir() {
        EntryType::Directory
    } else if file_type.is_file() {
        EntryType::File
    } else {
        EntryType::Other
    };
    Metadata::new(entry_type, host_mode(metadata), metadata.len())
}

#[cfg(unix)]
fn host_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn host_mode(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}
