//! This module provides a virtual filesystem (VFS) implementation that maps to a memory storage.

use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{File, FsBackend, FsError, OpenFlags, Result, utils};
use crate::{DirEntry, EntryType, Metadata};

type Content = Arc<RwLock<Vec<u8>>>;

#[derive(Debug, Clone)]
enum Entry {
    Directory { mode: u32 },
    File { mode: u32, content: Content },
}

impl Entry {
    fn is_dir(&self) -> bool {
        matches!(self, Entry::Directory { .. })
    }

    fn metadata(&self) -> Metadata {
        match self {
            Entry::Directory { mode } => Metadata::new(EntryType::Directory, *mode, 0),
            Entry::File { mode, content } => {
                Metadata::new(EntryType::File, *mode, read_lock(content).len() as u64)
            }
        }
    }
}

/// A virtual file system (VFS) implementation that stores file and directory entries in memory.
///
/// `MapFS` is the in-memory test double of [`DirFS`](crate::DirFS): it reproduces the
/// externally visible behavior of a host file system (missing parents, non-empty
/// directories, exclusive creation, rename over existing entries) without touching the disk.
///
/// ### Internal state
///
/// * `entries`: the storage map that holds all file and directory entries.
///   - Key: normalized path **without** a leading `/`; the root is the empty string.
///     Therefore `"name"`, `"./name"` and `"/name"` address the same entry, while paths
///     climbing above the root (`"../name"`) never exist.
///   - Value: directory or file entry. File content sits behind its own lock and is shared
///     with open handles, so data written through a handle is visible immediately.
///   - Uses `BTreeMap` for deterministic, path-ordered traversal.
///
/// ### Invariants
///
/// 1. **Root existence**: the root key is always present and is a directory.
/// 2. **Parent consistency**: for any entry `a/b/c` there is a directory entry `a/b`.
///
/// ### Thread Safety
///
/// `MapFS` is `Send + Sync`. Cloning it is cheap and yields a handle onto the **same**
/// storage, which lets tests keep inspecting a store after handing it to a layer stack.
///
/// ### Example
///
/// ```
/// use vfs_layers::{FsBackend, MapFS};
///
/// let fs = MapFS::new();
/// fs.mkdir_all("docs", 0o755).unwrap();
/// fs.write_file("/docs/note.txt", b"Hello", 0o644).unwrap();
///
/// assert_eq!(fs.read_file("docs/note.txt").unwrap(), b"Hello");
/// assert_eq!(fs.names(), vec!["docs/note.txt"]);
/// ```
#[derive(Debug, Clone)]
pub struct MapFS {
    entries: Arc<RwLock<BTreeMap<String, Entry>>>,
}

impl MapFS {
    /// Creates an empty store holding only the root directory.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(String::new(), Entry::Directory { mode: 0o777 });
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Returns every regular file with its metadata, ordered by path.
    ///
    /// Meant for tests only: it walks the whole store.
    pub fn list(&self) -> Vec<(String, Metadata)> {
        read_lock(&self.entries)
            .iter()
            .filter(|(_, entry)| !entry.is_dir())
            .map(|(key, entry)| (key.clone(), entry.metadata()))
            .collect()
    }

    /// Returns paths of every regular file, ordered.
    pub fn names(&self) -> Vec<String> {
        self.list().into_iter().map(|(name, _)| name).collect()
    }

    /// Converts `path` into a storage key; `None` if it climbs above the root.
    fn key(path: &str) -> Option<String> {
        let normalized = utils::normalize(path);
        let key = normalized.trim_start_matches('/');
        match key {
            "." => Some(String::new()),
            _ if key == ".." || key.starts_with("../") => None,
            _ => Some(key.to_string()),
        }
    }

    fn key_or_not_found(op: &'static str, path: &str) -> Result<String> {
        Self::key(path).ok_or_else(|| FsError::not_found(op, path).into())
    }

    /// Requires the parent of `key` to be an existing directory.
    fn check_parent(
        entries: &BTreeMap<String, Entry>,
        op: &'static str,
        path: &str,
        key: &str,
    ) -> Result<()> {
        match entries.get(parent_key(key)) {
            Some(Entry::Directory { .. }) => Ok(()),
            Some(Entry::File { .. }) => Err(path_error(op, path, io::ErrorKind::NotADirectory)),
            None => Err(path_error(op, path, io::ErrorKind::NotFound)),
        }
    }
}

impl Default for MapFS {
    fn default() -> Self {
        Self::new()
    }
}

impl FsBackend for MapFS {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        self.open_file(name, OpenFlags::READ, 0)
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        let key = Self::key_or_not_found("readdir", name)?;
        let entries = read_lock(&self.entries);
        match entries.get(&key) {
            Some(Entry::Directory { .. }) => {}
            Some(Entry::File { .. }) => {
                return Err(path_error("readdir", name, io::ErrorKind::NotADirectory));
            }
            None => return Err(path_error("readdir", name, io::ErrorKind::NotFound)),
        }

        // Children share the same prefix, so key order is name order.
        Ok(entries
            .iter()
            .filter(|(k, _)| !k.is_empty() && parent_key(k) == key)
            .map(|(k, entry)| DirEntry::new(base_name(k), entry.metadata()))
            .collect())
    }

    fn open_file(&self, name: &str, flags: OpenFlags, mode: u32) -> Result<Box<dyn File>> {
        let key = Self::key_or_not_found("open", name)?;
        let writable = flags.intersects(OpenFlags::WRITE | OpenFlags::APPEND);
        let mut entries = write_lock(&self.entries);

        let entry = match entries.get(&key) {
            Some(_) if flags.contains(OpenFlags::CREATE | OpenFlags::EXCLUSIVE) => {
                return Err(path_error("open", name, io::ErrorKind::AlreadyExists));
            }
            Some(Entry::Directory { .. }) if writable => {
                return Err(path_error("open", name, io::ErrorKind::IsADirectory));
            }
            Some(entry) => {
                if let Entry::File { content, .. } = entry {
                    if writable && flags.contains(OpenFlags::TRUNCATE) {
                        write_lock(content).clear();
                    }
                }
                entry.clone()
            }
            None if flags.contains(OpenFlags::CREATE) => {
                Self::check_parent(&entries, "open", name, &key)?;
                let entry = Entry::File {
                    mode: mode & 0o777,
                    content: Content::default(),
                };
                entries.insert(key, entry.clone());
                entry
            }
            None => return Err(path_error("open", name, io::ErrorKind::NotFound)),
        };

        let (mode, content) = match entry {
            Entry::Directory { mode } => (mode, None),
            Entry::File { mode, content } => (mode, Some(content)),
        };
        Ok(Box::new(MemFile {
            name: name.to_string(),
            content,
            mode,
            pos: 0,
            readable: flags.contains(OpenFlags::READ) || !writable,
            writable,
            append: flags.contains(OpenFlags::APPEND),
        }))
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        let key = Self::key_or_not_found("mkdir", path)?;
        let mut entries = write_lock(&self.entries);

        let mut built = String::new();
        let mut parts = key.split('/').filter(|part| !part.is_empty()).peekable();
        while let Some(part) = parts.next() {
            if !built.is_empty() {
                built.push('/');
            }
            built.push_str(part);
            match entries.get(&built) {
                Some(Entry::Directory { .. }) => {}
                Some(Entry::File { .. }) => {
                    // A file in place of the target itself is an existing entry.
                    let kind = match parts.peek() {
                        Some(_) => io::ErrorKind::NotADirectory,
                        None => io::ErrorKind::AlreadyExists,
                    };
                    return Err(path_error("mkdir", path, kind));
                }
                None => {
                    entries.insert(built.clone(), Entry::Directory { mode: mode & 0o777 });
                }
            }
        }
        Ok(())
    }

    fn write_file(&self, name: &str, data: &[u8], mode: u32) -> Result<()> {
        let key = Self::key_or_not_found("write_file", name)?;
        let mut entries = write_lock(&self.entries);
        match entries.get(&key) {
            Some(Entry::Directory { .. }) => {
                Err(path_error("write_file", name, io::ErrorKind::IsADirectory))
            }
            Some(Entry::File { content, .. }) => {
                let mut content = write_lock(content);
                content.clear();
                content.extend_from_slice(data);
                Ok(())
            }
            None => {
                Self::check_parent(&entries, "write_file", name, &key)?;
                let content = Arc::new(RwLock::new(data.to_vec()));
                entries.insert(key, Entry::File { mode: mode & 0o777, content });
                Ok(())
            }
        }
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let src_key = Self::key_or_not_found("rename", src)?;
        let dst_key = Self::key_or_not_found("rename", dst)?;
        let mut entries = write_lock(&self.entries);

        let Some(src_entry) = entries.get(&src_key) else {
            return Err(path_error("rename", src, io::ErrorKind::NotFound));
        };
        if src_key == dst_key {
            return Ok(());
        }
        if src_key.is_empty() || utils::is_sub_path(&src_key, &dst_key) {
            return Err(path_error("rename", dst, io::ErrorKind::InvalidInput));
        }
        Self::check_parent(&entries, "rename", dst, &dst_key)?;

        let src_is_dir = src_entry.is_dir();
        if let Some(dst_entry) = entries.get(&dst_key) {
            match (src_is_dir, dst_entry.is_dir()) {
                (false, true) => return Err(path_error("rename", dst, io::ErrorKind::IsADirectory)),
                (true, false) => {
                    return Err(path_error("rename", dst, io::ErrorKind::NotADirectory));
                }
                (true, true) if has_children(&entries, &dst_key) => {
                    return Err(path_error("rename", dst, io::ErrorKind::DirectoryNotEmpty));
                }
                _ => {}
            }
        }

        let moved: Vec<String> = entries
            .keys()
            .filter(|k| is_at_or_below(&src_key, k))
            .cloned()
            .collect();
        for old in moved {
            if let Some(entry) = entries.remove(&old) {
                let new = format!("{dst_key}{}", &old[src_key.len()..]);
                entries.insert(new, entry);
            }
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let key = Self::key_or_not_found("remove", name)?;
        if key.is_empty() {
            return Err(path_error("remove", name, io::ErrorKind::InvalidInput));
        }
        let mut entries = write_lock(&self.entries);
        match entries.get(&key) {
            None => Err(path_error("remove", name, io::ErrorKind::NotFound)),
            Some(Entry::Directory { .. }) if has_children(&entries, &key) => {
                Err(path_error("remove", name, io::ErrorKind::DirectoryNotEmpty))
            }
            Some(_) => {
                entries.remove(&key);
                Ok(())
            }
        }
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        // Nothing exists above the root, so there is nothing to remove.
        let Some(key) = Self::key(path) else {
            return Ok(());
        };
        write_lock(&self.entries).retain(|k, _| k.is_empty() || !is_at_or_below(&key, k));
        Ok(())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let key = Self::key_or_not_found("open", name)?;
        match read_lock(&self.entries).get(&key) {
            Some(Entry::File { content, .. }) => Ok(read_lock(content).clone()),
            Some(Entry::Directory { .. }) => {
                Err(path_error("read", name, io::ErrorKind::IsADirectory))
            }
            None => Err(path_error("open", name, io::ErrorKind::NotFound)),
        }
    }
}

/// A handle onto a `MapFS` entry. Directories can be opened for reading their
/// metadata, but not their content.
struct MemFile {
    name: String,
    content: Option<Content>,
    mode: u32,
    pos: u64,
    readable: bool,
    writable: bool,
    append: bool,
}

/// Largest size an in-memory file may grow to. Gaps left by seeking past the end are
/// materialized as zeros, so the limit also bounds what a single write may allocate.
const MAX_FILE_SIZE: u64 = 1 << 32;

fn is_a_directory(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::IsADirectory, format!("{name} is a directory"))
}

impl Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.readable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is not opened for reading", self.name),
            ));
        }
        let Some(content) = &self.content else {
            return Err(is_a_directory(&self.name));
        };
        let content = read_lock(content);
        let start = usize::try_from(self.pos)
            .unwrap_or(usize::MAX)
            .min(content.len());
        let n = buf.len().min(content.len() - start);
        buf[..n].copy_from_slice(&content[start..start + n]);
        drop(content);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is not opened for writing", self.name),
            ));
        }
        let Some(content) = &self.content else {
            return Err(is_a_directory(&self.name));
        };
        let mut content = write_lock(content);
        if self.append {
            self.pos = content.len() as u64;
        }
        let too_large = || {
            io::Error::new(
                io::ErrorKind::FileTooLarge,
                format!("{} would exceed {MAX_FILE_SIZE} bytes", self.name),
            )
        };
        let end = self
            .pos
            .checked_add(buf.len() as u64)
            .filter(|end| *end <= MAX_FILE_SIZE)
            .and_then(|end| usize::try_from(end).ok())
            .ok_or_else(too_large)?;
        let start = end - buf.len();
        if content.len() < end {
            content.resize(end, 0);
        }
        content[start..end].copy_from_slice(buf);
        drop(content);
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = match &self.content {
            Some(content) => read_lock(content).len() as u64,
            None => 0,
        };
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(offset) => len.checked_add_signed(offset),
            SeekFrom::Current(offset) => self.pos.checked_add_signed(offset),
        };
        let Some(target) = target else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            ));
        };
        self.pos = target;
        Ok(self.pos)
    }
}

impl File for MemFile {
    fn metadata(&self) -> Result<Metadata> {
        Ok(match &self.content {
            Some(content) => Metadata::new(EntryType::File, self.mode, read_lock(content).len() as u64),
            None => Metadata::new(EntryType::Directory, self.mode, 0),
        })
    }
}

fn path_error(op: &'static str, path: &str, kind: io::ErrorKind) -> anyhow::Error {
    FsError::Path {
        op,
        path: path.to_string(),
        source: io::Error::from(kind),
    }
    .into()
}

fn parent_key(key: &str) -> &str {
    key.rfind('/').map_or("", |pos| &key[..pos])
}

fn base_name(key: &str) -> &str {
    key.rfind('/').map_or(key, |pos| &key[pos + 1..])
}

/// Key-level sub-path check; the root key (`""`) contains everything.
fn is_at_or_below(base: &str, key: &str) -> bool {
    base.is_empty()
        || key == base
        || (key.len() > base.len() && key.starts_with(base) && key.as_bytes()[base.len()] == b'/')
}

fn has_children(entries: &BTreeMap<String, Entry>, key: &str) -> bool {
    entries
        .keys()
        .any(|k| !k.is_empty() && k != key && is_at_or_below(key, k))
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
